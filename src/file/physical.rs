//! Memory-mapped access to class files on disk.
//!
//! [`crate::file::physical::Physical`] maps a file read-only into memory so the class file
//! reader can parse it in place without copying. Directory class sources use it to load
//! `<root>/<internal name>.class`.

use std::{fs, path::Path};

use memmap2::Mmap;

use crate::{Error::FileError, Result};

/// A read-only memory mapping of a file on disk.
///
/// Empty files cannot be mapped on every platform, so they are represented without a mapping
/// and expose an empty slice.
#[derive(Debug)]
pub struct Physical {
    /// The mapped file contents, `None` for empty files
    data: Option<Mmap>,
}

impl Physical {
    /// Opens and maps the file at `path`.
    ///
    /// # Arguments
    /// * `path` - Path to the file on disk
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened, inspected or mapped.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(error) => return Err(FileError(error)),
        };

        if file.metadata()?.len() == 0 {
            return Ok(Physical { data: None });
        }

        // The mapping is read-only and lives no longer than this value; concurrent
        // truncation of the file by another process is outside our control.
        let mmap = match unsafe { Mmap::map(&file) } {
            Ok(mmap) => mmap,
            Err(error) => return Err(FileError(error)),
        };

        Ok(Physical { data: Some(mmap) })
    }

    /// Returns the mapped bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.as_ref().map_or(&[], |mmap| mmap.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_physical_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Sample.class");
        std::fs::write(&path, [0xCA, 0xFE, 0xBA, 0xBE, 0x00]).unwrap();

        let physical = Physical::new(&path).unwrap();
        assert_eq!(physical.data().len(), 5);
        assert_eq!(&physical.data()[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
    }

    #[test]
    fn test_physical_invalid_file_path() {
        let result = Physical::new(PathBuf::from("/nonexistent/path/to/Missing.class"));
        match result {
            Err(FileError(io_error)) => {
                assert_eq!(io_error.kind(), std::io::ErrorKind::NotFound);
            }
            _ => panic!("Expected FileError"),
        }
    }

    #[test]
    fn test_physical_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Empty.class");
        std::fs::write(&path, b"").unwrap();

        let physical = Physical::new(&path).unwrap();
        assert!(physical.data().is_empty());
    }
}
