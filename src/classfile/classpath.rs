//! Type resolution: locating class files by internal name.
//!
//! The generator never reads the filesystem directly. It asks a [`ClassSource`] for the bytes
//! of a named type and parses them through a [`MetadataCache`], which memoises parsed
//! [`ClassMetadata`] so concurrent generation requests over the same interface graph parse
//! each class file once.
//!
//! # Key Components
//!
//! - [`ClassSource`] - Lookup of class file bytes by internal name
//! - [`MemoryClassSource`] - In-memory map, typically filled from [`crate::classfile::InterfaceBuilder`]
//! - [`DirectoryClassSource`] - `root/pkg/Name.class` layout on disk, memory-mapped on load
//! - [`ClassPath`] - Ordered chain of sources; the first hit wins
//! - [`MetadataCache`] - Thread-safe parse cache over any source
//!
//! # Thread Safety
//!
//! Sources are `Send + Sync`. [`MetadataCache`] uses a `DashMap`, so one cache can back many
//! generation sessions running on different threads.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use dashmap::DashMap;
use rustc_hash::FxHashMap;

use crate::{
    classfile::reader::{ClassMetadataReader, ClassMetadataRc},
    file::Physical,
    Error, Result,
};

/// Lookup of class file bytes by internal name.
pub trait ClassSource: Send + Sync {
    /// Returns the class file for `internal_name`, or `None` when this source does not have it.
    ///
    /// # Errors
    ///
    /// Returns an error only when the class exists but cannot be read.
    fn load(&self, internal_name: &str) -> Result<Option<Vec<u8>>>;
}

impl<S: ClassSource + ?Sized> ClassSource for &S {
    fn load(&self, internal_name: &str) -> Result<Option<Vec<u8>>> {
        (**self).load(internal_name)
    }
}

impl<S: ClassSource + ?Sized> ClassSource for Box<S> {
    fn load(&self, internal_name: &str) -> Result<Option<Vec<u8>>> {
        (**self).load(internal_name)
    }
}

impl<S: ClassSource + ?Sized> ClassSource for Arc<S> {
    fn load(&self, internal_name: &str) -> Result<Option<Vec<u8>>> {
        (**self).load(internal_name)
    }
}

/// Class files held in memory.
///
/// # Examples
///
/// ```rust
/// use classforge::classfile::{ClassSource, InterfaceBuilder, MemoryClassSource};
///
/// let mut source = MemoryClassSource::new();
/// source.insert("demo/Api", InterfaceBuilder::new("demo/Api").build()?);
///
/// assert!(source.load("demo/Api")?.is_some());
/// assert!(source.load("demo.Api")?.is_some());
/// assert!(source.load("demo/Other")?.is_none());
/// # Ok::<(), classforge::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryClassSource {
    classes: FxHashMap<String, Vec<u8>>,
}

impl MemoryClassSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        MemoryClassSource::default()
    }

    /// Adds or replaces a class file.
    pub fn insert(&mut self, internal_name: &str, bytes: Vec<u8>) {
        self.classes.insert(internal_name.replace('.', "/"), bytes);
    }

    /// Builder form of [`MemoryClassSource::insert`].
    #[must_use]
    pub fn with(mut self, internal_name: &str, bytes: Vec<u8>) -> Self {
        self.insert(internal_name, bytes);
        self
    }

    /// Number of classes held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` if no class is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl ClassSource for MemoryClassSource {
    fn load(&self, internal_name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.classes.get(&internal_name.replace('.', "/")).cloned())
    }
}

/// Class files laid out under a directory root by package.
#[derive(Debug, Clone)]
pub struct DirectoryClassSource {
    root: PathBuf,
}

impl DirectoryClassSource {
    /// Creates a source rooted at `root`.
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        DirectoryClassSource {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The path a class would be loaded from.
    #[must_use]
    pub fn path_of(&self, internal_name: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in internal_name.split(['/', '.']) {
            path.push(segment);
        }
        path.set_extension("class");
        path
    }
}

impl ClassSource for DirectoryClassSource {
    fn load(&self, internal_name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_of(internal_name);
        if !path.is_file() {
            return Ok(None);
        }
        let physical = Physical::new(&path)?;
        Ok(Some(physical.data().to_vec()))
    }
}

/// An ordered chain of class sources.
#[derive(Default)]
pub struct ClassPath {
    sources: Vec<Box<dyn ClassSource>>,
}

impl ClassPath {
    /// Creates an empty class path.
    #[must_use]
    pub fn new() -> Self {
        ClassPath::default()
    }

    /// Appends a source; earlier sources take precedence.
    #[must_use]
    pub fn with(mut self, source: impl ClassSource + 'static) -> Self {
        self.push(source);
        self
    }

    /// Appends a source; earlier sources take precedence.
    pub fn push(&mut self, source: impl ClassSource + 'static) {
        self.sources.push(Box::new(source));
    }

    /// Number of sources in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns `true` if the chain has no sources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl ClassSource for ClassPath {
    fn load(&self, internal_name: &str) -> Result<Option<Vec<u8>>> {
        for source in &self.sources {
            if let Some(bytes) = source.load(internal_name)? {
                return Ok(Some(bytes));
            }
        }
        Ok(None)
    }
}

/// Thread-safe cache of parsed class metadata over a [`ClassSource`].
pub struct MetadataCache<S> {
    source: S,
    parsed: DashMap<String, ClassMetadataRc>,
}

impl<S: ClassSource> MetadataCache<S> {
    /// Creates an empty cache over `source`.
    pub fn new(source: S) -> Self {
        MetadataCache {
            source,
            parsed: DashMap::new(),
        }
    }

    /// Returns the parsed metadata of `internal_name`, loading and parsing it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolution`] if no source has the class, [`Error::Malformed`] if it
    /// cannot be parsed or declares a different name, and propagates source errors.
    pub fn metadata(&self, internal_name: &str) -> Result<ClassMetadataRc> {
        if let Some(cached) = self.parsed.get(internal_name) {
            return Ok(cached.clone());
        }

        let Some(bytes) = self.source.load(internal_name)? else {
            return Err(Error::Resolution(format!(
                "class {internal_name} was not found"
            )));
        };
        let metadata = ClassMetadataReader::parse(&bytes)?;
        if metadata.name != internal_name {
            return Err(malformed_error!(
                "Class file for {} declares {}",
                internal_name,
                metadata.name
            ));
        }

        // Two threads may parse the same class; the first insert wins and both see it
        Ok(self
            .parsed
            .entry(internal_name.to_string())
            .or_insert_with(|| Arc::new(metadata))
            .clone())
    }

    /// Number of cached classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parsed.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parsed.is_empty()
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.parsed.clear();
    }

    /// The underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;
    use crate::classfile::InterfaceBuilder;

    #[test]
    fn test_directory_source_maps_packages_to_folders() {
        let dir = tempdir().unwrap();
        let package = dir.path().join("demo").join("api");
        fs::create_dir_all(&package).unwrap();
        let bytes = InterfaceBuilder::new("demo/api/Service").build().unwrap();
        fs::write(package.join("Service.class"), &bytes).unwrap();

        let source = DirectoryClassSource::new(dir.path());
        assert_eq!(source.load("demo/api/Service").unwrap(), Some(bytes));
        assert_eq!(source.load("demo/api/Missing").unwrap(), None);
    }

    #[test]
    fn test_class_path_prefers_earlier_sources() {
        let first = MemoryClassSource::new().with(
            "demo/Api",
            InterfaceBuilder::new("demo/Api").method("a", "()V").build().unwrap(),
        );
        let second = MemoryClassSource::new()
            .with("demo/Api", InterfaceBuilder::new("demo/Api").build().unwrap())
            .with("demo/Other", InterfaceBuilder::new("demo/Other").build().unwrap());

        let path = ClassPath::new().with(first).with(second);
        let cache = MetadataCache::new(path);

        assert_eq!(cache.metadata("demo/Api").unwrap().methods.len(), 1);
        assert!(cache.metadata("demo/Other").is_ok());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cache_reports_missing_and_mismatched_classes() {
        let source = MemoryClassSource::new()
            .with("demo/Alias", InterfaceBuilder::new("demo/Real").build().unwrap());
        let cache = MetadataCache::new(source);

        assert!(matches!(cache.metadata("demo/Missing"), Err(Error::Resolution(_))));
        assert!(matches!(cache.metadata("demo/Alias"), Err(Error::Malformed { .. })));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_returns_shared_metadata() {
        let source = MemoryClassSource::new()
            .with("demo/Api", InterfaceBuilder::new("demo/Api").build().unwrap());
        let cache = MetadataCache::new(&source);

        let first = cache.metadata("demo/Api").unwrap();
        let second = cache.metadata("demo/Api").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        cache.clear();
        assert!(cache.is_empty());
    }
}
