//! Byte order and bounds-checked reading/writing utilities for class files.
//!
//! Class files are big-endian throughout (JVMS §4), so unlike general purpose binary
//! readers this module only offers big-endian accessors. Everything funnels through the
//! [`crate::file::io::ClassIO`] trait, which is implemented for the fixed-width integer
//! types that occur in the format.
//!
//! # Key Components
//!
//! - [`crate::file::io::ClassIO`] - Conversion between primitive values and big-endian bytes
//! - [`crate::file::io::read_be_at`] - Read a value at an offset and advance the offset
//! - [`crate::file::io::write_be`] - Append a value to a growing output buffer
//!
//! # Examples
//!
//! ```rust,ignore
//! use classforge::file::io::{read_be_at, write_be};
//!
//! let mut out = Vec::new();
//! write_be::<u32>(&mut out, 0xCAFE_BABE);
//!
//! let mut offset = 0;
//! let magic: u32 = read_be_at(&out, &mut offset)?;
//! assert_eq!(magic, 0xCAFE_BABE);
//! assert_eq!(offset, 4);
//! # Ok::<(), classforge::Error>(())
//! ```

use crate::{Error::OutOfBounds, Result};

/// Trait for primitive values that can be read from and written to big-endian bytes.
pub trait ClassIO: Sized + Copy {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in big-endian
    fn from_be_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte buffer in big-endian
    fn to_be_bytes(self) -> Self::Bytes;
}

macro_rules! impl_class_io {
    ($($ty:ty => $len:expr),* $(,)?) => {
        $(
            impl ClassIO for $ty {
                type Bytes = [u8; $len];

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_be_bytes(bytes)
                }

                fn to_be_bytes(self) -> Self::Bytes {
                    <$ty>::to_be_bytes(self)
                }
            }
        )*
    };
}

impl_class_io! {
    u8 => 1,
    i8 => 1,
    u16 => 2,
    i16 => 2,
    u32 => 4,
    i32 => 4,
    u64 => 8,
    i64 => 8,
}

/// Reads a value of type `T` at `offset` in big-endian byte order and advances the offset.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if fewer than `size_of::<T>()` bytes remain.
pub fn read_be_at<T: ClassIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;

    Ok(T::from_be_bytes(read))
}

/// Appends `value` to `out` in big-endian byte order.
pub fn write_be<T: ClassIO>(out: &mut Vec<u8>, value: T) {
    out.extend_from_slice(value.to_be_bytes().as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_be_values() {
        let data = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x34];
        let mut offset = 0;

        assert_eq!(read_be_at::<u32>(&data, &mut offset).unwrap(), 0xCAFE_BABE);
        assert_eq!(read_be_at::<u16>(&data, &mut offset).unwrap(), 52);
        assert_eq!(offset, 6);
    }

    #[test]
    fn test_read_be_out_of_bounds_keeps_offset() {
        let data = [0x01, 0x02, 0x03];
        let mut offset = 1;

        assert!(matches!(
            read_be_at::<u32>(&data, &mut offset),
            Err(crate::Error::OutOfBounds)
        ));
        assert_eq!(offset, 1);
    }

    #[test]
    fn test_read_be_signed() {
        let data = [0xFF, 0xFE];
        let mut offset = 0;
        assert_eq!(read_be_at::<i16>(&data, &mut offset).unwrap(), -2);
    }

    #[test]
    fn test_write_appends() {
        let mut out = Vec::new();
        write_be::<u16>(&mut out, 0xBEEF);
        write_be::<u32>(&mut out, 0x0102_0304);

        assert_eq!(out, vec![0xBE, 0xEF, 0x01, 0x02, 0x03, 0x04]);
    }
}
