//! Low-level byte stream parser for class file decoding.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a cursor-based binary data
//! parser for the big-endian structures found in JVM class files. All reads are bounds checked
//! and report [`crate::Error::OutOfBounds`] instead of panicking on truncated input.
//!
//! # Key Components
//!
//! - [`crate::file::parser::Parser::read_be`] - Read primitive types (big-endian)
//! - [`crate::file::parser::Parser::read_bytes`] - Borrow a slice of the input
//! - [`crate::file::parser::Parser::read_modified_utf8`] - Read a `u2`-length-prefixed
//!   modified UTF-8 string as stored in `CONSTANT_Utf8_info`
//!
//! # Examples
//!
//! ```rust
//! use classforge::Parser;
//!
//! let data = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00, 0x00, 0x34];
//! let mut parser = Parser::new(&data);
//!
//! assert_eq!(parser.read_be::<u32>()?, 0xCAFE_BABE);
//! assert_eq!(parser.read_be::<u16>()?, 0);
//! assert_eq!(parser.read_be::<u16>()?, 52);
//! # Ok::<(), classforge::Error>(())
//! ```

use crate::{
    file::io::{read_be_at, ClassIO},
    utils::decode_modified_utf8,
    Result,
};

/// A cursor over a byte slice for reading class file structures.
///
/// The parser maintains an internal position and never reads past the end of the buffer;
/// every accessor validates the remaining length first.
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`crate::file::parser::Parser`] from a byte slice.
    ///
    /// # Arguments
    /// * `data` - The byte slice to read from
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Move the current position to the specified index.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Move the position forward by the specified number of bytes.
    ///
    /// # Arguments
    /// * `step` - Amount of bytes to advance
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if advancing by step would exceed the data length.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        match self.position.checked_add(step) {
            Some(end) if end <= self.data.len() => {
                self.position = end;
                Ok(())
            }
            _ => Err(out_of_bounds_error!()),
        }
    }

    /// Read a type `T` from the current position in big-endian format and advance the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use classforge::Parser;
    /// let data = [0x01, 0x02, 0x03, 0x04];
    /// let mut parser = Parser::new(&data);
    ///
    /// let value: u16 = parser.read_be()?;
    /// assert_eq!(value, 0x0102);
    /// assert_eq!(parser.pos(), 2);
    /// # Ok::<(), classforge::Error>(())
    /// ```
    pub fn read_be<T: ClassIO>(&mut self) -> Result<T> {
        read_be_at::<T>(self.data, &mut self.position)
    }

    /// Borrow the next `len` bytes and advance past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let start = self.position;
        self.advance_by(len)?;
        Ok(&self.data[start..self.position])
    }

    /// Read a `u2` length followed by that many bytes of modified UTF-8.
    ///
    /// This is the layout of the payload of a `CONSTANT_Utf8_info` entry.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncation, or [`crate::Error::Malformed`] if
    /// the bytes are not valid modified UTF-8.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use classforge::Parser;
    /// let data = [0x00, 0x03, b'f', b'o', b'o'];
    /// let mut parser = Parser::new(&data);
    /// assert_eq!(parser.read_modified_utf8()?, "foo");
    /// # Ok::<(), classforge::Error>(())
    /// ```
    pub fn read_modified_utf8(&mut self) -> Result<String> {
        let len = self.read_be::<u16>()?;
        let bytes = self.read_bytes(usize::from(len))?;
        decode_modified_utf8(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_reads() {
        let data = [0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0xFF];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_be::<u16>().unwrap(), 1);
        assert_eq!(parser.read_be::<u32>().unwrap(), 2);
        assert_eq!(parser.read_be::<u8>().unwrap(), 0xFF);
        assert!(!parser.has_more_data());
        assert!(parser.read_be::<u8>().is_err());
    }

    #[test]
    fn test_read_bytes_and_seek() {
        let data = [1, 2, 3, 4, 5];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_bytes(2).unwrap(), &[1, 2]);
        parser.seek(4).unwrap();
        assert_eq!(parser.read_bytes(1).unwrap(), &[5]);
        assert!(parser.read_bytes(1).is_err());
        assert!(parser.seek(6).is_err());
    }

    #[test]
    fn test_modified_utf8_truncated() {
        let data = [0x00, 0x05, b'a'];
        let mut parser = Parser::new(&data);
        assert!(parser.read_modified_utf8().is_err());
    }
}
