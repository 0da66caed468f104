//! Byte-level access to class file data.
//!
//! # Key Components
//!
//! - [`crate::file::parser::Parser`] - Cursor-based, bounds-checked reader for class file structures
//! - [`crate::file::io`] - Big-endian primitive encoding shared by the reader and the writer
//! - [`crate::file::physical::Physical`] - Memory-mapped file backend used by directory class sources

pub mod io;
pub mod parser;
pub mod physical;

pub use physical::Physical;
