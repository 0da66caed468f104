// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # classforge
//!
//! Constant-pool interning and synthetic interface implementation generation for JVM class
//! files. Built in pure Rust, `classforge` reads the metadata of existing interfaces, walks
//! arbitrary interface inheritance graphs, and emits brand-new concrete classes whose every
//! method forwards to a single static dispatch hook.
//!
//! ## Features
//!
//! - **🔗 Hash-consed symbol table** - Deduplicated constant pool and type table with stable indices
//! - **🧬 Generic-aware traversal** - Covariant and generic overrides resolved through type arguments
//! - **📦 Efficient memory access** - Memory-mapped directory class sources and cached metadata
//! - **⚡ Parallel generation** - Independent requests on the `rayon` pool with shared parsing
//! - **🛡️ Strict parsing** - Truncated or inconsistent class files are rejected, never guessed at
//!
//! ## Quick Start
//!
//! ### Using the Prelude
//!
//! ```rust
//! use classforge::prelude::*;
//!
//! let source = MemoryClassSource::new().with(
//!     "demo/Greeter",
//!     InterfaceBuilder::new("demo/Greeter")
//!         .method("greet", "(Ljava/lang/String;)Ljava/lang/String;")
//!         .build()?,
//! );
//!
//! let generator = ImplementationGenerator::new(&source, GeneratorConfig::default());
//! let class = generator.generate(&TargetInterface::new("demo/Greeter"), "demo/GreeterImpl")?;
//!
//! let metadata = ClassMetadataReader::parse(&class.bytes)?;
//! assert_eq!(metadata.interfaces, vec!["demo/Greeter"]);
//! # Ok::<(), classforge::Error>(())
//! ```
//!
//! ### Interning Symbols
//!
//! ```rust
//! use classforge::symbols::SymbolTable;
//!
//! let mut table = SymbolTable::new();
//! let first = table.class("java/lang/String")?;
//! let again = table.class("java/lang/String")?;
//! assert_eq!(first, again);
//! # Ok::<(), classforge::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`prelude`] - Convenient re-exports of commonly used types
//! - [`symbols`] - Symbol items and the interning symbol table
//! - [`classfile`] - Class file reading, writing, descriptors, and generic signatures
//! - [`generator`] - Synthetic implementation generation
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result):
//!
//! ```rust
//! use classforge::{Error, ClassMetadataReader};
//!
//! match ClassMetadataReader::parse(&[0xCA, 0xFE, 0xBA, 0xBE]) {
//!     Ok(metadata) => println!("Parsed {}", metadata.name),
//!     Err(Error::Malformed { message, .. }) => println!("Malformed class file: {}", message),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Development and Testing
//!
//! ### Fuzzing
//!
//! ```bash
//! cargo +nightly fuzz run class_reader --release
//! ```
#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use classforge::prelude::*;
///
/// let bytes = InterfaceBuilder::new("demo/Api").method("call", "()V").build()?;
/// let metadata = ClassMetadataReader::parse(&bytes)?;
/// assert_eq!(metadata.methods.len(), 1);
/// # Ok::<(), classforge::Error>(())
/// ```
pub mod prelude;

/// Hashing and modified UTF-8 helpers shared by the symbol table and the class file codec.
pub mod utils;

/// Constant-pool and type-table symbols
///
/// # Key Types
///
/// - [`symbols::Item`] - An immutable, hashed constant or type entry
/// - [`symbols::SymbolTable`] - The hash-consed store assigning indices
///
/// # Examples
///
/// ```rust
/// use classforge::symbols::SymbolTable;
///
/// let mut table = SymbolTable::new();
/// let index = table.method_ref("java/lang/Object", "hashCode", "()I", false)?;
/// assert_eq!(table.get(index).map(|item| item.index()), Some(index));
/// # Ok::<(), classforge::Error>(())
/// ```
pub mod symbols;

/// JVM class file reading and writing
///
/// See the module documentation for the reader, writer, descriptor, signature, and class path
/// components.
pub mod classfile;

/// Synthetic interface implementation generation
///
/// # Key Types
///
/// - [`generator::ImplementationGenerator`] - Entry point for generation requests
/// - [`generator::GeneratorConfig`] - Dispatch hook, bridge, and ambiguity settings
/// - [`generator::GeneratedClass`] - Class bytes plus a report of what was emitted
pub mod generator;

/// `classforge` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `classforge` Error type
///
/// The main error type for all operations in this crate.
pub use error::Error;

/// Cursor-based reader over class file bytes.
pub use file::parser::Parser;

/// Entry point for reading class file metadata.
pub use classfile::ClassMetadataReader;

/// Entry point for generating implementations.
pub use generator::ImplementationGenerator;

/// The interning symbol table.
pub use symbols::SymbolTable;
