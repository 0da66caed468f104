//! Constant-pool and type-table symbols.
//!
//! This module implements the deduplicated symbol store every generated class file is built
//! from. A class file refers to strings, classes, members, and constants exclusively through
//! indices into its constant pool, and stack map frames refer to verification types through a
//! separate type table. Both are managed here.
//!
//! # Key Components
//!
//! - [`crate::symbols::Item`] - One immutable, hashed entry
//! - [`crate::symbols::ItemPayload`] - Closed set of per-kind contents
//! - [`crate::symbols::SymbolTable`] - Hash-consed store with two index spaces
//! - [`crate::symbols::SymbolRemapping`] - Index mappings produced by merges
//!
//! # Thread Safety
//!
//! A [`SymbolTable`] is owned by a single class being generated and is mutated through
//! `&mut self`. Tables are `Send`, so independent generations can run on separate threads.

mod item;
mod table;

pub use item::{DynamicKind, Item, ItemKind, ItemPayload, MemberKind, TextKind};
pub use table::{SymbolRemapping, SymbolTable, MAX_CONSTANT_POOL_COUNT, MAX_UTF8_LENGTH};
