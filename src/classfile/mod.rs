//! JVM class file primitives.
//!
//! This module contains everything below the generator: reading the metadata of existing class
//! files, writing new ones, and the descriptor and generic-signature grammars that connect the
//! two.
//!
//! # Architecture
//!
//! Reading and writing are deliberately asymmetric. The reader only extracts what is needed to
//! walk an interface hierarchy (header, super-interfaces, methods with their `Signature` and
//! `Exceptions` attributes, and the constant pool). The writer emits complete class files but
//! only supports the instructions required by generated forwarding bodies.
//!
//! # Key Components
//!
//! - [`ClassMetadataReader`] / [`ClassMetadata`] - Strict parsing of class file metadata
//! - [`ClassWriter`] / [`MethodWriter`] - Class file assembly over a [`crate::symbols::SymbolTable`]
//! - [`CodeBuffer`] - Bytecode emission with stack depth tracking
//! - [`MethodDescriptor`] / [`FieldType`] - Erased descriptor grammar
//! - [`ClassSignature`] / [`MethodSignature`] / [`TypeBindings`] - Generic signatures and
//!   type-variable substitution
//! - [`ClassSource`] / [`MetadataCache`] - Locating and caching class files by internal name
//! - [`InterfaceBuilder`] - Fabricating interface class files
//!
//! # Examples
//!
//! ```rust
//! use classforge::classfile::{ClassMetadataReader, InterfaceBuilder, MethodDescriptor};
//!
//! let bytes = InterfaceBuilder::new("demo/Greeter")
//!     .method("greet", "(Ljava/lang/String;I)Ljava/lang/String;")
//!     .build()?;
//!
//! let metadata = ClassMetadataReader::parse(&bytes)?;
//! let descriptor = MethodDescriptor::parse(&metadata.methods[0].descriptor)?;
//! assert_eq!(descriptor.parameter_slots(), 2);
//! # Ok::<(), classforge::Error>(())
//! ```

mod access;
mod builder;
mod classpath;
mod code;
mod descriptor;
pub mod opcodes;
mod reader;
mod signature;
mod writer;

pub use access::{ClassAccessFlags, MethodAccessFlags};
pub use builder::InterfaceBuilder;
pub use classpath::{ClassPath, ClassSource, DirectoryClassSource, MemoryClassSource, MetadataCache};
pub use code::{CodeBuffer, MAX_CODE_LENGTH};
pub use descriptor::{
    parameters_prefix, BaseType, FieldType, MethodDescriptor, ReturnType, MAX_ARRAY_DIMENSIONS,
};
pub use reader::{ClassMetadata, ClassMetadataRc, ClassMetadataReader, MethodInfo};
pub use signature::{
    ClassSignature, ClassTypeSignature, MethodSignature, SimpleClassType, TypeArgument,
    TypeBindings, TypeParameter, TypeSignature,
};
pub use writer::{ClassVersion, ClassWriter, MethodWriter, CLASS_MAGIC, MAX_PARAMETER_SLOTS};
