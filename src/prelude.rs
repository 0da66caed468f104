//! # classforge Prelude
//!
//! This module provides a convenient prelude for the most commonly used types from the
//! classforge library. Import this module to get quick access to the essential types for
//! reading interfaces and generating implementations.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all classforge operations
pub use crate::Error;

/// The result type used throughout classforge
pub use crate::Result;

/// Low-level parsing cursor
pub use crate::Parser;

// ================================================================================================
// Symbols
// ================================================================================================

/// Symbol items and the interning table
pub use crate::symbols::{Item, ItemKind, ItemPayload, SymbolRemapping, SymbolTable};

// ================================================================================================
// Class Files
// ================================================================================================

/// Reading class file metadata
pub use crate::classfile::{ClassMetadata, ClassMetadataReader, MethodInfo};

/// Writing class files
pub use crate::classfile::{
    ClassAccessFlags, ClassVersion, ClassWriter, InterfaceBuilder, MethodAccessFlags, MethodWriter,
};

/// Descriptors and generic signatures
pub use crate::classfile::{
    ClassSignature, FieldType, MethodDescriptor, MethodSignature, ReturnType, TypeBindings,
    TypeSignature,
};

/// Locating class files
pub use crate::classfile::{
    ClassPath, ClassSource, DirectoryClassSource, MemoryClassSource, MetadataCache,
};

// ================================================================================================
// Generation
// ================================================================================================

/// Implementation generation
pub use crate::generator::{
    generate_all, AmbiguityPolicy, Diagnostic, DispatchHook, GeneratedClass, GeneratorConfig,
    ImplementationGenerator, ImplementedMethod, MethodKind, TargetInterface,
};
