//! High-level builder for interface class files.
//!
//! [`InterfaceBuilder`] fabricates complete interface definitions: super-interfaces, a generic
//! class signature, abstract methods with optional generic signatures and declared exceptions,
//! and static or default methods with trivial bodies. It composes the lower-level
//! [`ClassWriter`] and is the usual way to produce input graphs for the generator without a
//! Java compiler at hand.

use crate::{
    classfile::{
        access::{ClassAccessFlags, MethodAccessFlags},
        descriptor::MethodDescriptor,
        writer::{ClassVersion, ClassWriter},
    },
    Result,
};

/// Method definition for the interface builder.
struct InterfaceMethodDefinition {
    name: String,
    descriptor: String,
    signature: Option<String>,
    exceptions: Vec<String>,
    access: MethodAccessFlags,
}

/// High-level builder for creating interface class files.
///
/// # Examples
///
/// ## Simple Interface
///
/// ```rust
/// use classforge::classfile::InterfaceBuilder;
///
/// let bytes = InterfaceBuilder::new("demo/Calculator")
///     .method("add", "(II)I")
///     .method("subtract", "(II)I")
///     .build()?;
/// # Ok::<(), classforge::Error>(())
/// ```
///
/// ## Generic Interface Inheritance
///
/// ```rust
/// use classforge::classfile::InterfaceBuilder;
///
/// let base = InterfaceBuilder::new("demo/Supplier")
///     .signature("<T:Ljava/lang/Object;>Ljava/lang/Object;")
///     .generic_method("get", "()Ljava/lang/Object;", "()TT;")
///     .build()?;
///
/// let derived = InterfaceBuilder::new("demo/NameSupplier")
///     .extends("demo/Supplier")
///     .signature("Ljava/lang/Object;Ldemo/Supplier<Ljava/lang/String;>;")
///     .method("get", "()Ljava/lang/String;")
///     .build()?;
/// # Ok::<(), classforge::Error>(())
/// ```
pub struct InterfaceBuilder {
    /// Internal name
    name: String,

    /// Class file version
    version: ClassVersion,

    /// Interface access flags
    access: ClassAccessFlags,

    /// Generic class signature
    signature: Option<String>,

    /// Direct super-interfaces in declaration order
    extends: Vec<String>,

    /// Methods in declaration order
    methods: Vec<InterfaceMethodDefinition>,
}

impl InterfaceBuilder {
    /// Creates a builder for a public interface with the given internal name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        InterfaceBuilder {
            name: name.replace('.', "/"),
            version: ClassVersion::V1_8,
            access: ClassAccessFlags::PUBLIC
                | ClassAccessFlags::INTERFACE
                | ClassAccessFlags::ABSTRACT,
            signature: None,
            extends: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Sets the class file version.
    #[must_use]
    pub fn version(mut self, version: ClassVersion) -> Self {
        self.version = version;
        self
    }

    /// Makes the interface package-private.
    #[must_use]
    pub fn package_private(mut self) -> Self {
        self.access.remove(ClassAccessFlags::PUBLIC);
        self
    }

    /// Produces a class instead of an interface, for exercising interface checks.
    #[must_use]
    pub fn as_class(mut self) -> Self {
        self.access
            .remove(ClassAccessFlags::INTERFACE | ClassAccessFlags::ABSTRACT);
        self
    }

    /// Adds a direct super-interface.
    #[must_use]
    pub fn extends(mut self, interface: &str) -> Self {
        self.extends.push(interface.replace('.', "/"));
        self
    }

    /// Sets the generic class signature.
    #[must_use]
    pub fn signature(mut self, signature: &str) -> Self {
        self.signature = Some(signature.to_string());
        self
    }

    /// Adds an abstract method.
    #[must_use]
    pub fn method(self, name: &str, descriptor: &str) -> Self {
        self.push(name, descriptor, None, &[], MethodAccessFlags::ABSTRACT)
    }

    /// Adds an abstract method with a generic signature.
    #[must_use]
    pub fn generic_method(self, name: &str, descriptor: &str, signature: &str) -> Self {
        self.push(
            name,
            descriptor,
            Some(signature),
            &[],
            MethodAccessFlags::ABSTRACT,
        )
    }

    /// Adds an abstract method declaring checked exceptions.
    #[must_use]
    pub fn method_throwing(self, name: &str, descriptor: &str, exceptions: &[&str]) -> Self {
        self.push(name, descriptor, None, exceptions, MethodAccessFlags::ABSTRACT)
    }

    /// Adds a static method whose body returns the zero value of its return type.
    #[must_use]
    pub fn static_method(self, name: &str, descriptor: &str) -> Self {
        self.push(name, descriptor, None, &[], MethodAccessFlags::STATIC)
    }

    /// Adds a default method whose body returns the zero value of its return type.
    #[must_use]
    pub fn default_method(self, name: &str, descriptor: &str) -> Self {
        self.push(name, descriptor, None, &[], MethodAccessFlags::empty())
    }

    /// Adds a compiler-style bridge: a public synthetic default method flagged `ACC_BRIDGE`.
    ///
    /// The body returns the zero value of the return type instead of delegating.
    #[must_use]
    pub fn bridge_method(self, name: &str, descriptor: &str) -> Self {
        self.push(
            name,
            descriptor,
            None,
            &[],
            MethodAccessFlags::BRIDGE | MethodAccessFlags::SYNTHETIC,
        )
    }

    /// Adds a private instance method whose body returns the zero value of its return type.
    #[must_use]
    pub fn private_method(self, name: &str, descriptor: &str) -> Self {
        self.push(name, descriptor, None, &[], MethodAccessFlags::PRIVATE)
    }

    /// Builds the class file.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidSignature`] for malformed descriptors,
    /// [`crate::Error::Malformed`] for duplicate methods, and
    /// [`crate::Error::LimitExceeded`] if class file limits are hit.
    pub fn build(self) -> Result<Vec<u8>> {
        let extends: Vec<&str> = self.extends.iter().map(String::as_str).collect();
        let mut writer = ClassWriter::new(
            self.version,
            self.access,
            &self.name,
            self.signature.as_deref(),
            Some("java/lang/Object"),
            &extends,
        )?;

        for method in &self.methods {
            let mut method_writer = writer.begin_method(
                method.access,
                &method.name,
                &method.descriptor,
                method.signature.as_deref(),
                &method.exceptions,
            )?;

            if !method.access.is_abstract() {
                let return_type = MethodDescriptor::parse(&method.descriptor)?
                    .return_type()
                    .clone();
                method_writer
                    .push_default(&return_type)?
                    .return_value(&return_type)?;
            }
            method_writer.end()?;
        }

        writer.finish()
    }

    fn push(
        mut self,
        name: &str,
        descriptor: &str,
        signature: Option<&str>,
        exceptions: &[&str],
        extra: MethodAccessFlags,
    ) -> Self {
        let visibility = if extra.is_private() {
            MethodAccessFlags::empty()
        } else {
            MethodAccessFlags::PUBLIC
        };
        self.methods.push(InterfaceMethodDefinition {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: signature.map(str::to_string),
            exceptions: exceptions.iter().map(|e| e.replace('.', "/")).collect(),
            access: visibility | extra,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{classfile::ClassMetadataReader, Error};

    #[test]
    fn test_builds_abstract_and_static_methods() {
        let bytes = InterfaceBuilder::new("demo.Clock")
            .method("now", "()J")
            .static_method("system", "()Ldemo/Clock;")
            .default_method("zone", "()I")
            .private_method("helper", "()D")
            .build()
            .unwrap();
        let metadata = ClassMetadataReader::parse(&bytes).unwrap();

        assert_eq!(metadata.name, "demo/Clock");
        let now = &metadata.methods[0];
        assert_eq!(now.access, MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT);
        assert!(metadata.methods[1].is_static());
        assert_eq!(metadata.methods[2].access, MethodAccessFlags::PUBLIC);
        assert_eq!(metadata.methods[3].access, MethodAccessFlags::PRIVATE);
    }

    #[test]
    fn test_bridge_method_flags() {
        let bytes = InterfaceBuilder::new("demo/Sub")
            .method("get", "()Ljava/lang/String;")
            .bridge_method("get", "()Ljava/lang/Object;")
            .build()
            .unwrap();
        let metadata = ClassMetadataReader::parse(&bytes).unwrap();

        assert_eq!(
            metadata.methods[1].access,
            MethodAccessFlags::PUBLIC | MethodAccessFlags::BRIDGE | MethodAccessFlags::SYNTHETIC
        );
        assert!(!metadata.methods[1].access.is_abstract());
    }

    #[test]
    fn test_as_class_clears_interface_flags() {
        let bytes = InterfaceBuilder::new("demo/NotAnInterface").as_class().build().unwrap();
        let metadata = ClassMetadataReader::parse(&bytes).unwrap();
        assert!(!metadata.is_interface());
    }

    #[test]
    fn test_invalid_descriptor_fails() {
        let result = InterfaceBuilder::new("demo/Broken").method("oops", "(X)V").build();
        assert!(matches!(result, Err(Error::InvalidSignature(_))));
    }

    #[test]
    fn test_duplicate_method_fails() {
        let result = InterfaceBuilder::new("demo/Twice")
            .method("run", "()V")
            .method("run", "()V")
            .build();
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }
}
