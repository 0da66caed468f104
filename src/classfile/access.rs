//! Access and property flags for classes and methods (JVMS §4.1, §4.6).
//!
//! # Key Types
//! - [`ClassAccessFlags`]: flags of the `access_flags` item of a `ClassFile`
//! - [`MethodAccessFlags`]: flags of the `access_flags` item of a `method_info`

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Class access and property modifiers
    pub struct ClassAccessFlags: u16 {
        /// Declared public
        const PUBLIC = 0x0001;
        /// Declared final; no subclasses allowed
        const FINAL = 0x0010;
        /// Treat superclass methods specially when invoked by `invokespecial`
        const SUPER = 0x0020;
        /// Is an interface, not a class
        const INTERFACE = 0x0200;
        /// Declared abstract; must not be instantiated
        const ABSTRACT = 0x0400;
        /// Not present in source code
        const SYNTHETIC = 0x1000;
        /// Declared as an annotation interface
        const ANNOTATION = 0x2000;
        /// Declared as an enum class
        const ENUM = 0x4000;
        /// Is a module, not a class or interface
        const MODULE = 0x8000;
    }
}

impl ClassAccessFlags {
    /// Returns `true` if the `INTERFACE` flag is set.
    #[must_use]
    pub fn is_interface(self) -> bool {
        self.contains(ClassAccessFlags::INTERFACE)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Method access and property modifiers
    pub struct MethodAccessFlags: u16 {
        /// Declared public
        const PUBLIC = 0x0001;
        /// Declared private
        const PRIVATE = 0x0002;
        /// Declared protected
        const PROTECTED = 0x0004;
        /// Declared static
        const STATIC = 0x0008;
        /// Declared final; must not be overridden
        const FINAL = 0x0010;
        /// Declared synchronized
        const SYNCHRONIZED = 0x0020;
        /// A bridge method, generated by the compiler
        const BRIDGE = 0x0040;
        /// Declared with a variable number of arguments
        const VARARGS = 0x0080;
        /// Declared native
        const NATIVE = 0x0100;
        /// Declared abstract; no implementation is provided
        const ABSTRACT = 0x0400;
        /// In a class file whose major version is 46 through 60, declared strictfp
        const STRICT = 0x0800;
        /// Not present in source code
        const SYNTHETIC = 0x1000;
    }
}

impl MethodAccessFlags {
    /// Returns `true` if the `STATIC` flag is set.
    #[must_use]
    pub fn is_static(self) -> bool {
        self.contains(MethodAccessFlags::STATIC)
    }

    /// Returns `true` if the `ABSTRACT` flag is set.
    #[must_use]
    pub fn is_abstract(self) -> bool {
        self.contains(MethodAccessFlags::ABSTRACT)
    }

    /// Returns `true` if the `PRIVATE` flag is set.
    #[must_use]
    pub fn is_private(self) -> bool {
        self.contains(MethodAccessFlags::PRIVATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_flags() {
        let flags = ClassAccessFlags::from_bits_truncate(0x0601);
        assert!(flags.is_interface());
        assert!(flags.contains(ClassAccessFlags::ABSTRACT | ClassAccessFlags::PUBLIC));
    }

    #[test]
    fn test_unknown_method_bits_are_dropped() {
        let flags = MethodAccessFlags::from_bits_truncate(0x8009);
        assert_eq!(flags, MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC);
        assert!(flags.is_static());
        assert!(!flags.is_abstract());
    }
}
