//! Class file writer.
//!
//! [`ClassWriter`] assembles a class file from a header and a sequence of methods. It owns the
//! [`SymbolTable`] for the class being written; every name, descriptor, and constant referenced
//! by the header, the methods, or their bytecode is interned there, and the constant pool is
//! serialised from it when [`ClassWriter::finish`] is called.
//!
//! Output is a pure function of the call sequence: the same calls always produce the same
//! bytes.
//!
//! # Examples
//!
//! ```rust
//! use classforge::classfile::{
//!     ClassAccessFlags, ClassVersion, ClassWriter, MethodAccessFlags, ReturnType,
//! };
//!
//! let mut writer = ClassWriter::new(
//!     ClassVersion::V1_8,
//!     ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
//!     "demo/Empty",
//!     None,
//!     Some("java/lang/Object"),
//!     &[],
//! )?;
//!
//! let mut init = writer.begin_method(MethodAccessFlags::PUBLIC, "<init>", "()V", None, &[])?;
//! init.aload(0)?
//!     .invokespecial("java/lang/Object", "<init>", "()V", false)?
//!     .return_value(&ReturnType::Void)?;
//! init.end()?;
//!
//! let bytes = writer.finish()?;
//! assert_eq!(&bytes[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
//! # Ok::<(), classforge::Error>(())
//! ```

use rustc_hash::FxHashSet;

use crate::{
    classfile::{
        access::{ClassAccessFlags, MethodAccessFlags},
        code::CodeBuffer,
        descriptor::{FieldType, MethodDescriptor, ReturnType},
        opcodes,
    },
    file::io::write_be,
    symbols::{ItemPayload, SymbolTable},
    Error, Result,
};

/// Class file magic number.
pub const CLASS_MAGIC: u32 = 0xCAFE_BABE;

/// Maximum number of local variable slots a method's parameters may occupy, `this` included.
pub const MAX_PARAMETER_SLOTS: u16 = 255;

/// A class file format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassVersion {
    /// Major version (52 = Java 8)
    pub major: u16,
    /// Minor version
    pub minor: u16,
}

impl ClassVersion {
    /// Java 8, the oldest version whose interfaces may declare static methods
    pub const V1_8: ClassVersion = ClassVersion::new(52, 0);
    /// Java 11
    pub const V11: ClassVersion = ClassVersion::new(55, 0);
    /// Java 17
    pub const V17: ClassVersion = ClassVersion::new(61, 0);

    /// Creates a version from its major and minor parts.
    #[must_use]
    pub const fn new(major: u16, minor: u16) -> Self {
        ClassVersion { major, minor }
    }
}

impl Default for ClassVersion {
    fn default() -> Self {
        ClassVersion::V1_8
    }
}

/// Writer for a single class file.
#[derive(Debug)]
pub struct ClassWriter {
    symbols: SymbolTable,
    version: ClassVersion,
    access: ClassAccessFlags,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    signature: Option<u16>,
    /// Encoded `method_info` structures in emission order
    methods: Vec<Vec<u8>>,
    /// `name + descriptor` of every method begun so far
    method_keys: FxHashSet<String>,
}

impl ClassWriter {
    /// Starts a new class file.
    ///
    /// # Arguments
    ///
    /// * `version` - Class file version
    /// * `access` - Class access flags
    /// * `name` - Internal name of the class
    /// * `signature` - Optional generic class signature
    /// * `super_name` - Internal name of the superclass; `None` only for `java/lang/Object`
    /// * `interfaces` - Internal names of the directly implemented interfaces, in order
    ///
    /// # Errors
    ///
    /// Returns [`Error::LimitExceeded`] if the constant pool or the interface count
    /// overflows.
    pub fn new(
        version: ClassVersion,
        access: ClassAccessFlags,
        name: &str,
        signature: Option<&str>,
        super_name: Option<&str>,
        interfaces: &[&str],
    ) -> Result<Self> {
        let mut symbols = SymbolTable::new();

        let this_class = pool_index(symbols.class(name)?)?;
        let super_class = match super_name {
            Some(super_name) => pool_index(symbols.class(super_name)?)?,
            None => 0,
        };
        if interfaces.len() > usize::from(u16::MAX) {
            return Err(Error::LimitExceeded(format!(
                "{} interfaces exceed {}",
                interfaces.len(),
                u16::MAX
            )));
        }
        let interfaces = interfaces
            .iter()
            .map(|interface| pool_index(symbols.class(interface)?))
            .collect::<Result<Vec<_>>>()?;
        let signature = match signature {
            Some(signature) => {
                symbols.utf8("Signature")?;
                Some(pool_index(symbols.utf8(signature)?)?)
            }
            None => None,
        };

        Ok(ClassWriter {
            symbols,
            version,
            access,
            this_class,
            super_class,
            interfaces,
            signature,
            methods: Vec::new(),
            method_keys: FxHashSet::default(),
        })
    }

    /// Begins a method. The returned writer must be [`MethodWriter::end`]ed to add the
    /// method to the class.
    ///
    /// Abstract and native methods have no body; any other method must emit code ending in a
    /// return instruction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSignature`] for a malformed descriptor,
    /// [`Error::Malformed`] if a method with the same name and descriptor was already begun,
    /// or [`Error::LimitExceeded`] if the parameters need more than 255 slots.
    pub fn begin_method(
        &mut self,
        access: MethodAccessFlags,
        name: &str,
        descriptor: &str,
        signature: Option<&str>,
        exceptions: &[String],
    ) -> Result<MethodWriter<'_>> {
        let parsed = MethodDescriptor::parse(descriptor)?;
        let receiver = u16::from(!access.is_static());
        let max_locals = parsed.parameter_slots() + receiver;
        if max_locals > MAX_PARAMETER_SLOTS {
            return Err(Error::LimitExceeded(format!(
                "method {name}{descriptor} needs {max_locals} parameter slots"
            )));
        }

        if !self.method_keys.insert(format!("{name}{descriptor}")) {
            return Err(malformed_error!(
                "Method {}{} is already defined in {}",
                name,
                descriptor,
                self.name()
            ));
        }

        let name_index = pool_index(self.symbols.utf8(name)?)?;
        let descriptor_index = pool_index(self.symbols.utf8(descriptor)?)?;
        let signature_index = match signature {
            Some(signature) => Some(pool_index(self.symbols.utf8(signature)?)?),
            None => None,
        };
        let exception_indices = exceptions
            .iter()
            .map(|exception| pool_index(self.symbols.class(exception)?))
            .collect::<Result<Vec<_>>>()?;

        Ok(MethodWriter {
            class: self,
            access,
            name_index,
            descriptor_index,
            descriptor: parsed,
            signature_index,
            exception_indices,
            code: CodeBuffer::new(),
            max_locals,
        })
    }

    /// The symbol table of the class being written.
    #[must_use]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Mutable access to the symbol table, for interning constants ahead of use or merging
    /// another class's constants.
    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    /// The internal name of the class being written.
    #[must_use]
    pub fn name(&self) -> &str {
        self.symbols
            .get(u32::from(self.this_class))
            .and_then(|item| item.payload().as_text())
            .unwrap_or_default()
    }

    /// Number of methods added so far.
    #[must_use]
    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    /// Serialises the class file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LimitExceeded`] if more than 65535 methods were added.
    pub fn finish(self) -> Result<Vec<u8>> {
        let method_count = u16::try_from(self.methods.len())
            .map_err(|_| Error::LimitExceeded(format!("{} methods", self.methods.len())))?;
        let signature_name = match self.signature {
            Some(_) => Some(self.attribute_name("Signature")?),
            None => None,
        };

        let mut out = Vec::with_capacity(1024);
        write_be(&mut out, CLASS_MAGIC);
        write_be(&mut out, self.version.minor);
        write_be(&mut out, self.version.major);
        self.symbols.write_constant_pool(&mut out)?;

        write_be(&mut out, self.access.bits());
        write_be(&mut out, self.this_class);
        write_be(&mut out, self.super_class);
        #[allow(clippy::cast_possible_truncation)]
        write_be(&mut out, self.interfaces.len() as u16);
        for interface in &self.interfaces {
            write_be(&mut out, *interface);
        }

        // fields_count
        write_be(&mut out, 0u16);

        write_be(&mut out, method_count);
        for method in &self.methods {
            out.extend_from_slice(method);
        }

        match (signature_name, self.signature) {
            (Some(attribute), Some(signature)) => {
                write_be(&mut out, 1u16);
                write_be(&mut out, attribute);
                write_be(&mut out, 2u32);
                write_be(&mut out, signature);
            }
            _ => write_be(&mut out, 0u16),
        }

        Ok(out)
    }

    fn attribute_name(&self, name: &str) -> Result<u16> {
        let index = self
            .symbols
            .index_of(&ItemPayload::utf8(name))
            .ok_or_else(|| malformed_error!("Attribute name {} was not interned", name))?;
        pool_index(index)
    }
}

/// Writer for one method of a class, borrowed from its [`ClassWriter`].
///
/// Instruction methods intern their operands in the class's symbol table, emit into a
/// [`CodeBuffer`], and return `&mut Self` so bodies can be written as chains.
pub struct MethodWriter<'a> {
    class: &'a mut ClassWriter,
    access: MethodAccessFlags,
    name_index: u16,
    descriptor_index: u16,
    descriptor: MethodDescriptor,
    signature_index: Option<u16>,
    exception_indices: Vec<u16>,
    code: CodeBuffer,
    max_locals: u16,
}

impl MethodWriter<'_> {
    /// The parsed descriptor of the method being written.
    #[must_use]
    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    /// The code emitted so far.
    #[must_use]
    pub fn code(&self) -> &CodeBuffer {
        &self.code
    }

    /// Local variable slots used so far.
    #[must_use]
    pub fn max_locals(&self) -> u16 {
        self.max_locals
    }

    /// Loads a reference local.
    ///
    /// # Errors
    ///
    /// Propagates [`CodeBuffer`] errors.
    pub fn aload(&mut self, slot: u16) -> Result<&mut Self> {
        self.code.aload(slot)?;
        self.touch_local(slot, 1);
        Ok(self)
    }

    /// Loads a local of the given type.
    ///
    /// # Errors
    ///
    /// Propagates [`CodeBuffer`] errors.
    pub fn load(&mut self, field: &FieldType, slot: u16) -> Result<&mut Self> {
        self.code.load(field, slot)?;
        self.touch_local(slot, field.slots());
        Ok(self)
    }

    /// Pushes an `int` constant, through the constant pool when it does not fit `sipush`.
    ///
    /// # Errors
    ///
    /// Propagates interning and [`CodeBuffer`] errors.
    pub fn push_int(&mut self, value: i32) -> Result<&mut Self> {
        match i16::try_from(value) {
            Ok(short) => self.code.push_short(short)?,
            Err(_) => {
                let index = pool_index(self.class.symbols.integer(value)?)?;
                self.code.ldc(index, false)?;
            }
        }
        Ok(self)
    }

    /// Pushes a string literal.
    ///
    /// # Errors
    ///
    /// Propagates interning and [`CodeBuffer`] errors.
    pub fn push_string(&mut self, value: &str) -> Result<&mut Self> {
        let index = pool_index(self.class.symbols.string(value)?)?;
        self.code.ldc(index, false)?;
        Ok(self)
    }

    /// Pushes `null`.
    ///
    /// # Errors
    ///
    /// Propagates [`CodeBuffer`] errors.
    pub fn push_null(&mut self) -> Result<&mut Self> {
        self.code.aconst_null()?;
        Ok(self)
    }

    /// Pushes the zero value of `return_type`.
    ///
    /// # Errors
    ///
    /// Propagates [`CodeBuffer`] errors.
    pub fn push_default(&mut self, return_type: &ReturnType) -> Result<&mut Self> {
        self.code.push_default(return_type)?;
        Ok(self)
    }

    /// Pushes a string literal, or `null` when `value` is `None`.
    ///
    /// # Errors
    ///
    /// Propagates interning and [`CodeBuffer`] errors.
    pub fn push_optional_string(&mut self, value: Option<&str>) -> Result<&mut Self> {
        match value {
            Some(value) => self.push_string(value),
            None => self.push_null(),
        }
    }

    /// Creates a reference array of `component` with the length on the stack.
    ///
    /// # Errors
    ///
    /// Propagates interning and [`CodeBuffer`] errors.
    pub fn anewarray(&mut self, component: &str) -> Result<&mut Self> {
        let index = pool_index(self.class.symbols.class(component)?)?;
        self.code.type_insn(opcodes::ANEWARRAY, index)?;
        Ok(self)
    }

    /// Casts the reference on the stack to `target` (an internal name or array descriptor).
    ///
    /// # Errors
    ///
    /// Propagates interning and [`CodeBuffer`] errors.
    pub fn checkcast(&mut self, target: &str) -> Result<&mut Self> {
        let index = pool_index(self.class.symbols.class(target)?)?;
        self.code.type_insn(opcodes::CHECKCAST, index)?;
        Ok(self)
    }

    /// `aastore`
    ///
    /// # Errors
    ///
    /// Propagates [`CodeBuffer`] errors.
    pub fn aastore(&mut self) -> Result<&mut Self> {
        self.code.aastore()?;
        Ok(self)
    }

    /// `dup`
    ///
    /// # Errors
    ///
    /// Propagates [`CodeBuffer`] errors.
    pub fn dup(&mut self) -> Result<&mut Self> {
        self.code.dup()?;
        Ok(self)
    }

    /// `pop`
    ///
    /// # Errors
    ///
    /// Propagates [`CodeBuffer`] errors.
    pub fn pop(&mut self) -> Result<&mut Self> {
        self.code.pop()?;
        Ok(self)
    }

    /// `invokespecial`
    ///
    /// # Errors
    ///
    /// Propagates descriptor, interning, and [`CodeBuffer`] errors.
    pub fn invokespecial(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
        is_interface: bool,
    ) -> Result<&mut Self> {
        self.invoke(opcodes::INVOKESPECIAL, owner, name, descriptor, is_interface)
    }

    /// `invokestatic`
    ///
    /// # Errors
    ///
    /// Propagates descriptor, interning, and [`CodeBuffer`] errors.
    pub fn invokestatic(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
        is_interface: bool,
    ) -> Result<&mut Self> {
        self.invoke(opcodes::INVOKESTATIC, owner, name, descriptor, is_interface)
    }

    /// `invokevirtual`
    ///
    /// # Errors
    ///
    /// Propagates descriptor, interning, and [`CodeBuffer`] errors.
    pub fn invokevirtual(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<&mut Self> {
        self.invoke(opcodes::INVOKEVIRTUAL, owner, name, descriptor, false)
    }

    /// `invokeinterface`
    ///
    /// # Errors
    ///
    /// Propagates descriptor, interning, and [`CodeBuffer`] errors.
    pub fn invokeinterface(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<&mut Self> {
        self.invoke(opcodes::INVOKEINTERFACE, owner, name, descriptor, true)
    }

    /// Emits the return instruction matching `return_type`.
    ///
    /// # Errors
    ///
    /// Propagates [`CodeBuffer`] errors.
    pub fn return_value(&mut self, return_type: &ReturnType) -> Result<&mut Self> {
        self.code.return_value(return_type)?;
        Ok(self)
    }

    /// Completes the method and appends it to the class.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if an abstract method has code or a concrete method has
    /// none, and propagates [`CodeBuffer::finish`] errors.
    pub fn end(self) -> Result<()> {
        let MethodWriter {
            class,
            access,
            name_index,
            descriptor_index,
            descriptor: _,
            signature_index,
            exception_indices,
            code,
            max_locals,
        } = self;

        let bodiless = access.intersects(MethodAccessFlags::ABSTRACT | MethodAccessFlags::NATIVE);
        let body = match (bodiless, code.is_empty()) {
            (true, true) => None,
            (true, false) => return Err(malformed_error!("Abstract or native method has code")),
            (false, _) => Some(code.finish()?),
        };

        let code_name = match body {
            Some(_) => Some(pool_index(class.symbols.utf8("Code")?)?),
            None => None,
        };
        let exceptions_name = if exception_indices.is_empty() {
            None
        } else {
            Some(pool_index(class.symbols.utf8("Exceptions")?)?)
        };
        let signature_name = match signature_index {
            Some(_) => Some(pool_index(class.symbols.utf8("Signature")?)?),
            None => None,
        };

        let mut out = Vec::new();
        write_be(&mut out, access.bits());
        write_be(&mut out, name_index);
        write_be(&mut out, descriptor_index);
        let attribute_count = u16::from(body.is_some())
            + u16::from(exceptions_name.is_some())
            + u16::from(signature_index.is_some());
        write_be(&mut out, attribute_count);

        if let (Some(attribute), Some((bytecode, max_stack))) = (code_name, body) {
            write_be(&mut out, attribute);
            #[allow(clippy::cast_possible_truncation)]
            write_be(&mut out, 12 + bytecode.len() as u32);
            write_be(&mut out, max_stack);
            write_be(&mut out, max_locals);
            #[allow(clippy::cast_possible_truncation)]
            write_be(&mut out, bytecode.len() as u32);
            out.extend_from_slice(&bytecode);
            // exception_table_length, attributes_count
            write_be(&mut out, 0u16);
            write_be(&mut out, 0u16);
        }

        if let Some(attribute) = exceptions_name {
            let count = u16::try_from(exception_indices.len())
                .map_err(|_| Error::LimitExceeded("declared exceptions".to_string()))?;
            write_be(&mut out, attribute);
            write_be(&mut out, 2 + 2 * u32::from(count));
            write_be(&mut out, count);
            for exception in exception_indices {
                write_be(&mut out, exception);
            }
        }

        if let (Some(attribute), Some(signature)) = (signature_name, signature_index) {
            write_be(&mut out, attribute);
            write_be(&mut out, 2u32);
            write_be(&mut out, signature);
        }

        class.methods.push(out);
        Ok(())
    }

    fn invoke(
        &mut self,
        opcode: u8,
        owner: &str,
        name: &str,
        descriptor: &str,
        is_interface: bool,
    ) -> Result<&mut Self> {
        let parsed = MethodDescriptor::parse(descriptor)?;
        let index = pool_index(
            self.class
                .symbols
                .method_ref(owner, name, descriptor, is_interface)?,
        )?;
        self.code.invoke(opcode, index, &parsed)?;
        Ok(self)
    }

    fn touch_local(&mut self, slot: u16, slots: u16) {
        self.max_locals = self.max_locals.max(slot.saturating_add(slots));
    }
}

/// Narrows a symbol table index to the `u2` used in class file structures.
pub(crate) fn pool_index(index: u32) -> Result<u16> {
    u16::try_from(index).map_err(|_| Error::LimitExceeded(format!("constant pool index {index}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writer() -> ClassWriter {
        ClassWriter::new(
            ClassVersion::V1_8,
            ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            "demo/Sample",
            None,
            Some("java/lang/Object"),
            &["demo/Api"],
        )
        .unwrap()
    }

    #[test]
    fn test_header_layout() {
        let bytes = writer().finish().unwrap();

        assert_eq!(&bytes[0..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
        assert_eq!(&bytes[4..8], &[0x00, 0x00, 0x00, 52]);
        // utf8, class for each of the three names
        assert_eq!(&bytes[8..10], &[0x00, 0x07]);
    }

    #[test]
    fn test_duplicate_methods_are_rejected() {
        let mut writer = writer();
        let method = writer
            .begin_method(
                MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT,
                "run",
                "()V",
                None,
                &[],
            )
            .unwrap();
        method.end().unwrap();

        assert!(writer
            .begin_method(MethodAccessFlags::PUBLIC, "run", "()V", None, &[])
            .is_err());
        assert_eq!(writer.method_count(), 1);
    }

    #[test]
    fn test_abstract_methods_have_no_code() {
        let mut writer = writer();
        let mut method = writer
            .begin_method(MethodAccessFlags::ABSTRACT, "run", "()V", None, &[])
            .unwrap();
        method.return_value(&ReturnType::Void).unwrap();
        assert!(method.end().is_err());
    }

    #[test]
    fn test_concrete_methods_need_a_return() {
        let mut writer = writer();
        let mut method = writer
            .begin_method(MethodAccessFlags::PUBLIC, "run", "()V", None, &[])
            .unwrap();
        method.aload(0).unwrap();
        assert!(method.end().is_err());
    }

    #[test]
    fn test_too_many_parameter_slots() {
        let mut writer = writer();
        let descriptor = format!("({})V", "J".repeat(128));
        assert!(matches!(
            writer.begin_method(MethodAccessFlags::PUBLIC, "wide", &descriptor, None, &[]),
            Err(Error::LimitExceeded(_))
        ));
    }

    #[test]
    fn test_max_locals_tracks_parameters_and_loads() {
        let mut writer = writer();
        let mut method = writer
            .begin_method(MethodAccessFlags::PUBLIC, "sum", "(IJ)V", None, &[])
            .unwrap();
        assert_eq!(method.max_locals(), 4);
        method.load(&FieldType::Base(crate::classfile::BaseType::Long), 5).unwrap();
        assert_eq!(method.max_locals(), 7);
    }

    #[test]
    fn test_large_ints_use_the_pool() {
        let mut writer = writer();
        let mut method = writer
            .begin_method(MethodAccessFlags::PUBLIC, "big", "()I", None, &[])
            .unwrap();
        method.push_int(100_000).unwrap().return_value(&ReturnType::Value(FieldType::Base(
            crate::classfile::BaseType::Int,
        ))).unwrap();
        method.end().unwrap();

        assert!(writer
            .symbols()
            .index_of(&ItemPayload::Integer(100_000))
            .is_some());
    }
}
