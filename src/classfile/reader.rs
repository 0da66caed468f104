//! Class file metadata reader.
//!
//! [`ClassMetadataReader`] extracts the parts of a class file the generator needs: the header,
//! the ordered super-interface list, the ordered method list with generic signatures and
//! declared exceptions, and the constant pool itself. Fields and bytecode are skipped.
//!
//! Parsing is strict. Any truncation, bad constant-pool index, or index pointing at an entry of
//! the wrong kind fails with [`crate::Error::Malformed`].
//!
//! # Examples
//!
//! ```rust
//! use classforge::classfile::{ClassMetadataReader, InterfaceBuilder};
//!
//! let bytes = InterfaceBuilder::new("demo/Shape")
//!     .method("area", "()D")
//!     .build()?;
//!
//! let metadata = ClassMetadataReader::parse(&bytes)?;
//! assert_eq!(metadata.name, "demo/Shape");
//! assert!(metadata.is_interface());
//! assert_eq!(metadata.methods[0].name, "area");
//! # Ok::<(), classforge::Error>(())
//! ```

use std::{path::Path, sync::Arc};

use crate::{
    classfile::{
        access::{ClassAccessFlags, MethodAccessFlags},
        signature::ClassSignature,
        writer::{ClassVersion, CLASS_MAGIC},
    },
    file::{parser::Parser, Physical},
    symbols::{DynamicKind, Item, ItemKind, ItemPayload, MemberKind, TextKind},
    Error, Result,
};

/// One method declared by a class or interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    /// Internal name of the declaring type
    pub owner: String,
    /// Method name
    pub name: String,
    /// Erased method descriptor
    pub descriptor: String,
    /// Generic signature from the `Signature` attribute
    pub signature: Option<String>,
    /// Access flags
    pub access: MethodAccessFlags,
    /// Internal names from the `Exceptions` attribute
    pub exceptions: Vec<String>,
}

impl MethodInfo {
    /// The `name + descriptor` key identifying this method within a class.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}{}", self.name, self.descriptor)
    }

    /// Returns `true` for static methods.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.access.is_static()
    }
}

/// Shared handle to parsed class metadata.
pub type ClassMetadataRc = Arc<ClassMetadata>;

/// The metadata of one class file.
#[derive(Debug, Clone)]
pub struct ClassMetadata {
    /// Class file version
    pub version: ClassVersion,
    /// Class access flags
    pub access: ClassAccessFlags,
    /// Internal name of this class
    pub name: String,
    /// Internal name of the superclass
    pub super_name: Option<String>,
    /// Internal names of the direct super-interfaces, in declaration order
    pub interfaces: Vec<String>,
    /// Generic class signature
    pub signature: Option<String>,
    /// Methods in declaration order
    pub methods: Vec<MethodInfo>,
    /// Constant-pool entries carrying their original indices, in index order
    pub constant_pool: Vec<Item>,
}

impl ClassMetadata {
    /// Returns `true` if the class is an interface.
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.access.is_interface()
    }

    /// Parses the class signature, if present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSignature`] if the attribute does not follow the grammar.
    pub fn class_signature(&self) -> Result<Option<ClassSignature>> {
        self.signature
            .as_deref()
            .map(ClassSignature::parse)
            .transpose()
    }
}

/// Reader turning class file bytes into [`ClassMetadata`].
pub struct ClassMetadataReader;

impl ClassMetadataReader {
    /// Parses class file bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] for any structural problem in the input.
    pub fn parse(data: &[u8]) -> Result<ClassMetadata> {
        let mut parser = Parser::new(data);
        read_class(&mut parser).map_err(|error| match error {
            Error::OutOfBounds => malformed_error!(
                "Truncated class file: needed more than {} bytes",
                data.len()
            ),
            other => other,
        })
    }

    /// Memory-maps and parses a class file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileError`] if the file cannot be opened, otherwise see
    /// [`ClassMetadataReader::parse`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<ClassMetadata> {
        let physical = Physical::new(path)?;
        Self::parse(physical.data())
    }
}

/// A constant-pool entry as stored in the file, with references still as indices.
enum RawEntry {
    Utf8(String),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Text(TextKind, u16),
    Member(MemberKind, u16, u16),
    NameAndType(u16, u16),
    MethodHandle(u8, u16),
    Dynamic(DynamicKind, u16, u16),
    /// Second slot of a `Long` or `Double`
    Unusable,
}

struct ConstantPool {
    entries: Vec<RawEntry>,
}

impl ConstantPool {
    fn entry(&self, index: u16) -> Result<&RawEntry> {
        match index
            .checked_sub(1)
            .and_then(|position| self.entries.get(usize::from(position)))
        {
            Some(RawEntry::Unusable) | None => {
                Err(malformed_error!("Invalid constant pool index {}", index))
            }
            Some(entry) => Ok(entry),
        }
    }

    fn utf8(&self, index: u16) -> Result<&str> {
        match self.entry(index)? {
            RawEntry::Utf8(value) => Ok(value),
            _ => Err(malformed_error!("Constant pool entry {} is not UTF-8", index)),
        }
    }

    fn class_name(&self, index: u16) -> Result<&str> {
        match self.entry(index)? {
            RawEntry::Text(TextKind::Class, name) => self.utf8(*name),
            _ => Err(malformed_error!("Constant pool entry {} is not a class", index)),
        }
    }

    fn name_and_type(&self, index: u16) -> Result<(&str, &str)> {
        match self.entry(index)? {
            RawEntry::NameAndType(name, descriptor) => {
                Ok((self.utf8(*name)?, self.utf8(*descriptor)?))
            }
            _ => Err(malformed_error!(
                "Constant pool entry {} is not a name-and-type",
                index
            )),
        }
    }

    fn member(&self, index: u16) -> Result<(MemberKind, &str, &str, &str)> {
        match self.entry(index)? {
            RawEntry::Member(kind, class, name_and_type) => {
                let owner = self.class_name(*class)?;
                let (name, descriptor) = self.name_and_type(*name_and_type)?;
                Ok((*kind, owner, name, descriptor))
            }
            _ => Err(malformed_error!(
                "Constant pool entry {} is not a member reference",
                index
            )),
        }
    }

    /// Resolves every usable entry into a structural item.
    fn items(&self) -> Result<Vec<Item>> {
        let mut items = Vec::with_capacity(self.entries.len());
        for (position, entry) in self.entries.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let index = position as u16 + 1;
            let payload = match entry {
                RawEntry::Unusable => continue,
                RawEntry::Utf8(value) => ItemPayload::utf8(value.as_str()),
                RawEntry::Integer(value) => ItemPayload::Integer(*value),
                RawEntry::Float(bits) => ItemPayload::Float(*bits),
                RawEntry::Long(value) => ItemPayload::Long(*value),
                RawEntry::Double(bits) => ItemPayload::Double(*bits),
                RawEntry::Text(kind, utf8) => ItemPayload::text(*kind, self.utf8(*utf8)?),
                RawEntry::Member(..) => {
                    let (kind, owner, name, descriptor) = self.member(index)?;
                    ItemPayload::member(kind, owner, name, descriptor)
                }
                RawEntry::NameAndType(..) => {
                    let (name, descriptor) = self.name_and_type(index)?;
                    ItemPayload::name_and_type(name, descriptor)
                }
                RawEntry::MethodHandle(reference_kind, reference) => {
                    if !(1..=9).contains(reference_kind) {
                        return Err(malformed_error!(
                            "Invalid method handle reference kind {}",
                            reference_kind
                        ));
                    }
                    let (member, owner, name, descriptor) = self.member(*reference)?;
                    ItemPayload::MethodHandle {
                        reference_kind: *reference_kind,
                        member,
                        owner: owner.to_string(),
                        name: name.to_string(),
                        descriptor: descriptor.to_string(),
                    }
                }
                RawEntry::Dynamic(kind, bootstrap_method, name_and_type) => {
                    let (name, descriptor) = self.name_and_type(*name_and_type)?;
                    ItemPayload::Dynamic {
                        kind: *kind,
                        bootstrap_method: *bootstrap_method,
                        name: name.to_string(),
                        descriptor: descriptor.to_string(),
                    }
                }
            };
            items.push(Item::new(u32::from(index), payload));
        }
        Ok(items)
    }
}

fn read_class(parser: &mut Parser<'_>) -> Result<ClassMetadata> {
    let magic = parser.read_be::<u32>()?;
    if magic != CLASS_MAGIC {
        return Err(malformed_error!("Invalid class file magic 0x{:08X}", magic));
    }
    let minor = parser.read_be::<u16>()?;
    let major = parser.read_be::<u16>()?;

    let pool = read_constant_pool(parser)?;

    let access = ClassAccessFlags::from_bits_truncate(parser.read_be::<u16>()?);
    let name = pool.class_name(parser.read_be::<u16>()?)?.to_string();
    let super_name = match parser.read_be::<u16>()? {
        0 => None,
        index => Some(pool.class_name(index)?.to_string()),
    };

    let interface_count = parser.read_be::<u16>()?;
    let mut interfaces = Vec::with_capacity(usize::from(interface_count));
    for _ in 0..interface_count {
        interfaces.push(pool.class_name(parser.read_be::<u16>()?)?.to_string());
    }

    let field_count = parser.read_be::<u16>()?;
    for _ in 0..field_count {
        // access_flags, name_index, descriptor_index
        parser.advance_by(6)?;
        skip_attributes(parser)?;
    }

    let method_count = parser.read_be::<u16>()?;
    let mut methods = Vec::with_capacity(usize::from(method_count));
    for _ in 0..method_count {
        methods.push(read_method(parser, &pool, &name)?);
    }

    let mut signature = None;
    let attribute_count = parser.read_be::<u16>()?;
    for _ in 0..attribute_count {
        let attribute_name = pool.utf8(parser.read_be::<u16>()?)?;
        let length = parser.read_be::<u32>()? as usize;
        let end = parser.pos() + length;
        if attribute_name == "Signature" {
            signature = Some(pool.utf8(parser.read_be::<u16>()?)?.to_string());
        }
        parser.seek(end)?;
    }

    if parser.has_more_data() {
        return Err(malformed_error!(
            "{} trailing bytes after class file",
            parser.len() - parser.pos()
        ));
    }

    Ok(ClassMetadata {
        version: ClassVersion::new(major, minor),
        access,
        name,
        super_name,
        interfaces,
        signature,
        methods,
        constant_pool: pool.items()?,
    })
}

fn read_constant_pool(parser: &mut Parser<'_>) -> Result<ConstantPool> {
    let count = parser.read_be::<u16>()?;
    if count == 0 {
        return Err(malformed_error!("Constant pool count must be at least 1"));
    }

    let mut entries = Vec::with_capacity(usize::from(count));
    while entries.len() + 1 < usize::from(count) {
        let tag = parser.read_be::<u8>()?;
        let Some(kind) = ItemKind::from_pool_tag(tag) else {
            return Err(malformed_error!(
                "Unknown constant pool tag {} at entry {}",
                tag,
                entries.len() + 1
            ));
        };

        let entry = match kind {
            ItemKind::Utf8 => RawEntry::Utf8(parser.read_modified_utf8()?),
            ItemKind::Integer => RawEntry::Integer(parser.read_be::<i32>()?),
            ItemKind::Float => RawEntry::Float(parser.read_be::<u32>()?),
            ItemKind::Long => RawEntry::Long(parser.read_be::<i64>()?),
            ItemKind::Double => RawEntry::Double(parser.read_be::<u64>()?),
            ItemKind::Class => RawEntry::Text(TextKind::Class, parser.read_be::<u16>()?),
            ItemKind::String => RawEntry::Text(TextKind::String, parser.read_be::<u16>()?),
            ItemKind::MethodType => {
                RawEntry::Text(TextKind::MethodType, parser.read_be::<u16>()?)
            }
            ItemKind::Module => RawEntry::Text(TextKind::Module, parser.read_be::<u16>()?),
            ItemKind::Package => RawEntry::Text(TextKind::Package, parser.read_be::<u16>()?),
            ItemKind::FieldRef | ItemKind::MethodRef | ItemKind::InterfaceMethodRef => {
                let member = match kind {
                    ItemKind::FieldRef => MemberKind::Field,
                    ItemKind::MethodRef => MemberKind::Method,
                    _ => MemberKind::InterfaceMethod,
                };
                RawEntry::Member(member, parser.read_be::<u16>()?, parser.read_be::<u16>()?)
            }
            ItemKind::NameAndType => {
                RawEntry::NameAndType(parser.read_be::<u16>()?, parser.read_be::<u16>()?)
            }
            ItemKind::MethodHandle => {
                RawEntry::MethodHandle(parser.read_be::<u8>()?, parser.read_be::<u16>()?)
            }
            ItemKind::Dynamic | ItemKind::InvokeDynamic => {
                let dynamic = if kind == ItemKind::Dynamic {
                    DynamicKind::Constant
                } else {
                    DynamicKind::CallSite
                };
                RawEntry::Dynamic(dynamic, parser.read_be::<u16>()?, parser.read_be::<u16>()?)
            }
            ItemKind::NormalType | ItemKind::UninitializedType | ItemKind::MergedType => {
                return Err(malformed_error!("Type table kind {} in constant pool", kind));
            }
        };

        entries.push(entry);
        if kind.slots() == 2 {
            if entries.len() + 1 >= usize::from(count) {
                return Err(malformed_error!("{} constant occupies the last pool slot", kind));
            }
            entries.push(RawEntry::Unusable);
        }
    }

    Ok(ConstantPool { entries })
}

fn read_method(parser: &mut Parser<'_>, pool: &ConstantPool, owner: &str) -> Result<MethodInfo> {
    let access = MethodAccessFlags::from_bits_truncate(parser.read_be::<u16>()?);
    let name = pool.utf8(parser.read_be::<u16>()?)?.to_string();
    let descriptor = pool.utf8(parser.read_be::<u16>()?)?.to_string();

    let mut signature = None;
    let mut exceptions = Vec::new();

    let attribute_count = parser.read_be::<u16>()?;
    for _ in 0..attribute_count {
        let attribute_name = pool.utf8(parser.read_be::<u16>()?)?;
        let length = parser.read_be::<u32>()? as usize;
        let end = parser.pos() + length;

        match attribute_name {
            "Signature" => {
                signature = Some(pool.utf8(parser.read_be::<u16>()?)?.to_string());
            }
            "Exceptions" => {
                let count = parser.read_be::<u16>()?;
                for _ in 0..count {
                    exceptions.push(pool.class_name(parser.read_be::<u16>()?)?.to_string());
                }
            }
            _ => {}
        }

        if parser.pos() > end {
            return Err(malformed_error!(
                "Attribute {} of {}{} overruns its length",
                attribute_name,
                name,
                descriptor
            ));
        }
        parser.seek(end)?;
    }

    Ok(MethodInfo {
        owner: owner.to_string(),
        name,
        descriptor,
        signature,
        access,
        exceptions,
    })
}

fn skip_attributes(parser: &mut Parser<'_>) -> Result<()> {
    let count = parser.read_be::<u16>()?;
    for _ in 0..count {
        parser.advance_by(2)?;
        let length = parser.read_be::<u32>()? as usize;
        parser.advance_by(length)?;
    }
    Ok(())
}
