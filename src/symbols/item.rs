//! Symbol items: the deduplicated entries of a class file's constant pool and type table.
//!
//! An [`Item`] is an `(index, payload, hash)` triple. The payload is a closed sum type with one
//! case per entry kind, so kind-specific behaviour (hashing, equality, serialisation) is always
//! an exhaustive `match`. Two items are equal when their payloads are equal; the index is an
//! artifact of insertion order and never takes part in equality.
//!
//! Items are immutable. The payload is required at construction time and the hash is derived
//! from it immediately, so an item can never be observed with a stale or missing hash.
//!
//! # Hashing
//!
//! Hashes combine the numeric kind tag with payload hashes using wrapping 32-bit arithmetic,
//! then clear the sign bit (see [`crate::utils::masked_hash`]). String content is hashed with
//! the JVM `String.hashCode` algorithm, which keeps hashes identical across runs and
//! platforms:
//!
//! - text items: `kind + hash(value)`
//! - uninitialized types: `UNINITIALIZED + hash(type_name) + offset`
//! - member references: `kind + hash(owner) * hash(name) * hash(descriptor)`
//!
//! # Examples
//!
//! ```rust
//! use classforge::symbols::{Item, ItemPayload};
//!
//! let first = Item::new(4, ItemPayload::uninitialized("java/util/ArrayList", 12));
//! let second = Item::new(9, ItemPayload::uninitialized("java/util/ArrayList", 12));
//! let other_site = Item::new(10, ItemPayload::uninitialized("java/util/ArrayList", 20));
//!
//! assert!(first.is_equal_to(&second));
//! assert!(!first.is_equal_to(&other_site));
//! ```

use std::fmt;

use strum::{Display, EnumIter};

use crate::utils::{java_string_hash, masked_hash};

/// Numeric kind tags for symbol items.
///
/// Constant-pool kinds use their JVMS §4.4 tag values. The three type-table kinds used by
/// stack map frames are numbered from 30 so they can never collide with a pool tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
#[repr(u8)]
pub enum ItemKind {
    /// `CONSTANT_Utf8`
    Utf8 = 1,
    /// `CONSTANT_Integer`
    Integer = 3,
    /// `CONSTANT_Float`
    Float = 4,
    /// `CONSTANT_Long`
    Long = 5,
    /// `CONSTANT_Double`
    Double = 6,
    /// `CONSTANT_Class`
    Class = 7,
    /// `CONSTANT_String`
    String = 8,
    /// `CONSTANT_Fieldref`
    FieldRef = 9,
    /// `CONSTANT_Methodref`
    MethodRef = 10,
    /// `CONSTANT_InterfaceMethodref`
    InterfaceMethodRef = 11,
    /// `CONSTANT_NameAndType`
    NameAndType = 12,
    /// `CONSTANT_MethodHandle`
    MethodHandle = 15,
    /// `CONSTANT_MethodType`
    MethodType = 16,
    /// `CONSTANT_Dynamic`
    Dynamic = 17,
    /// `CONSTANT_InvokeDynamic`
    InvokeDynamic = 18,
    /// `CONSTANT_Module`
    Module = 19,
    /// `CONSTANT_Package`
    Package = 20,
    /// Type table: an initialized reference type
    NormalType = 30,
    /// Type table: a type allocated by `new` but not yet constructed
    UninitializedType = 31,
    /// Type table: the common super type of two type-table entries
    MergedType = 32,
}

impl ItemKind {
    /// Returns the numeric tag of this kind.
    #[must_use]
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Returns the kind for a constant-pool tag read from a class file.
    ///
    /// Type-table kinds never appear in a class file and are not returned.
    #[must_use]
    pub fn from_pool_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(ItemKind::Utf8),
            3 => Some(ItemKind::Integer),
            4 => Some(ItemKind::Float),
            5 => Some(ItemKind::Long),
            6 => Some(ItemKind::Double),
            7 => Some(ItemKind::Class),
            8 => Some(ItemKind::String),
            9 => Some(ItemKind::FieldRef),
            10 => Some(ItemKind::MethodRef),
            11 => Some(ItemKind::InterfaceMethodRef),
            12 => Some(ItemKind::NameAndType),
            15 => Some(ItemKind::MethodHandle),
            16 => Some(ItemKind::MethodType),
            17 => Some(ItemKind::Dynamic),
            18 => Some(ItemKind::InvokeDynamic),
            19 => Some(ItemKind::Module),
            20 => Some(ItemKind::Package),
            _ => None,
        }
    }

    /// Returns `true` for kinds that live in the type table rather than the constant pool.
    #[must_use]
    pub fn is_type_table(self) -> bool {
        matches!(
            self,
            ItemKind::NormalType | ItemKind::UninitializedType | ItemKind::MergedType
        )
    }

    /// Number of constant-pool slots an entry of this kind occupies.
    #[must_use]
    pub fn slots(self) -> u32 {
        match self {
            ItemKind::Long | ItemKind::Double => 2,
            _ => 1,
        }
    }

    fn hash_tag(self) -> i32 {
        i32::from(self.tag())
    }
}

/// Kinds whose payload is a single string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum TextKind {
    /// Raw modified UTF-8 text
    Utf8,
    /// Class reference by internal name or array descriptor
    Class,
    /// String literal
    String,
    /// Method type by descriptor
    MethodType,
    /// Module name
    Module,
    /// Package name
    Package,
    /// Type-table entry for an initialized reference type
    NormalType,
}

impl From<TextKind> for ItemKind {
    fn from(kind: TextKind) -> Self {
        match kind {
            TextKind::Utf8 => ItemKind::Utf8,
            TextKind::Class => ItemKind::Class,
            TextKind::String => ItemKind::String,
            TextKind::MethodType => ItemKind::MethodType,
            TextKind::Module => ItemKind::Module,
            TextKind::Package => ItemKind::Package,
            TextKind::NormalType => ItemKind::NormalType,
        }
    }
}

/// Kinds of member references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum MemberKind {
    /// `CONSTANT_Fieldref`
    Field,
    /// `CONSTANT_Methodref`
    Method,
    /// `CONSTANT_InterfaceMethodref`
    InterfaceMethod,
}

impl From<MemberKind> for ItemKind {
    fn from(kind: MemberKind) -> Self {
        match kind {
            MemberKind::Field => ItemKind::FieldRef,
            MemberKind::Method => ItemKind::MethodRef,
            MemberKind::InterfaceMethod => ItemKind::InterfaceMethodRef,
        }
    }
}

/// Kinds of dynamically computed constants and call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum DynamicKind {
    /// `CONSTANT_Dynamic`
    Constant,
    /// `CONSTANT_InvokeDynamic`
    CallSite,
}

impl From<DynamicKind> for ItemKind {
    fn from(kind: DynamicKind) -> Self {
        match kind {
            DynamicKind::Constant => ItemKind::Dynamic,
            DynamicKind::CallSite => ItemKind::InvokeDynamic,
        }
    }
}

/// The kind-specific content of a symbol item.
///
/// Payloads reference other entries structurally (by their strings), never by index, so a
/// payload means the same thing in every table it is interned into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemPayload {
    /// A string valued entry (UTF-8, class, string literal, method type, module, package, or
    /// normal type-table entry)
    Text {
        /// Which string-valued kind this is
        kind: TextKind,
        /// The string content
        value: String,
    },
    /// A 32-bit integer constant
    Integer(i32),
    /// A 32-bit float constant, stored as raw bits so NaN payloads compare structurally
    Float(u32),
    /// A 64-bit integer constant
    Long(i64),
    /// A 64-bit float constant, stored as raw bits
    Double(u64),
    /// A field, method, or interface method reference
    Member {
        /// Which reference kind this is
        kind: MemberKind,
        /// Internal name of the declaring class
        owner: String,
        /// Member name
        name: String,
        /// Field or method descriptor
        descriptor: String,
    },
    /// A name and descriptor pair
    NameAndType {
        /// Member name
        name: String,
        /// Field or method descriptor
        descriptor: String,
    },
    /// A method handle
    MethodHandle {
        /// JVMS reference kind (1..=9)
        reference_kind: u8,
        /// Kind of the referenced member
        member: MemberKind,
        /// Internal name of the declaring class
        owner: String,
        /// Member name
        name: String,
        /// Member descriptor
        descriptor: String,
    },
    /// A dynamically computed constant or call site
    Dynamic {
        /// Which dynamic kind this is
        kind: DynamicKind,
        /// Index into the `BootstrapMethods` attribute
        bootstrap_method: u16,
        /// Name of the constant or call site
        name: String,
        /// Field or method descriptor
        descriptor: String,
    },
    /// A type-table entry for an instance allocated by `new` whose constructor has not run.
    ///
    /// The same type allocated at two different instruction offsets yields two distinct
    /// entries.
    Uninitialized {
        /// Internal name of the allocated type
        type_name: String,
        /// Bytecode offset of the `new` instruction that created the value
        offset: u32,
    },
    /// A type-table entry for the common super type of two other type-table entries
    Merged {
        /// Type-table index of the first type
        first: u32,
        /// Type-table index of the second type
        second: u32,
    },
}

impl ItemPayload {
    /// A `CONSTANT_Utf8` payload.
    #[must_use]
    pub fn utf8(value: impl Into<String>) -> Self {
        ItemPayload::text(TextKind::Utf8, value)
    }

    /// A `CONSTANT_Class` payload.
    #[must_use]
    pub fn class(internal_name: impl Into<String>) -> Self {
        ItemPayload::text(TextKind::Class, internal_name)
    }

    /// A `CONSTANT_String` payload.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        ItemPayload::text(TextKind::String, value)
    }

    /// A `CONSTANT_MethodType` payload.
    #[must_use]
    pub fn method_type(descriptor: impl Into<String>) -> Self {
        ItemPayload::text(TextKind::MethodType, descriptor)
    }

    /// A type-table payload for an initialized reference type.
    #[must_use]
    pub fn normal_type(internal_name: impl Into<String>) -> Self {
        ItemPayload::text(TextKind::NormalType, internal_name)
    }

    /// A string-valued payload of the given kind.
    #[must_use]
    pub fn text(kind: TextKind, value: impl Into<String>) -> Self {
        ItemPayload::Text {
            kind,
            value: value.into(),
        }
    }

    /// A member reference payload.
    #[must_use]
    pub fn member(
        kind: MemberKind,
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        ItemPayload::Member {
            kind,
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }

    /// A name-and-type payload.
    #[must_use]
    pub fn name_and_type(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        ItemPayload::NameAndType {
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }

    /// An uninitialized-type payload for the `new` instruction at `offset`.
    #[must_use]
    pub fn uninitialized(type_name: impl Into<String>, offset: u32) -> Self {
        ItemPayload::Uninitialized {
            type_name: type_name.into(),
            offset,
        }
    }

    /// Returns the kind of this payload.
    #[must_use]
    pub fn kind(&self) -> ItemKind {
        match self {
            ItemPayload::Text { kind, .. } => (*kind).into(),
            ItemPayload::Integer(_) => ItemKind::Integer,
            ItemPayload::Float(_) => ItemKind::Float,
            ItemPayload::Long(_) => ItemKind::Long,
            ItemPayload::Double(_) => ItemKind::Double,
            ItemPayload::Member { kind, .. } => (*kind).into(),
            ItemPayload::NameAndType { .. } => ItemKind::NameAndType,
            ItemPayload::MethodHandle { .. } => ItemKind::MethodHandle,
            ItemPayload::Dynamic { kind, .. } => (*kind).into(),
            ItemPayload::Uninitialized { .. } => ItemKind::UninitializedType,
            ItemPayload::Merged { .. } => ItemKind::MergedType,
        }
    }

    /// Computes the masked, non-negative hash of this payload.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn hash_code(&self) -> u32 {
        let tag = self.kind().hash_tag();
        match self {
            ItemPayload::Text { value, .. } => masked_hash(&[tag, java_string_hash(value)]),
            ItemPayload::Integer(value) => masked_hash(&[tag, *value]),
            ItemPayload::Float(bits) => masked_hash(&[tag, *bits as i32]),
            ItemPayload::Long(value) => {
                #[allow(clippy::cast_possible_truncation)]
                let (low, high) = (*value as i32, (*value >> 32) as i32);
                masked_hash(&[tag, low, high])
            }
            ItemPayload::Double(bits) => {
                #[allow(clippy::cast_possible_truncation)]
                let (low, high) = (*bits as i32, (*bits >> 32) as i32);
                masked_hash(&[tag, low, high])
            }
            ItemPayload::Member {
                owner,
                name,
                descriptor,
                ..
            } => masked_hash(&[tag, product(&[owner, name, descriptor])]),
            ItemPayload::NameAndType { name, descriptor } => {
                masked_hash(&[tag, product(&[name, descriptor])])
            }
            ItemPayload::MethodHandle {
                reference_kind,
                owner,
                name,
                descriptor,
                ..
            } => masked_hash(&[
                tag,
                i32::from(*reference_kind),
                product(&[owner, name, descriptor]),
            ]),
            ItemPayload::Dynamic {
                bootstrap_method,
                name,
                descriptor,
                ..
            } => masked_hash(&[
                tag,
                i32::from(*bootstrap_method),
                product(&[name, descriptor]),
            ]),
            ItemPayload::Uninitialized { type_name, offset } => {
                masked_hash(&[tag, java_string_hash(type_name), *offset as i32])
            }
            ItemPayload::Merged { first, second } => {
                masked_hash(&[tag, *first as i32, *second as i32])
            }
        }
    }

    /// Returns the string content of text payloads.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ItemPayload::Text { value, .. } => Some(value),
            _ => None,
        }
    }
}

fn product(values: &[&String]) -> i32 {
    values
        .iter()
        .fold(1i32, |acc, value| acc.wrapping_mul(java_string_hash(value)))
}

impl fmt::Display for ItemPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemPayload::Text { kind, value } => write!(f, "{kind} {value}"),
            ItemPayload::Integer(value) => write!(f, "Integer {value}"),
            ItemPayload::Float(bits) => write!(f, "Float {}", f32::from_bits(*bits)),
            ItemPayload::Long(value) => write!(f, "Long {value}"),
            ItemPayload::Double(bits) => write!(f, "Double {}", f64::from_bits(*bits)),
            ItemPayload::Member {
                kind,
                owner,
                name,
                descriptor,
            } => write!(f, "{kind} {owner}.{name}:{descriptor}"),
            ItemPayload::NameAndType { name, descriptor } => {
                write!(f, "NameAndType {name}:{descriptor}")
            }
            ItemPayload::MethodHandle {
                reference_kind,
                owner,
                name,
                descriptor,
                ..
            } => write!(f, "MethodHandle {reference_kind} {owner}.{name}:{descriptor}"),
            ItemPayload::Dynamic {
                kind,
                bootstrap_method,
                name,
                descriptor,
            } => write!(f, "{kind} #{bootstrap_method} {name}:{descriptor}"),
            ItemPayload::Uninitialized { type_name, offset } => {
                write!(f, "Uninitialized {type_name}@{offset}")
            }
            ItemPayload::Merged { first, second } => write!(f, "Merged {first}|{second}"),
        }
    }
}

/// A single interned entry of a symbol table.
///
/// The index is assigned once by the owning table. Equality compares payloads only.
#[derive(Debug, Clone)]
pub struct Item {
    /// Index in the constant pool, or in the type table for type-table kinds
    index: u32,
    /// Kind-specific content
    payload: ItemPayload,
    /// Derived from the payload at construction
    hash: u32,
}

impl Item {
    /// Creates an item with the given index, deriving its hash from the payload.
    #[must_use]
    pub fn new(index: u32, payload: ItemPayload) -> Self {
        let hash = payload.hash_code();
        Item {
            index,
            payload,
            hash,
        }
    }

    /// Creates a copy of `other` under a new index.
    ///
    /// Payload and hash are taken verbatim. Used when one table's items are rebased into
    /// another table.
    #[must_use]
    pub fn rebased(index: u32, other: &Item) -> Self {
        Item {
            index,
            payload: other.payload.clone(),
            hash: other.hash,
        }
    }

    /// Returns the index assigned by the owning table.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Returns the kind of this item.
    #[must_use]
    pub fn kind(&self) -> ItemKind {
        self.payload.kind()
    }

    /// Returns the payload.
    #[must_use]
    pub fn payload(&self) -> &ItemPayload {
        &self.payload
    }

    /// Returns the masked hash derived from the payload.
    #[must_use]
    pub fn hash(&self) -> u32 {
        self.hash
    }

    /// Returns `true` when both items have the same kind and payload.
    ///
    /// The indices are not compared.
    #[must_use]
    pub fn is_equal_to(&self, other: &Item) -> bool {
        self.hash == other.hash && self.payload == other.payload
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.is_equal_to(other)
    }
}

impl Eq for Item {}

impl std::hash::Hash for Item {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.payload.hash(state);
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} = {}", self.index, self.payload)
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;
    use crate::utils::HASH_MASK;

    #[test]
    fn test_string_item_hash() {
        let item = Item::new(1, ItemPayload::string("hello"));
        assert_eq!(item.hash(), (8 + 99_162_322) & HASH_MASK);
        assert_eq!(item.kind(), ItemKind::String);
    }

    #[test]
    fn test_uninitialized_item_hash() {
        let item = Item::new(0, ItemPayload::uninitialized("a", 5));
        assert_eq!(item.hash(), 31 + 97 + 5);
        assert_eq!(item.kind(), ItemKind::UninitializedType);
    }

    #[test]
    fn test_equality_ignores_index() {
        let first = Item::new(1, ItemPayload::class("java/lang/Object"));
        let second = Item::new(42, ItemPayload::class("java/lang/Object"));
        assert_eq!(first, second);
        assert!(first.is_equal_to(&second));
    }

    #[test]
    fn test_equality_requires_same_kind() {
        let utf8 = Item::new(1, ItemPayload::utf8("java/lang/Object"));
        let class = Item::new(1, ItemPayload::class("java/lang/Object"));
        assert!(!utf8.is_equal_to(&class));
    }

    #[test]
    fn test_uninitialized_offset_sensitivity() {
        let first = Item::new(0, ItemPayload::uninitialized("java/lang/StringBuilder", 3));
        let second = Item::new(1, ItemPayload::uninitialized("java/lang/StringBuilder", 17));
        let same_site = Item::new(2, ItemPayload::uninitialized("java/lang/StringBuilder", 3));

        assert!(!first.is_equal_to(&second));
        assert!(first.is_equal_to(&same_site));
    }

    #[test]
    fn test_uninitialized_differs_from_normal_type() {
        let normal = Item::new(0, ItemPayload::normal_type("java/lang/String"));
        let uninit = Item::new(0, ItemPayload::uninitialized("java/lang/String", 0));
        assert!(!normal.is_equal_to(&uninit));
    }

    #[test]
    fn test_rebased_keeps_payload_and_hash() {
        let original = Item::new(3, ItemPayload::member(
            MemberKind::Method,
            "java/lang/Object",
            "<init>",
            "()V",
        ));
        let copy = Item::rebased(17, &original);

        assert_eq!(copy.index(), 17);
        assert_eq!(copy.hash(), original.hash());
        assert_eq!(copy.payload(), original.payload());
    }

    #[test]
    fn test_hashes_are_masked() {
        let payloads = [
            ItemPayload::Integer(-1),
            ItemPayload::Long(i64::MIN),
            ItemPayload::Double(f64::NAN.to_bits()),
            ItemPayload::Float(f32::NEG_INFINITY.to_bits()),
            ItemPayload::member(MemberKind::Field, "a/B", "value", "I"),
            ItemPayload::Merged {
                first: u32::MAX,
                second: u32::MAX,
            },
        ];
        for payload in payloads {
            assert!(payload.hash_code() <= HASH_MASK, "{payload}");
        }
    }

    #[test]
    fn test_pool_tags_roundtrip() {
        for kind in ItemKind::iter().filter(|kind| !kind.is_type_table()) {
            assert_eq!(ItemKind::from_pool_tag(kind.tag()), Some(kind));
        }
        assert_eq!(ItemKind::from_pool_tag(2), None);
        assert_eq!(ItemKind::from_pool_tag(31), None);
    }

    #[test]
    fn test_long_and_double_take_two_slots() {
        assert_eq!(ItemKind::Long.slots(), 2);
        assert_eq!(ItemKind::Double.slots(), 2);
        assert_eq!(ItemKind::Utf8.slots(), 1);
    }
}
