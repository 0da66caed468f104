//! The symbol table: a hash-consed store of constant-pool and type-table items.
//!
//! [`SymbolTable`] guarantees that each distinct payload is stored exactly once and that
//! interning the same payload twice returns the same index. Items are kept in a
//! `FxHashMap` of buckets keyed by their masked hash; bucket chains are compared by payload,
//! so hash collisions never merge distinct items.
//!
//! Two independent index spaces are maintained:
//!
//! - **Constant pool**: starts at 1. `Long` and `Double` entries occupy two slots.
//! - **Type table**: starts at 0. Holds normal, uninitialized, and merged types used by stack
//!   map frames.
//!
//! Composite constant-pool entries (class references, member references, name-and-type
//! pairs, ...) intern the entries they point at first, so after any successful call the pool
//! is closed under references and can be serialized in index order.
//!
//! # Examples
//!
//! ```rust
//! use classforge::symbols::SymbolTable;
//!
//! let mut table = SymbolTable::new();
//! let object = table.class("java/lang/Object")?;
//!
//! // Class entries intern their name first
//! assert_eq!(object, 2);
//! assert_eq!(table.class("java/lang/Object")?, object);
//! assert_eq!(table.constant_pool_count(), 3);
//! # Ok::<(), classforge::Error>(())
//! ```

use rustc_hash::FxHashMap;

use crate::{
    file::io::write_be,
    symbols::item::{DynamicKind, Item, ItemKind, ItemPayload, MemberKind, TextKind},
    utils::{encode_modified_utf8, modified_utf8_len},
    Error, Result,
};

/// Largest valid constant-pool count (`u2` in the class file header).
pub const MAX_CONSTANT_POOL_COUNT: u32 = u16::MAX as u32;

/// Largest encoded length of a `CONSTANT_Utf8` entry.
pub const MAX_UTF8_LENGTH: usize = u16::MAX as usize;

/// Index mappings produced when items are merged into a table.
///
/// Maps the source index of every merged item to its index in the destination table. The
/// two index spaces are tracked separately because they overlap numerically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolRemapping {
    /// Constant pool: source index -> destination index
    pub constant_pool: FxHashMap<u32, u32>,
    /// Type table: source index -> destination index
    pub type_table: FxHashMap<u32, u32>,
}

impl SymbolRemapping {
    /// Maps a source constant-pool index.
    #[must_use]
    pub fn map_pool_index(&self, index: u32) -> Option<u32> {
        self.constant_pool.get(&index).copied()
    }

    /// Maps a source type-table index.
    #[must_use]
    pub fn map_type_index(&self, index: u32) -> Option<u32> {
        self.type_table.get(&index).copied()
    }
}

/// Hash-consed store of constant-pool and type-table items.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    /// All items in insertion order, across both index spaces
    items: Vec<Item>,
    /// Masked hash -> positions in `items` with that hash
    buckets: FxHashMap<u32, Vec<usize>>,
    /// Constant-pool index -> position in `items`
    pool_positions: FxHashMap<u32, usize>,
    /// Type-table index -> position in `items`
    type_positions: Vec<usize>,
    /// Next free constant-pool index
    next_pool_index: u32,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// Creates an empty table. The first constant-pool index handed out is 1, the first
    /// type-table index is 0.
    #[must_use]
    pub fn new() -> Self {
        SymbolTable {
            items: Vec::new(),
            buckets: FxHashMap::default(),
            pool_positions: FxHashMap::default(),
            type_positions: Vec::new(),
            next_pool_index: 1,
        }
    }

    /// Interns `payload`, returning the existing item when an equal one is already stored.
    ///
    /// Entries referenced by the payload are interned first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LimitExceeded`] when a new entry would push the constant pool past
    /// 65535 slots or a UTF-8 entry is longer than 65535 encoded bytes.
    pub fn intern(&mut self, payload: ItemPayload) -> Result<&Item> {
        let position = self.intern_position(payload)?;
        Ok(&self.items[position])
    }

    /// Returns the index of the item equal to `payload`, without interning it.
    #[must_use]
    pub fn index_of(&self, payload: &ItemPayload) -> Option<u32> {
        self.find(payload.hash_code(), payload)
            .map(|position| self.items[position].index())
    }

    /// Interns a `CONSTANT_Utf8` entry.
    ///
    /// # Errors
    ///
    /// See [`SymbolTable::intern`].
    pub fn utf8(&mut self, value: &str) -> Result<u32> {
        self.intern_index(ItemPayload::utf8(value))
    }

    /// Interns a `CONSTANT_Class` entry for an internal name.
    ///
    /// # Errors
    ///
    /// See [`SymbolTable::intern`].
    pub fn class(&mut self, internal_name: &str) -> Result<u32> {
        self.intern_index(ItemPayload::class(internal_name))
    }

    /// Interns a `CONSTANT_String` literal.
    ///
    /// # Errors
    ///
    /// See [`SymbolTable::intern`].
    pub fn string(&mut self, value: &str) -> Result<u32> {
        self.intern_index(ItemPayload::string(value))
    }

    /// Interns a `CONSTANT_Integer`.
    ///
    /// # Errors
    ///
    /// See [`SymbolTable::intern`].
    pub fn integer(&mut self, value: i32) -> Result<u32> {
        self.intern_index(ItemPayload::Integer(value))
    }

    /// Interns a `CONSTANT_Float`.
    ///
    /// # Errors
    ///
    /// See [`SymbolTable::intern`].
    pub fn float(&mut self, value: f32) -> Result<u32> {
        self.intern_index(ItemPayload::Float(value.to_bits()))
    }

    /// Interns a `CONSTANT_Long`. Occupies two constant-pool slots.
    ///
    /// # Errors
    ///
    /// See [`SymbolTable::intern`].
    pub fn long(&mut self, value: i64) -> Result<u32> {
        self.intern_index(ItemPayload::Long(value))
    }

    /// Interns a `CONSTANT_Double`. Occupies two constant-pool slots.
    ///
    /// # Errors
    ///
    /// See [`SymbolTable::intern`].
    pub fn double(&mut self, value: f64) -> Result<u32> {
        self.intern_index(ItemPayload::Double(value.to_bits()))
    }

    /// Interns a `CONSTANT_NameAndType`.
    ///
    /// # Errors
    ///
    /// See [`SymbolTable::intern`].
    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u32> {
        self.intern_index(ItemPayload::name_and_type(name, descriptor))
    }

    /// Interns a `CONSTANT_Fieldref`.
    ///
    /// # Errors
    ///
    /// See [`SymbolTable::intern`].
    pub fn field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<u32> {
        self.intern_index(ItemPayload::member(MemberKind::Field, owner, name, descriptor))
    }

    /// Interns a `CONSTANT_Methodref` or `CONSTANT_InterfaceMethodref`.
    ///
    /// # Errors
    ///
    /// See [`SymbolTable::intern`].
    pub fn method_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
        is_interface: bool,
    ) -> Result<u32> {
        let kind = if is_interface {
            MemberKind::InterfaceMethod
        } else {
            MemberKind::Method
        };
        self.intern_index(ItemPayload::member(kind, owner, name, descriptor))
    }

    /// Interns a `CONSTANT_InterfaceMethodref`.
    ///
    /// # Errors
    ///
    /// See [`SymbolTable::intern`].
    pub fn interface_method_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u32> {
        self.method_ref(owner, name, descriptor, true)
    }

    /// Interns a `CONSTANT_MethodType`.
    ///
    /// # Errors
    ///
    /// See [`SymbolTable::intern`].
    pub fn method_type(&mut self, descriptor: &str) -> Result<u32> {
        self.intern_index(ItemPayload::method_type(descriptor))
    }

    /// Interns a `CONSTANT_MethodHandle`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] when `reference_kind` is outside `1..=9`, otherwise see
    /// [`SymbolTable::intern`].
    pub fn method_handle(
        &mut self,
        reference_kind: u8,
        member: MemberKind,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u32> {
        if !(1..=9).contains(&reference_kind) {
            return Err(malformed_error!(
                "Invalid method handle reference kind {}",
                reference_kind
            ));
        }
        self.intern_index(ItemPayload::MethodHandle {
            reference_kind,
            member,
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        })
    }

    /// Interns a `CONSTANT_InvokeDynamic` or `CONSTANT_Dynamic`.
    ///
    /// # Errors
    ///
    /// See [`SymbolTable::intern`].
    pub fn dynamic(
        &mut self,
        kind: DynamicKind,
        bootstrap_method: u16,
        name: &str,
        descriptor: &str,
    ) -> Result<u32> {
        self.intern_index(ItemPayload::Dynamic {
            kind,
            bootstrap_method,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        })
    }

    /// Interns a type-table entry for an initialized reference type.
    ///
    /// # Errors
    ///
    /// See [`SymbolTable::intern`].
    pub fn normal_type(&mut self, internal_name: &str) -> Result<u32> {
        self.intern_index(ItemPayload::normal_type(internal_name))
    }

    /// Interns a type-table entry for a value allocated by the `new` at `offset`.
    ///
    /// # Errors
    ///
    /// See [`SymbolTable::intern`].
    pub fn uninitialized_type(&mut self, internal_name: &str, offset: u32) -> Result<u32> {
        self.intern_index(ItemPayload::uninitialized(internal_name, offset))
    }

    /// Interns a type-table entry for the merge of two type-table entries.
    ///
    /// The pair is normalized so that `merged_type(a, b) == merged_type(b, a)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] when either index is not a type-table entry of this
    /// table.
    pub fn merged_type(&mut self, first: u32, second: u32) -> Result<u32> {
        if self.get_type(first).is_none() || self.get_type(second).is_none() {
            return Err(out_of_bounds_error!());
        }
        let (first, second) = if first <= second {
            (first, second)
        } else {
            (second, first)
        };
        self.intern_index(ItemPayload::Merged { first, second })
    }

    /// Returns the constant-pool item at `index`.
    #[must_use]
    pub fn get(&self, index: u32) -> Option<&Item> {
        self.pool_positions
            .get(&index)
            .map(|&position| &self.items[position])
    }

    /// Returns the type-table item at `index`.
    #[must_use]
    pub fn get_type(&self, index: u32) -> Option<&Item> {
        self.type_positions
            .get(index as usize)
            .map(|&position| &self.items[position])
    }

    /// Total number of stored items across both index spaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` when no item has been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The `constant_pool_count` value of a class file written from this table: one more than
    /// the highest used slot.
    #[must_use]
    pub fn constant_pool_count(&self) -> u32 {
        self.next_pool_index
    }

    /// Number of type-table entries.
    #[must_use]
    pub fn type_count(&self) -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        let count = self.type_positions.len() as u32;
        count
    }

    /// Iterates all items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    /// Iterates constant-pool items in index order.
    pub fn pool_items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(|item| !item.kind().is_type_table())
    }

    /// Interns every item of `other` into this table.
    ///
    /// # Errors
    ///
    /// See [`SymbolTable::merge_items`].
    pub fn merge_from(&mut self, other: &SymbolTable) -> Result<SymbolRemapping> {
        self.merge_items(other.iter())
    }

    /// Interns a sequence of items taken from another table or a parsed constant pool.
    ///
    /// Items equal to an existing entry map onto it. New items are rebased under this table's
    /// next index with their payload and hash unchanged. Merged type-table entries are
    /// translated through the type remapping built so far, so their operands must appear
    /// earlier in the sequence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] when a merged type refers to a type-table index not yet
    /// seen in the sequence, or [`Error::LimitExceeded`] when the pool overflows.
    pub fn merge_items<'a, I>(&mut self, items: I) -> Result<SymbolRemapping>
    where
        I: IntoIterator<Item = &'a Item>,
    {
        let mut remapping = SymbolRemapping::default();

        for item in items {
            let position = match item.payload() {
                ItemPayload::Merged { first, second } => {
                    let (Some(first), Some(second)) = (
                        remapping.map_type_index(*first),
                        remapping.map_type_index(*second),
                    ) else {
                        return Err(out_of_bounds_error!());
                    };
                    let index = self.merged_type(first, second)?;
                    self.type_positions[index as usize]
                }
                _ => match self.find(item.hash(), item.payload()) {
                    Some(position) => position,
                    None => {
                        self.ensure_capacity(item.payload())?;
                        self.insert_references(item.payload());
                        let index = self.allocate_index(item.kind());
                        self.insert(Item::rebased(index, item))
                    }
                },
            };

            let index = self.items[position].index();
            if item.kind().is_type_table() {
                remapping.type_table.insert(item.index(), index);
            } else {
                remapping.constant_pool.insert(item.index(), index);
            }
        }

        log::trace!(
            "Merged {} constant pool and {} type table items, table now holds {}",
            remapping.constant_pool.len(),
            remapping.type_table.len(),
            self.items.len()
        );
        Ok(remapping)
    }

    /// Serializes the constant pool: `constant_pool_count` followed by every entry in index
    /// order (JVMS §4.4).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if a referenced entry is missing, which can only happen if
    /// the table was corrupted.
    pub fn write_constant_pool(&self, out: &mut Vec<u8>) -> Result<()> {
        #[allow(clippy::cast_possible_truncation)]
        write_be(out, self.next_pool_index as u16);

        for item in self.pool_items() {
            out.push(item.kind().tag());
            match item.payload() {
                ItemPayload::Text {
                    kind: TextKind::Utf8,
                    value,
                } => {
                    let bytes = encode_modified_utf8(value);
                    #[allow(clippy::cast_possible_truncation)]
                    write_be(out, bytes.len() as u16);
                    out.extend_from_slice(&bytes);
                }
                ItemPayload::Text { value, .. } => {
                    write_be(out, self.required(&ItemPayload::utf8(value.as_str()))?);
                }
                ItemPayload::Integer(value) => write_be(out, *value),
                ItemPayload::Float(bits) => write_be(out, *bits),
                ItemPayload::Long(value) => write_be(out, *value),
                ItemPayload::Double(bits) => write_be(out, *bits),
                ItemPayload::Member {
                    owner,
                    name,
                    descriptor,
                    ..
                } => {
                    write_be(out, self.required(&ItemPayload::class(owner.as_str()))?);
                    write_be(
                        out,
                        self.required(&ItemPayload::name_and_type(
                            name.as_str(),
                            descriptor.as_str(),
                        ))?,
                    );
                }
                ItemPayload::NameAndType { name, descriptor } => {
                    write_be(out, self.required(&ItemPayload::utf8(name.as_str()))?);
                    write_be(out, self.required(&ItemPayload::utf8(descriptor.as_str()))?);
                }
                ItemPayload::MethodHandle {
                    reference_kind,
                    member,
                    owner,
                    name,
                    descriptor,
                } => {
                    out.push(*reference_kind);
                    write_be(
                        out,
                        self.required(&ItemPayload::member(
                            *member,
                            owner.as_str(),
                            name.as_str(),
                            descriptor.as_str(),
                        ))?,
                    );
                }
                ItemPayload::Dynamic {
                    bootstrap_method,
                    name,
                    descriptor,
                    ..
                } => {
                    write_be(out, *bootstrap_method);
                    write_be(
                        out,
                        self.required(&ItemPayload::name_and_type(
                            name.as_str(),
                            descriptor.as_str(),
                        ))?,
                    );
                }
                ItemPayload::Uninitialized { .. } | ItemPayload::Merged { .. } => {}
            }
        }

        Ok(())
    }

    fn intern_index(&mut self, payload: ItemPayload) -> Result<u32> {
        let position = self.intern_position(payload)?;
        Ok(self.items[position].index())
    }

    fn intern_position(&mut self, payload: ItemPayload) -> Result<usize> {
        if let Some(position) = self.find(payload.hash_code(), &payload) {
            return Ok(position);
        }

        self.ensure_capacity(&payload)?;
        Ok(self.insert_new(payload))
    }

    /// Fails unless `payload` and every entry it references that is not yet stored fit into
    /// the constant pool. Nothing is interned when this fails.
    fn ensure_capacity(&self, payload: &ItemPayload) -> Result<()> {
        let mut missing = Vec::new();
        self.collect_missing(payload, &mut missing)?;

        let slots: u32 = missing
            .iter()
            .map(ItemPayload::kind)
            .filter(|kind| !kind.is_type_table())
            .map(ItemKind::slots)
            .sum();
        let next = self.next_pool_index + slots;
        if next > MAX_CONSTANT_POOL_COUNT {
            return Err(Error::LimitExceeded(format!(
                "constant pool would need {next} slots, the maximum is {MAX_CONSTANT_POOL_COUNT}"
            )));
        }
        Ok(())
    }

    fn collect_missing(&self, payload: &ItemPayload, missing: &mut Vec<ItemPayload>) -> Result<()> {
        if missing.contains(payload) || self.find(payload.hash_code(), payload).is_some() {
            return Ok(());
        }

        if let ItemPayload::Text {
            kind: TextKind::Utf8,
            value,
        } = payload
        {
            let length = modified_utf8_len(value);
            if length > MAX_UTF8_LENGTH {
                return Err(Error::LimitExceeded(format!(
                    "UTF-8 constant of {length} bytes exceeds {MAX_UTF8_LENGTH}"
                )));
            }
        }

        for reference in references(payload) {
            self.collect_missing(&reference, missing)?;
        }
        missing.push(payload.clone());
        Ok(())
    }

    /// Stores a payload known to be absent, interning its references first.
    ///
    /// Capacity must have been checked with [`SymbolTable::ensure_capacity`].
    fn insert_new(&mut self, payload: ItemPayload) -> usize {
        self.insert_references(&payload);
        let index = self.allocate_index(payload.kind());
        self.insert(Item::new(index, payload))
    }

    fn insert_references(&mut self, payload: &ItemPayload) {
        for reference in references(payload) {
            if self.find(reference.hash_code(), &reference).is_none() {
                self.insert_new(reference);
            }
        }
    }

    fn allocate_index(&mut self, kind: ItemKind) -> u32 {
        if kind.is_type_table() {
            return self.type_count();
        }

        let index = self.next_pool_index;
        self.next_pool_index += kind.slots();
        index
    }

    fn insert(&mut self, item: Item) -> usize {
        let position = self.items.len();
        if item.kind().is_type_table() {
            self.type_positions.push(position);
        } else {
            self.pool_positions.insert(item.index(), position);
        }
        self.buckets.entry(item.hash()).or_default().push(position);
        self.items.push(item);
        position
    }

    fn find(&self, hash: u32, payload: &ItemPayload) -> Option<usize> {
        self.buckets.get(&hash).and_then(|chain| {
            chain
                .iter()
                .copied()
                .find(|&position| self.items[position].payload() == payload)
        })
    }

    fn required(&self, payload: &ItemPayload) -> Result<u16> {
        match self.index_of(payload) {
            #[allow(clippy::cast_possible_truncation)]
            Some(index) => Ok(index as u16),
            None => Err(malformed_error!("Missing constant pool entry for {}", payload)),
        }
    }
}

/// Entries a composite payload points at, in the order they are interned.
fn references(payload: &ItemPayload) -> Vec<ItemPayload> {
    match payload {
        ItemPayload::Text {
            kind: TextKind::Utf8 | TextKind::NormalType,
            ..
        } => Vec::new(),
        ItemPayload::Text { value, .. } => vec![ItemPayload::utf8(value.as_str())],
        ItemPayload::Member {
            owner,
            name,
            descriptor,
            ..
        } => vec![
            ItemPayload::class(owner.as_str()),
            ItemPayload::name_and_type(name.as_str(), descriptor.as_str()),
        ],
        ItemPayload::NameAndType { name, descriptor } => vec![
            ItemPayload::utf8(name.as_str()),
            ItemPayload::utf8(descriptor.as_str()),
        ],
        ItemPayload::MethodHandle {
            member,
            owner,
            name,
            descriptor,
            ..
        } => vec![ItemPayload::member(
            *member,
            owner.as_str(),
            name.as_str(),
            descriptor.as_str(),
        )],
        ItemPayload::Dynamic {
            name, descriptor, ..
        } => vec![ItemPayload::name_and_type(name.as_str(), descriptor.as_str())],
        ItemPayload::Integer(_)
        | ItemPayload::Float(_)
        | ItemPayload::Long(_)
        | ItemPayload::Double(_)
        | ItemPayload::Uninitialized { .. }
        | ItemPayload::Merged { .. } => Vec::new(),
    }
}
