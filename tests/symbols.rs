//! Integration tests for the symbol table against real class file constant pools.

use classforge::{prelude::*, symbols::TextKind, Result};

#[test]
fn test_interning_is_stable() -> Result<()> {
    let mut table = SymbolTable::new();

    let long = table.long(1 << 40)?;
    let after_long = table.utf8("after")?;
    assert_eq!(after_long, long + 2);
    assert_eq!(table.long(1 << 40)?, long);

    let method = table.method_ref("java/lang/Object", "hashCode", "()I", false)?;
    let interface = table.method_ref("java/lang/Object", "hashCode", "()I", true)?;
    assert_ne!(method, interface);

    let count = table.constant_pool_count();
    table.method_ref("java/lang/Object", "hashCode", "()I", false)?;
    table.class("java/lang/Object")?;
    assert_eq!(table.constant_pool_count(), count);

    let first_type = table.normal_type("java/lang/String")?;
    let second_type = table.normal_type("java/lang/Integer")?;
    assert_eq!((first_type, second_type), (0, 1));
    assert_eq!(table.get_type(first_type).map(Item::kind), Some(ItemKind::NormalType));
    Ok(())
}

#[test]
fn test_merge_parsed_constant_pool() -> Result<()> {
    let bytes = InterfaceBuilder::new("demo/Greeter")
        .generic_method(
            "greet",
            "(Ljava/lang/Object;)Ljava/lang/String;",
            "(TT;)Ljava/lang/String;",
        )
        .signature("<T:Ljava/lang/Object;>Ljava/lang/Object;")
        .build()?;
    let metadata = ClassMetadataReader::parse(&bytes)?;

    let mut table = SymbolTable::new();
    table.utf8("unrelated")?;
    let greeter = table.class("demo/Greeter")?;

    let remapping = table.merge_items(&metadata.constant_pool)?;
    assert_eq!(remapping.constant_pool.len(), metadata.constant_pool.len());

    for item in &metadata.constant_pool {
        let mapped = remapping.map_pool_index(item.index()).unwrap();
        let merged = table.get(mapped).unwrap();
        assert_eq!(merged.payload(), item.payload());
        assert_eq!(merged.hash(), item.hash());
    }

    // The pre-existing class entry absorbed the parsed one
    let parsed_class = metadata
        .constant_pool
        .iter()
        .find(|item| item.payload() == &ItemPayload::text(TextKind::Class, "demo/Greeter"))
        .unwrap();
    assert_eq!(remapping.map_pool_index(parsed_class.index()), Some(greeter));

    // Merging the same pool again adds nothing
    let count = table.constant_pool_count();
    table.merge_items(&metadata.constant_pool)?;
    assert_eq!(table.constant_pool_count(), count);
    Ok(())
}

#[test]
fn test_merge_from_rebases_both_index_spaces() -> Result<()> {
    let mut source = SymbolTable::new();
    let string = source.normal_type("java/lang/String")?;
    let integer = source.normal_type("java/lang/Integer")?;
    let merged = source.merged_type(string, integer)?;
    source.double(2.5)?;
    source.string("hello")?;

    let mut destination = SymbolTable::new();
    destination.normal_type("java/lang/Integer")?;
    destination.utf8("padding")?;
    let remapping = destination.merge_from(&source)?;

    let string_in_destination = remapping.map_type_index(string).unwrap();
    let integer_in_destination = remapping.map_type_index(integer).unwrap();
    assert_eq!(integer_in_destination, 0);
    assert_eq!(string_in_destination, 1);

    let merged_in_destination = remapping.map_type_index(merged).unwrap();
    assert_eq!(
        destination.get_type(merged_in_destination).map(Item::payload),
        Some(&ItemPayload::Merged {
            first: integer_in_destination,
            second: string_in_destination,
        })
    );

    for item in source.pool_items() {
        let mapped = remapping.map_pool_index(item.index()).unwrap();
        assert_eq!(destination.get(mapped).map(Item::payload), Some(item.payload()));
    }
    Ok(())
}
