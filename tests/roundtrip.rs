//! Integration tests for reading class files produced outside of `InterfaceBuilder`.

use std::fs;

use classforge::{prelude::*, Result};

/// Appends a `CONSTANT_Utf8` entry.
fn utf8(out: &mut Vec<u8>, value: &str) {
    out.push(1);
    out.extend_from_slice(&(value.len() as u16).to_be_bytes());
    out.extend_from_slice(value.as_bytes());
}

/// An interface with wide constants, a field, and an unknown class attribute, laid out by hand.
fn hand_assembled() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0xCAFE_BABE_u32.to_be_bytes());
    out.extend_from_slice(&[0, 0, 0, 52]);

    // #1..#10, with #6 and #8 as the second slots of the wide constants
    out.extend_from_slice(&11_u16.to_be_bytes());
    utf8(&mut out, "demo/Consts");
    out.extend_from_slice(&[7, 0, 1]);
    utf8(&mut out, "java/lang/Object");
    out.extend_from_slice(&[7, 0, 3]);
    out.push(5);
    out.extend_from_slice(&42_i64.to_be_bytes());
    out.push(6);
    out.extend_from_slice(&1.5_f64.to_bits().to_be_bytes());
    utf8(&mut out, "Deprecated");
    utf8(&mut out, "LIMIT");

    // public interface abstract, this #2, super #4, no interfaces
    out.extend_from_slice(&[0x06, 0x01, 0, 2, 0, 4, 0, 0]);
    // one field named LIMIT, no attributes
    out.extend_from_slice(&[0, 1, 0x00, 0x19, 0, 10, 0, 10, 0, 0]);
    // no methods
    out.extend_from_slice(&[0, 0]);
    // Deprecated attribute
    out.extend_from_slice(&[0, 1, 0, 9, 0, 0, 0, 0]);
    out
}

#[test]
fn test_hand_assembled_class() -> Result<()> {
    let metadata = ClassMetadataReader::parse(&hand_assembled())?;

    assert_eq!(metadata.name, "demo/Consts");
    assert_eq!(metadata.version, ClassVersion::V1_8);
    assert!(metadata.is_interface());
    assert!(metadata.methods.is_empty());
    assert_eq!(metadata.signature, None);

    let indices: Vec<u32> = metadata.constant_pool.iter().map(Item::index).collect();
    assert_eq!(indices, vec![1, 2, 3, 4, 5, 7, 9, 10]);
    assert_eq!(metadata.constant_pool[4].payload(), &ItemPayload::Long(42));
    assert_eq!(
        metadata.constant_pool[5].payload(),
        &ItemPayload::Double(1.5_f64.to_bits())
    );
    Ok(())
}

#[test]
fn test_wide_constants_survive_a_merge() -> Result<()> {
    let metadata = ClassMetadataReader::parse(&hand_assembled())?;

    let mut table = SymbolTable::new();
    let remapping = table.merge_items(&metadata.constant_pool)?;

    assert_eq!(remapping.map_pool_index(5), Some(5));
    assert_eq!(remapping.map_pool_index(7), Some(7));
    assert_eq!(remapping.map_pool_index(6), None);
    assert_eq!(table.constant_pool_count(), 11);
    Ok(())
}

#[test]
fn test_malformed_inputs() -> Result<()> {
    let valid = hand_assembled();

    let mut bad_magic = valid.clone();
    bad_magic[3] = 0xBF;
    let mut trailing = valid.clone();
    trailing.push(0);
    let mut bad_this = valid.clone();
    // `this_class` pointing at the UTF-8 entry instead of the class entry
    let this_class = valid.len() - 26;
    bad_this[this_class + 1] = 1;

    for (label, bytes) in [
        ("bad magic", bad_magic),
        ("trailing", trailing),
        ("this_class", bad_this),
        ("truncated", valid[..valid.len() - 1].to_vec()),
        ("empty", Vec::new()),
    ] {
        assert!(
            matches!(ClassMetadataReader::parse(&bytes), Err(Error::Malformed { .. })),
            "{label}"
        );
    }
    Ok(())
}

#[test]
fn test_read_from_file() -> Result<()> {
    let directory = tempfile::tempdir()?;
    let path = directory.path().join("Consts.class");
    fs::write(&path, hand_assembled())?;

    let metadata = ClassMetadataReader::from_file(&path)?;
    assert_eq!(metadata.name, "demo/Consts");
    assert_eq!(metadata.super_name.as_deref(), Some("java/lang/Object"));

    assert!(matches!(
        ClassMetadataReader::from_file(directory.path().join("Missing.class")),
        Err(Error::FileError(_))
    ));
    Ok(())
}
