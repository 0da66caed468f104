#![no_main]

use libfuzzer_sys::fuzz_target;
use classforge::prelude::*;

fuzz_target!(|data: &[u8]| {
    if let Ok(metadata) = ClassMetadataReader::parse(data) {
        let _ = metadata.class_signature();
        let mut table = SymbolTable::new();
        let _ = table.merge_items(&metadata.constant_pool);
    }
});
