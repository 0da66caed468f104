//! Shared helpers for hashing and string encoding.

mod hash;
mod mutf8;

pub use hash::{java_string_hash, masked_hash, HASH_MASK};
pub use mutf8::{decode_modified_utf8, encode_modified_utf8, modified_utf8_len};
