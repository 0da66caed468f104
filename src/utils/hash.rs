//! Hash functions for symbol interning and content deduplication.
//!
//! Symbol items need hashes that are stable across runs, platforms, and toolchain versions,
//! because generated class files must be byte-for-byte reproducible and bucket order feeds
//! back into nothing but lookups. [`java_string_hash`] reproduces the JVM `String.hashCode`
//! algorithm for that purpose.

/// Mask clearing the sign bit, so hashes can be used directly as unsigned bucket selectors.
pub const HASH_MASK: u32 = 0x7FFF_FFFF;

/// Computes the JVM `String.hashCode` of `value`.
///
/// The hash is `s[0]*31^(n-1) + s[1]*31^(n-2) + ... + s[n-1]` over UTF-16 code units with
/// wrapping 32-bit arithmetic.
///
/// # Arguments
///
/// * `value` - The string to hash
///
/// # Examples
///
/// ```rust
/// use classforge::utils::java_string_hash;
///
/// assert_eq!(java_string_hash(""), 0);
/// assert_eq!(java_string_hash("a"), 97);
/// assert_eq!(java_string_hash("hello"), 99_162_322);
/// ```
#[must_use]
pub fn java_string_hash(value: &str) -> i32 {
    value
        .encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Combines hash components with wrapping addition and clears the sign bit.
///
/// # Examples
///
/// ```rust
/// use classforge::utils::masked_hash;
///
/// assert_eq!(masked_hash(&[1, 2, 3]), 6);
/// assert_eq!(masked_hash(&[i32::MAX, 1]), 0);
/// ```
#[must_use]
pub fn masked_hash(components: &[i32]) -> u32 {
    let sum = components
        .iter()
        .fold(0i32, |acc, component| acc.wrapping_add(*component));
    #[allow(clippy::cast_sign_loss)]
    let unsigned = sum as u32;
    unsigned & HASH_MASK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_java_hash_matches_jvm() {
        assert_eq!(java_string_hash("java/lang/Object"), 2_080_463_411);
        assert_eq!(java_string_hash("Aa"), java_string_hash("BB"));
    }

    #[test]
    fn test_java_hash_uses_utf16_units() {
        // U+1F600 encodes as the surrogate pair D83D DE00
        let expected = 0xD83Di32.wrapping_mul(31).wrapping_add(0xDE00);
        assert_eq!(java_string_hash("\u{1F600}"), expected);
    }

    #[test]
    fn test_masked_hash_is_non_negative() {
        assert_eq!(masked_hash(&[-1]), HASH_MASK);
        assert_eq!(masked_hash(&[i32::MIN]), 0);
        assert!(masked_hash(&[java_string_hash("negative-hash-candidate")]) <= HASH_MASK);
    }
}
