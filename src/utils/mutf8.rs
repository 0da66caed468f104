//! Modified UTF-8 encoding as used by `CONSTANT_Utf8_info` (JVMS §4.4.7).
//!
//! It differs from standard UTF-8 in two ways: the NUL character is encoded as the two bytes
//! `C0 80`, and supplementary characters are encoded as a surrogate pair of two three-byte
//! sequences instead of one four-byte sequence.

use crate::Result;

/// Encodes `value` as modified UTF-8.
///
/// # Examples
///
/// ```rust
/// use classforge::utils::encode_modified_utf8;
///
/// assert_eq!(encode_modified_utf8("A\0"), vec![0x41, 0xC0, 0x80]);
/// ```
#[must_use]
pub fn encode_modified_utf8(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => {
                #[allow(clippy::cast_possible_truncation)]
                out.push(unit as u8);
            }
            0x0000 | 0x0080..=0x07FF => {
                #[allow(clippy::cast_possible_truncation)]
                {
                    out.push((0xC0 | ((unit >> 6) & 0x1F)) as u8);
                    out.push((0x80 | (unit & 0x3F)) as u8);
                }
            }
            _ => {
                #[allow(clippy::cast_possible_truncation)]
                {
                    out.push((0xE0 | ((unit >> 12) & 0x0F)) as u8);
                    out.push((0x80 | ((unit >> 6) & 0x3F)) as u8);
                    out.push((0x80 | (unit & 0x3F)) as u8);
                }
            }
        }
    }
    out
}

/// Returns the encoded length of `value` in modified UTF-8 without allocating.
#[must_use]
pub fn modified_utf8_len(value: &str) -> usize {
    value
        .encode_utf16()
        .map(|unit| match unit {
            0x0001..=0x007F => 1,
            0x0000 | 0x0080..=0x07FF => 2,
            _ => 3,
        })
        .sum()
}

/// Decodes modified UTF-8 bytes into a `String`.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] for truncated sequences, invalid lead bytes, raw NUL
/// bytes, or unpaired surrogates (which a Rust `String` cannot represent).
pub fn decode_modified_utf8(bytes: &[u8]) -> Result<String> {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut pos = 0;

    while pos < bytes.len() {
        let lead = bytes[pos];
        match lead {
            0x01..=0x7F => {
                units.push(u16::from(lead));
                pos += 1;
            }
            0xC0..=0xDF => {
                let Some(&second) = bytes.get(pos + 1) else {
                    return Err(malformed_error!("Truncated 2-byte sequence at {}", pos));
                };
                if second & 0xC0 != 0x80 {
                    return Err(malformed_error!("Invalid continuation byte at {}", pos + 1));
                }
                units.push((u16::from(lead & 0x1F) << 6) | u16::from(second & 0x3F));
                pos += 2;
            }
            0xE0..=0xEF => {
                let (Some(&second), Some(&third)) = (bytes.get(pos + 1), bytes.get(pos + 2)) else {
                    return Err(malformed_error!("Truncated 3-byte sequence at {}", pos));
                };
                if second & 0xC0 != 0x80 || third & 0xC0 != 0x80 {
                    return Err(malformed_error!("Invalid continuation byte at {}", pos + 1));
                }
                units.push(
                    (u16::from(lead & 0x0F) << 12)
                        | (u16::from(second & 0x3F) << 6)
                        | u16::from(third & 0x3F),
                );
                pos += 3;
            }
            _ => {
                return Err(malformed_error!(
                    "Invalid modified UTF-8 lead byte 0x{:02X} at {}",
                    lead,
                    pos
                ));
            }
        }
    }

    String::from_utf16(&units).map_err(|_| malformed_error!("Unpaired surrogate in string"))
}
