//! Fixed-width integer, hex, and byte-search helpers.

use crate::error::{CoreError, Result};

/// Encode a `u32` as 4 little-endian bytes.
pub const fn encode_le32(value: u32) -> [u8; 4] {
    value.to_le_bytes()
}

/// Decode exactly 4 little-endian bytes.
pub fn decode_le32(bytes: &[u8]) -> Result<u32> {
    let arr: [u8; 4] = bytes.try_into().map_err(|_| {
        CoreError::InvalidInput(format!("expected 4 bytes, got {}", bytes.len()))
    })?;
    Ok(u32::from_le_bytes(arr))
}

/// Lowercase hex encoding.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode hex, accepting either case.
pub fn from_hex(s: &str) -> Result<Vec<u8>> {
    hex::decode(s).map_err(|e| CoreError::InvalidInput(format!("invalid hex: {}", e)))
}

/// Naive O(n·m) search for `needle` inside `haystack`.
///
/// An empty needle always matches. Only used on header-sized inputs.
pub fn contains_subsequence(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    if haystack.len() < needle.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_le32_layout() {
        assert_eq!(encode_le32(3), [3, 0, 0, 0]);
        assert_eq!(encode_le32(0x0403_0201), [1, 2, 3, 4]);
        assert_eq!(decode_le32(&[0xff, 0xff, 0xff, 0x7f]).unwrap(), i32::MAX as u32);
    }

    #[test]
    fn test_decode_le32_wrong_length() {
        assert!(matches!(decode_le32(&[1, 2, 3]), Err(CoreError::InvalidInput(_))));
        assert!(matches!(decode_le32(&[1, 2, 3, 4, 5]), Err(CoreError::InvalidInput(_))));
        assert!(matches!(decode_le32(&[]), Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn test_hex_lowercase_and_case_insensitive_decode() {
        assert_eq!(to_hex(&[0xde, 0xad, 0xBE, 0xef]), "deadbeef");
        assert_eq!(from_hex("DEADbeef").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(from_hex("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_from_hex_rejects_bad_input() {
        assert!(matches!(from_hex("abc"), Err(CoreError::InvalidInput(_))));
        assert!(matches!(from_hex("zz"), Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn test_contains_subsequence() {
        let eocd = [0x50, 0x4b, 0x05, 0x06];
        assert!(contains_subsequence(b"anything", &[]));
        assert!(contains_subsequence(&[], &[]));
        assert!(!contains_subsequence(&[0x50, 0x4b], &eocd));
        assert!(contains_subsequence(&[0x00, 0x50, 0x4b, 0x05, 0x06, 0x00], &eocd));
        assert!(contains_subsequence(&eocd, &eocd));
        assert!(!contains_subsequence(&[0x50, 0x4b, 0x05, 0x07], &eocd));
    }

    proptest! {
        #[test]
        fn prop_le32_roundtrip(value: u32) {
            prop_assert_eq!(decode_le32(&encode_le32(value)).unwrap(), value);
        }

        #[test]
        fn prop_hex_roundtrip(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
            let encoded = to_hex(&bytes);
            prop_assert_eq!(encoded.len(), bytes.len() * 2);
            prop_assert_eq!(from_hex(&encoded.to_uppercase()).unwrap(), bytes);
        }

        #[test]
        fn prop_embedded_needle_is_found(
            prefix in prop::collection::vec(any::<u8>(), 0..32),
            needle in prop::collection::vec(any::<u8>(), 1..8),
            suffix in prop::collection::vec(any::<u8>(), 0..32),
        ) {
            let mut haystack = prefix;
            haystack.extend_from_slice(&needle);
            haystack.extend_from_slice(&suffix);
            prop_assert!(contains_subsequence(&haystack, &needle));
        }
    }
}
