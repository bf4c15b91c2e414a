//! The tagged, fixed-width hash value shared by every algorithm.

use super::traits::BitSize;
use crate::error::HashError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One computed fingerprint
///
/// `value` uses unsigned semantics for the 8/16/32-bit widths and
/// two's-complement `i64` semantics for the 64-bit width, so the full
/// 64-bit pattern always fits. Values are immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawHashValue")]
pub struct HashValue {
    value: i64,
    bits: BitSize,
    algorithm: String,
}

#[derive(Deserialize)]
struct RawHashValue {
    value: i64,
    bits: u32,
    algorithm: String,
}

impl TryFrom<RawHashValue> for HashValue {
    type Error = HashError;

    fn try_from(raw: RawHashValue) -> Result<Self, Self::Error> {
        HashValue::new(raw.value, raw.bits, raw.algorithm)
    }
}

impl HashValue {
    /// Validate and build a hash value
    pub fn new(value: i64, bits: u32, algorithm: impl Into<String>) -> Result<Self, HashError> {
        let bits = BitSize::try_from(bits)?;
        let algorithm = algorithm.into();

        if bits != BitSize::B64 {
            let max = bits.mask() as i64;
            if !(0..=max).contains(&value) {
                return Err(HashError::validation(format!(
                    "Hash value {} exceeds {}-bit range (0-{})",
                    value, bits, max
                )));
            }
        }

        if algorithm.is_empty() {
            return Err(HashError::validation("Algorithm name cannot be empty"));
        }

        Ok(Self {
            value,
            bits,
            algorithm,
        })
    }

    /// Build from an unsigned bit pattern, as the engines produce it
    pub fn from_bits(
        pattern: u64,
        bits: BitSize,
        algorithm: impl Into<String>,
    ) -> Result<Self, HashError> {
        let value = match bits {
            BitSize::B64 => pattern as i64,
            _ => i64::try_from(pattern).map_err(|_| {
                HashError::validation(format!("Hash pattern {pattern:#x} exceeds {bits}-bit range"))
            })?,
        };
        Self::new(value, bits.bits(), algorithm)
    }

    /// Parse the output of [`HashValue::to_hex`]
    pub fn from_hex(hex: &str, bits: u32, algorithm: impl Into<String>) -> Result<Self, HashError> {
        let size = BitSize::try_from(bits)?;
        let expected = (bits / 4) as usize;
        if hex.len() != expected {
            return Err(HashError::validation(format!(
                "Hex string has {} digits, expected {} for {}-bit hash",
                hex.len(),
                expected,
                bits
            )));
        }
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(HashError::validation(format!("Invalid hex string {hex:?}")));
        }
        let pattern = u64::from_str_radix(hex, 16)
            .map_err(|e| HashError::validation(format!("Invalid hex string {hex:?}: {e}")))?;
        Self::from_bits(pattern, size, algorithm)
    }

    /// Parse the output of [`HashValue::to_binary`]
    pub fn from_binary(
        binary: &str,
        bits: u32,
        algorithm: impl Into<String>,
    ) -> Result<Self, HashError> {
        let size = BitSize::try_from(bits)?;
        if binary.len() != bits as usize {
            return Err(HashError::validation(format!(
                "Binary string has {} digits, expected {}",
                binary.len(),
                bits
            )));
        }
        if !binary.chars().all(|c| c == '0' || c == '1') {
            return Err(HashError::validation(format!(
                "Invalid binary string {binary:?}"
            )));
        }
        let pattern = u64::from_str_radix(binary, 2).map_err(|e| {
            HashError::validation(format!("Invalid binary string {binary:?}: {e}"))
        })?;
        Self::from_bits(pattern, size, algorithm)
    }

    /// The stored integer
    pub fn value(&self) -> i64 {
        self.value
    }

    /// Hash width in bits
    pub fn bits(&self) -> u32 {
        self.bits.bits()
    }

    pub fn bit_size(&self) -> BitSize {
        self.bits
    }

    /// The algorithm tag, e.g. "perceptual"
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// The value reinterpreted as an unsigned bit pattern
    pub fn as_u64(&self) -> u64 {
        (self.value as u64) & self.bits.mask()
    }

    /// Exactly `bits / 4` lowercase hex digits, zero-padded
    pub fn to_hex(&self) -> String {
        format!(
            "{:0width$x}",
            self.as_u64(),
            width = (self.bits() / 4) as usize
        )
    }

    /// Exactly `bits` binary digits, most significant first
    pub fn to_binary(&self) -> String {
        format!("{:0width$b}", self.as_u64(), width = self.bits() as usize)
    }

    /// Same algorithm and width, so a distance is meaningful
    pub fn is_compatible_with(&self, other: &HashValue) -> bool {
        self.algorithm == other.algorithm && self.bits == other.bits
    }
}

impl fmt::Display for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_valid_parameters() {
        let hash = HashValue::new(12345, 64, "perceptual").unwrap();

        assert_eq!(hash.value(), 12345);
        assert_eq!(hash.bits(), 64);
        assert_eq!(hash.algorithm(), "perceptual");
    }

    #[test]
    fn rejects_unsupported_bit_size() {
        let err = HashValue::new(12345, 128, "perceptual").unwrap_err();
        assert!(err.to_string().contains("Unsupported bit size"));
    }

    #[test]
    fn rejects_empty_algorithm() {
        let err = HashValue::new(12345, 64, "").unwrap_err();
        assert!(err.to_string().contains("Algorithm name cannot be empty"));
    }

    #[test]
    fn rejects_values_one_past_the_width() {
        for (bits, max) in [(8u32, 255i64), (16, 65_535), (32, 4_294_967_295)] {
            let err = HashValue::new(max + 1, bits, "test").unwrap_err();
            assert!(err.to_string().contains(&format!("exceeds {bits}-bit range")));
            assert!(HashValue::new(max, bits, "test").is_ok());
        }
    }

    #[test]
    fn rejects_negative_values_below_64_bits() {
        assert!(HashValue::new(-1, 32, "test").is_err());
    }

    #[test]
    fn allows_negative_values_at_64_bits() {
        let hash = HashValue::new(-12345, 64, "perceptual").unwrap();
        assert_eq!(hash.value(), -12345);

        let min = HashValue::new(i64::MIN, 64, "test").unwrap();
        assert_eq!(min.to_hex(), "8000000000000000");
        assert_eq!(min.to_binary().len(), 64);
        assert!(min.to_binary().starts_with('1'));
    }

    #[test]
    fn hex_is_zero_padded_to_width() {
        assert_eq!(HashValue::new(255, 8, "test").unwrap().to_hex(), "ff");
        assert_eq!(HashValue::new(65535, 16, "test").unwrap().to_hex(), "ffff");
        assert_eq!(HashValue::new(4_294_967_295, 32, "test").unwrap().to_hex(), "ffffffff");
        assert_eq!(HashValue::new(1, 64, "test").unwrap().to_hex(), "0000000000000001");
        assert_eq!(HashValue::new(-1, 64, "test").unwrap().to_hex(), "ffffffffffffffff");
    }

    #[test]
    fn binary_is_msb_first() {
        assert_eq!(HashValue::new(170, 8, "test").unwrap().to_binary(), "10101010");
        assert_eq!(
            HashValue::new(43690, 16, "test").unwrap().to_binary(),
            "1010101010101010"
        );

        let one = HashValue::new(1, 64, "test").unwrap().to_binary();
        assert_eq!(one.len(), 64);
        assert!(one.ends_with('1'));
    }

    #[test]
    fn text_forms_parse_back_to_the_same_pattern() {
        let cases = [
            HashValue::new(0x5A, 8, "dhash").unwrap(),
            HashValue::new(0xBEEF, 16, "dhash").unwrap(),
            HashValue::new(0xDEAD_BEEF, 32, "dhash").unwrap(),
            HashValue::new(-0x0123_4567_89AB_CDEF, 64, "perceptual").unwrap(),
            HashValue::new(i64::MIN, 64, "mashed").unwrap(),
        ];

        for hash in cases {
            let from_hex = HashValue::from_hex(&hash.to_hex(), hash.bits(), hash.algorithm());
            let from_binary =
                HashValue::from_binary(&hash.to_binary(), hash.bits(), hash.algorithm());
            assert_eq!(from_hex.unwrap(), hash);
            assert_eq!(from_binary.unwrap(), hash);
        }
    }

    #[test]
    fn from_hex_requires_exact_length() {
        assert!(HashValue::from_hex("fff", 8, "test").is_err());
        assert!(HashValue::from_hex("zz", 8, "test").is_err());
    }

    #[test]
    fn parsers_reject_sign_prefixes() {
        assert!(HashValue::from_hex("+f", 8, "test").is_err());
        assert!(HashValue::from_hex("-f", 8, "test").is_err());
        assert!(HashValue::from_hex("+fffffffffffffff", 64, "test").is_err());
        assert!(HashValue::from_binary("+0000001", 8, "test").is_err());
        assert!(HashValue::from_binary("0000 001", 8, "test").is_err());
        assert_eq!(HashValue::from_hex("0f", 8, "test").unwrap().value(), 15);
    }

    #[test]
    fn equality_needs_value_bits_and_algorithm() {
        let hash1 = HashValue::new(12345, 64, "perceptual").unwrap();
        let hash2 = HashValue::new(12345, 64, "perceptual").unwrap();
        let hash3 = HashValue::new(12346, 64, "perceptual").unwrap();
        let hash4 = HashValue::new(12345, 32, "perceptual").unwrap();
        let hash5 = HashValue::new(12345, 64, "dhash").unwrap();

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
        assert_ne!(hash1, hash4);
        assert_ne!(hash1, hash5);
    }

    #[test]
    fn compatibility_ignores_value() {
        let hash1 = HashValue::new(12345, 64, "perceptual").unwrap();
        let hash2 = HashValue::new(67890, 64, "perceptual").unwrap();
        let hash3 = HashValue::new(12345, 32, "perceptual").unwrap();
        let hash4 = HashValue::new(12345, 64, "dhash").unwrap();

        assert!(hash1.is_compatible_with(&hash2));
        assert!(!hash1.is_compatible_with(&hash3));
        assert!(!hash1.is_compatible_with(&hash4));
    }

    #[test]
    fn serde_validates_on_the_way_in() {
        let hash = HashValue::new(-7, 64, "mashed").unwrap();
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, r#"{"value":-7,"bits":64,"algorithm":"mashed"}"#);
        assert_eq!(serde_json::from_str::<HashValue>(&json).unwrap(), hash);

        let bad = r#"{"value":256,"bits":8,"algorithm":"dhash"}"#;
        assert!(serde_json::from_str::<HashValue>(bad).is_err());
    }
}
