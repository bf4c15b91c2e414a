//! Trait definitions for hash strategies.

use super::prepare::PreparedImage;
use super::value::HashValue;
use crate::core::comparator;
use crate::error::HashError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four supported hash widths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum BitSize {
    B8,
    B16,
    B32,
    B64,
}

impl BitSize {
    /// Every supported width, narrowest first
    pub const ALL: [BitSize; 4] = [BitSize::B8, BitSize::B16, BitSize::B32, BitSize::B64];

    /// Number of bits
    pub fn bits(self) -> u32 {
        match self {
            BitSize::B8 => 8,
            BitSize::B16 => 16,
            BitSize::B32 => 32,
            BitSize::B64 => 64,
        }
    }

    /// Mask covering exactly `bits` low-order bits
    pub fn mask(self) -> u64 {
        match self {
            BitSize::B64 => u64::MAX,
            other => (1u64 << other.bits()) - 1,
        }
    }

    pub(crate) fn describe(sizes: &[BitSize]) -> String {
        sizes
            .iter()
            .map(|b| b.bits().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl TryFrom<u32> for BitSize {
    type Error = HashError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            8 => Ok(BitSize::B8),
            16 => Ok(BitSize::B16),
            32 => Ok(BitSize::B32),
            64 => Ok(BitSize::B64),
            other => Err(HashError::validation(format!(
                "Unsupported bit size: {}. Supported sizes are: {}",
                other,
                BitSize::describe(&BitSize::ALL)
            ))),
        }
    }
}

impl From<BitSize> for u32 {
    fn from(bits: BitSize) -> Self {
        bits.bits()
    }
}

impl fmt::Display for BitSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

/// Available hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HashAlgorithmKind {
    /// DCT-based perceptual hash (pHash)
    Perceptual,
    /// Adjacent-pixel gradient hash (dHash)
    #[serde(rename = "dhash")]
    Difference,
    /// HSV colour histogram hash
    ColorHistogram,
    /// Eleven-feature composite hash
    Mashed,
}

impl HashAlgorithmKind {
    /// Every algorithm, in the order the CLI reports them
    pub const ALL: [HashAlgorithmKind; 4] = [
        HashAlgorithmKind::Perceptual,
        HashAlgorithmKind::Difference,
        HashAlgorithmKind::ColorHistogram,
        HashAlgorithmKind::Mashed,
    ];

    /// The algorithm tag stored inside every `HashValue`
    pub fn tag(&self) -> &'static str {
        match self {
            HashAlgorithmKind::Perceptual => "perceptual",
            HashAlgorithmKind::Difference => "dhash",
            HashAlgorithmKind::ColorHistogram => "color-histogram",
            HashAlgorithmKind::Mashed => "mashed",
        }
    }
}

impl fmt::Display for HashAlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for HashAlgorithmKind {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "perceptual" | "phash" => Ok(HashAlgorithmKind::Perceptual),
            "dhash" | "difference" => Ok(HashAlgorithmKind::Difference),
            "color-histogram" | "color" | "colour" => Ok(HashAlgorithmKind::ColorHistogram),
            "mashed" => Ok(HashAlgorithmKind::Mashed),
            other => Err(HashError::validation(format!("Unknown algorithm: {other}"))),
        }
    }
}

/// The pixel matrix an engine needs from the preparation adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputShape {
    /// Single-channel luminance at exactly this size
    Gray { width: u32, height: u32 },
    /// Three-channel RGB (and derived HSV) at this working resolution
    Color { width: u32, height: u32 },
}

impl InputShape {
    /// `(width, height)` of the matrix
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            InputShape::Gray { width, height } | InputShape::Color { width, height } => {
                (width, height)
            }
        }
    }
}

/// Trait for hash algorithm implementations
///
/// Strategies are stateless apart from their construction-time parameters,
/// so one instance can hash many images from many threads.
pub trait HashStrategy: Send + Sync {
    /// Get the algorithm kind
    fn kind(&self) -> HashAlgorithmKind;

    /// Widths this strategy can produce
    fn supported_bits(&self) -> &'static [BitSize];

    /// Pixel matrix required for a given width
    fn required_input(&self, bits: BitSize) -> Result<InputShape, HashError>;

    /// Compute a hash from an already-decoded image
    fn hash_prepared(&self, image: &PreparedImage, bits: BitSize)
        -> Result<HashValue, HashError>;

    /// Fail with `UnsupportedBitSize` unless `bits` is one of `supported_bits()`
    fn ensure_supported(&self, bits: BitSize) -> Result<(), HashError> {
        if self.supported_bits().contains(&bits) {
            Ok(())
        } else {
            Err(unsupported_bits(self.kind(), bits.bits(), self.supported_bits()))
        }
    }

    /// Hamming distance between two hashes produced by compatible strategies
    fn distance(&self, a: &HashValue, b: &HashValue) -> Result<u32, HashError> {
        comparator::distance(a, b)
    }
}

pub(crate) fn unsupported_bits(
    kind: HashAlgorithmKind,
    bits: u32,
    supported: &[BitSize],
) -> HashError {
    HashError::UnsupportedBitSize {
        algorithm: kind.tag().to_string(),
        bits,
        supported: BitSize::describe(supported),
    }
}
