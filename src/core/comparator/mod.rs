//! # Comparator Module
//!
//! Compares fingerprints by Hamming distance.
//!
//! ## How It Works
//! 1. Refuse to compare hashes of different algorithms or widths
//! 2. XOR the two bit patterns and count the set bits
//! 3. Optionally classify the distance and pair up likely duplicates
//!
//! ## Comparison Thresholds (64-bit hashes)
//! | Distance | Classification |
//! |----------|---------------|
//! | 0        | Exact match   |
//! | 1-4      | Near-exact    |
//! | 5-10     | Similar       |
//! | 11+      | Different     |
//!
//! Narrower hashes scale the bands by `bits / 64`.

mod traits;

pub use traits::{ComparisonStrategy, ThresholdStrategy};

use crate::core::hasher::HashValue;
use crate::error::HashError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Hamming distance between two compatible hashes, in `[0, bits]`
pub fn distance(a: &HashValue, b: &HashValue) -> Result<u32, HashError> {
    if !a.is_compatible_with(b) {
        return Err(HashError::IncompatibleHashes {
            left_algorithm: a.algorithm().to_string(),
            right_algorithm: b.algorithm().to_string(),
            left_bits: a.bits(),
            right_bits: b.bits(),
        });
    }

    let diff = (a.as_u64() ^ b.as_u64()) & a.bit_size().mask();
    Ok(diff.count_ones())
}

/// Similarity as a percentage: 100 for identical hashes, 0 when every bit differs
pub fn similarity(a: &HashValue, b: &HashValue) -> Result<f64, HashError> {
    let d = distance(a, b)?;
    Ok((1.0 - d as f64 / a.bits() as f64) * 100.0)
}

/// Result of comparing two images
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    /// Path to the first image
    pub image_a: PathBuf,
    /// Path to the second image
    pub image_b: PathBuf,
    /// Hamming distance between hashes
    pub distance: u32,
    /// Similarity as a percentage (0-100)
    pub similarity_percent: f64,
    /// Classification of the match
    pub match_type: MatchType,
}

/// Classification of match types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchType {
    /// Distance = 0, identical perceptual content
    Exact,
    /// Virtually identical
    NearExact,
    /// Likely duplicates
    Similar,
    /// Too far apart to be the same picture
    Different,
}

impl MatchType {
    /// Classify a distance measured on a `bits`-wide hash
    pub fn from_distance(distance: u32, bits: u32) -> Self {
        let scale = |limit: u32| (limit * bits).div_ceil(64);
        match distance {
            0 => MatchType::Exact,
            d if d <= scale(4) => MatchType::NearExact,
            d if d <= scale(10) => MatchType::Similar,
            _ => MatchType::Different,
        }
    }

    /// Check if this match type is considered a duplicate
    pub fn is_duplicate(&self) -> bool {
        matches!(self, MatchType::Exact | MatchType::NearExact | MatchType::Similar)
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchType::Exact => write!(f, "Exact Match"),
            MatchType::NearExact => write!(f, "Near-Exact Match"),
            MatchType::Similar => write!(f, "Similar"),
            MatchType::Different => write!(f, "Different"),
        }
    }
}

/// Compare two images' hashes and classify the result
pub fn compare(
    (path_a, hash_a): (&PathBuf, &HashValue),
    (path_b, hash_b): (&PathBuf, &HashValue),
    strategy: &dyn ComparisonStrategy,
) -> Result<MatchResult, HashError> {
    let distance = distance(hash_a, hash_b)?;
    Ok(MatchResult {
        image_a: path_a.clone(),
        image_b: path_b.clone(),
        distance,
        similarity_percent: similarity(hash_a, hash_b)?,
        match_type: strategy.classify(distance, hash_a.bits()),
    })
}

/// Find all duplicate pairs from a collection of hashes
///
/// Every hash must come from the same algorithm at the same width.
pub fn find_duplicate_pairs(
    images: &[(PathBuf, HashValue)],
    strategy: &dyn ComparisonStrategy,
) -> Result<Vec<MatchResult>, HashError> {
    let mut matches = Vec::new();

    // Compare all pairs
    for i in 0..images.len() {
        for j in (i + 1)..images.len() {
            let (path_a, hash_a) = &images[i];
            let (path_b, hash_b) = &images[j];

            let result = compare((path_a, hash_a), (path_b, hash_b), strategy)?;
            if strategy.is_duplicate(result.distance, hash_a.bits()) {
                matches.push(result);
            }
        }
    }

    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(value: i64, bits: u32, algorithm: &str) -> HashValue {
        HashValue::new(value, bits, algorithm).unwrap()
    }

    #[test]
    fn distance_counts_differing_bits() {
        let a = hash(0b1010_1010, 8, "dhash");
        let b = hash(0b0101_0101, 8, "dhash");
        assert_eq!(distance(&a, &b).unwrap(), 8);

        let c = hash(0b1010_1011, 8, "dhash");
        assert_eq!(distance(&a, &c).unwrap(), 1);
    }

    #[test]
    fn distance_is_symmetric_and_zero_on_self() {
        let a = hash(-0x1234_5678, 64, "perceptual");
        let b = hash(0x0F0F_0F0F, 64, "perceptual");

        assert_eq!(distance(&a, &a).unwrap(), 0);
        assert_eq!(distance(&a, &b).unwrap(), distance(&b, &a).unwrap());
    }

    #[test]
    fn distance_treats_negative_values_as_bit_patterns() {
        let all_ones = hash(-1, 64, "mashed");
        let zero = hash(0, 64, "mashed");
        assert_eq!(distance(&all_ones, &zero).unwrap(), 64);
    }

    #[test]
    fn distance_rejects_mismatched_algorithm_or_width() {
        let a = hash(1, 64, "perceptual");
        let b = hash(1, 64, "dhash");
        let c = hash(1, 32, "perceptual");

        assert!(matches!(
            distance(&a, &b),
            Err(HashError::IncompatibleHashes { .. })
        ));
        assert!(matches!(
            distance(&a, &c),
            Err(HashError::IncompatibleHashes { .. })
        ));
    }

    #[test]
    fn similarity_percentages() {
        let a = hash(0, 16, "dhash");
        let b = hash(0xFF, 16, "dhash");
        assert_eq!(similarity(&a, &a).unwrap(), 100.0);
        assert_eq!(similarity(&a, &b).unwrap(), 50.0);
    }

    #[test]
    fn match_type_from_distance() {
        assert_eq!(MatchType::from_distance(0, 64), MatchType::Exact);
        assert_eq!(MatchType::from_distance(3, 64), MatchType::NearExact);
        assert_eq!(MatchType::from_distance(7, 64), MatchType::Similar);
        assert_eq!(MatchType::from_distance(15, 64), MatchType::Different);
    }

    #[test]
    fn match_type_scales_with_width() {
        assert_eq!(MatchType::from_distance(1, 8), MatchType::NearExact);
        assert_eq!(MatchType::from_distance(2, 8), MatchType::Similar);
        assert_eq!(MatchType::from_distance(3, 8), MatchType::Different);
    }

    #[test]
    fn match_type_is_duplicate() {
        assert!(MatchType::Exact.is_duplicate());
        assert!(MatchType::NearExact.is_duplicate());
        assert!(MatchType::Similar.is_duplicate());
        assert!(!MatchType::Different.is_duplicate());
    }

    #[test]
    fn find_duplicate_pairs_empty_input() {
        let strategy = ThresholdStrategy::new(10);
        let pairs = find_duplicate_pairs(&[], &strategy).unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn find_duplicate_pairs_finds_matches() {
        let strategy = ThresholdStrategy::new(5); // Stricter threshold
        let images = vec![
            (PathBuf::from("/a.jpg"), hash(0xFF, 8, "dhash")),
            (PathBuf::from("/b.jpg"), hash(0xFF, 8, "dhash")), // Same hash
            (PathBuf::from("/c.jpg"), hash(0x00, 8, "dhash")), // 8 bits away
        ];

        let pairs = find_duplicate_pairs(&images, &strategy).unwrap();

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].distance, 0);
        assert_eq!(pairs[0].match_type, MatchType::Exact);
        assert_eq!(pairs[0].image_b, PathBuf::from("/b.jpg"));
    }

    #[test]
    fn find_duplicate_pairs_rejects_mixed_algorithms() {
        let strategy = ThresholdStrategy::default();
        let images = vec![
            (PathBuf::from("/a.jpg"), hash(1, 64, "dhash")),
            (PathBuf::from("/b.jpg"), hash(1, 64, "perceptual")),
        ];
        assert!(find_duplicate_pairs(&images, &strategy).is_err());
    }
}
