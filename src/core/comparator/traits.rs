//! Trait definitions for comparison strategies.

use super::MatchType;

/// Strategy trait for deciding whether two hashes are duplicates
pub trait ComparisonStrategy: Send + Sync {
    /// Decide from a distance measured on a `bits`-wide hash
    fn is_duplicate(&self, distance: u32, bits: u32) -> bool;

    /// Classify the match type based on distance
    fn classify(&self, distance: u32, bits: u32) -> MatchType {
        MatchType::from_distance(distance, bits)
    }

    /// Get the threshold used
    fn threshold(&self) -> u32;

    /// Human-readable description of the strategy
    fn description(&self) -> String;
}

/// Simple threshold-based comparison strategy
///
/// The threshold is expressed for 64-bit hashes and scaled down for
/// narrower ones.
#[derive(Debug, Clone)]
pub struct ThresholdStrategy {
    /// Maximum distance to consider as duplicate
    threshold: u32,
}

impl ThresholdStrategy {
    /// Create a new threshold strategy
    ///
    /// Recommended thresholds:
    /// - 5: Conservative, few false positives
    /// - 8: Balanced (default)
    /// - 10: Permissive, catches more near-duplicates
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    /// Create a conservative strategy (threshold = 5)
    pub fn conservative() -> Self {
        Self::new(5)
    }

    /// Create a balanced strategy (threshold = 8)
    pub fn balanced() -> Self {
        Self::new(8)
    }

    /// Create a permissive strategy (threshold = 10)
    pub fn permissive() -> Self {
        Self::new(10)
    }

    /// Threshold for a hash of the given width
    pub fn threshold_for(&self, bits: u32) -> u32 {
        (self.threshold * bits).div_ceil(64)
    }
}

impl Default for ThresholdStrategy {
    fn default() -> Self {
        Self::balanced()
    }
}

impl ComparisonStrategy for ThresholdStrategy {
    fn is_duplicate(&self, distance: u32, bits: u32) -> bool {
        distance <= self.threshold_for(bits)
    }

    fn threshold(&self) -> u32 {
        self.threshold
    }

    fn description(&self) -> String {
        format!(
            "Threshold strategy: hashes within {} of 64 bits are considered duplicates",
            self.threshold
        )
    }
}
