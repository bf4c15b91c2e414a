//! # Core Module
//!
//! The fingerprinting engine.
//!
//! ## Modules
//! - `hasher` - Decodes images and computes perceptual hashes
//! - `comparator` - Compares hashes and classifies matches

pub mod comparator;
pub mod hasher;

// Re-export commonly used types
pub use comparator::{distance, MatchResult, MatchType};
pub use hasher::{HashAlgorithmKind, HashStrategy, HashValue, Hasher};
