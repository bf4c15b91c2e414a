//! # Error Module
//!
//! Error types for fingerprint computation and comparison.
//!
//! ## Design Principles
//! - **Never panic** on image data - return errors instead
//! - **Include context** - paths, bit widths, algorithm tags
//! - **No partial hashes** - an engine returns a complete value or an error

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error for callers that also load configuration
#[derive(Error, Debug)]
pub enum FingerprintError {
    #[error("Hashing error: {0}")]
    Hash(#[from] HashError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors raised while building, computing or comparing hashes
#[derive(Error, Debug)]
pub enum HashError {
    /// Malformed `HashValue` construction arguments
    #[error("Invalid hash value: {reason}")]
    Validation { reason: String },

    /// An engine was asked for a bit width it cannot produce
    #[error("Unsupported bit size {bits} for {algorithm} (supported: {supported})")]
    UnsupportedBitSize {
        algorithm: String,
        bits: u32,
        supported: String,
    },

    /// A prepared pixel matrix does not have the shape an engine requires
    #[error(
        "Pixel matrix is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}"
    )]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error(
        "Cannot compare hashes: algorithm mismatch ({left_algorithm} vs {right_algorithm}) \
         or bit size mismatch ({left_bits} vs {right_bits})"
    )]
    IncompatibleHashes {
        left_algorithm: String,
        right_algorithm: String,
        left_bits: u32,
        right_bits: u32,
    },

    /// The image could not be read or decoded
    #[error("Failed to decode image {path}: {reason}")]
    DecodeError { path: PathBuf, reason: String },
}

impl HashError {
    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        HashError::Validation {
            reason: reason.into(),
        }
    }

    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        HashError::DecodeError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for failures of the decode boundary (bad path, corrupt data, unknown format)
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, HashError::DecodeError { .. })
    }
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, FingerprintError>;
