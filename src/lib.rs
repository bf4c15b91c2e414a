//! # phash-engine
//!
//! Perceptual image fingerprints that stay close for visually similar
//! images and far apart for different ones.
//!
//! ## Architecture
//! - `core::hasher` - Decoding, pixel preparation and the four hash engines
//! - `core::comparator` - Hamming distance and duplicate classification
//! - `compat` - Deprecated untagged 64-bit API
//! - `error` - Error types
//!
//! ## Example
//! ```rust,ignore
//! use phash_engine::core::hasher::{Hasher, HashAlgorithmKind};
//!
//! let hasher = Hasher::new(HashAlgorithmKind::Perceptual);
//! let a = hasher.hash_file("a.jpg", 64)?;
//! let b = hasher.hash_file("b.jpg", 64)?;
//! println!("distance: {}", hasher.distance(&a, &b)?);
//! ```

pub mod compat;
pub mod core;
pub mod error;

// Re-export commonly used types at the crate root
pub use crate::core::hasher::{BitSize, HashAlgorithmKind, HashValue, Hasher, HasherConfig};
pub use error::{FingerprintError, HashError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. `RUST_LOG`
/// overrides `default_level` when set. Calling it twice is harmless.
pub fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
