//! Untagged 64-bit perceptual hash API.
//!
//! Older callers stored pHash values as bare integers with no width or
//! algorithm attached. These functions keep them working on top of
//! [`HashValue`](crate::core::hasher::HashValue).

#![allow(deprecated)]

use crate::core::hasher::{DecodeOptions, HashAlgorithmKind, Hasher};
use crate::error::Result;
use std::path::Path;

/// 64-bit pHash of a file as a bare integer
#[deprecated(note = "use `Hasher::hash_file`, which returns a tagged `HashValue`")]
pub fn perceptual_hash_file(path: impl AsRef<Path>) -> Result<i64> {
    let hash = Hasher::new(HashAlgorithmKind::Perceptual).hash_file(path, 64)?;
    Ok(hash.value())
}

/// 64-bit pHash of an encoded buffer as a bare integer
#[deprecated(note = "use `Hasher::hash_bytes`, which returns a tagged `HashValue`")]
pub fn perceptual_hash_bytes(bytes: &[u8]) -> Result<i64> {
    let hash = Hasher::new(HashAlgorithmKind::Perceptual).hash_bytes(
        bytes,
        64,
        &DecodeOptions::default(),
    )?;
    Ok(hash.value())
}

/// Hamming distance between two bare 64-bit hashes
#[deprecated(note = "use `comparator::distance`, which checks algorithm and width")]
pub fn distance(a: i64, b: i64) -> u32 {
    (a ^ b).count_ones()
}
