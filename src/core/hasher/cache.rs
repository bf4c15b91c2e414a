//! Bounded in-memory cache of decoded images.
//!
//! Keyed by an xxh3 digest of the encoded bytes, so the same image read
//! from two paths, or passed twice as a buffer, decodes once. Entries are
//! evicted oldest-first when either the entry or the byte budget is exceeded.

use super::prepare::PreparedImage;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use xxhash_rust::xxh3::xxh3_64;

#[derive(Default)]
struct CacheState {
    entries: HashMap<u64, Arc<PreparedImage>>,
    order: VecDeque<u64>,
    bytes: usize,
}

/// Decoded-image cache shared by every hash computed through one preparer
pub struct DecodeCache {
    state: RwLock<CacheState>,
    max_entries: usize,
    max_bytes: usize,
}

/// Snapshot of cache occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeCacheStats {
    pub entries: usize,
    pub bytes: usize,
}

impl DecodeCache {
    pub fn new(max_entries: usize, max_bytes: usize) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            max_entries,
            max_bytes,
        }
    }

    /// Cache key for encoded bytes
    pub fn key_for(bytes: &[u8]) -> u64 {
        xxh3_64(bytes)
    }

    /// A poisoned lock is treated as a miss
    pub fn get(&self, key: u64) -> Option<Arc<PreparedImage>> {
        let state = self.state.read().ok()?;
        state.entries.get(&key).cloned()
    }

    /// Store an image; images larger than the whole budget are not kept
    pub fn insert(&self, key: u64, image: Arc<PreparedImage>) {
        let size = image.byte_size();
        if size > self.max_bytes || self.max_entries == 0 {
            return;
        }

        let Ok(mut state) = self.state.write() else {
            return;
        };

        if state.entries.contains_key(&key) {
            return;
        }

        while !state.order.is_empty()
            && (state.order.len() >= self.max_entries || state.bytes + size > self.max_bytes)
        {
            if let Some(oldest) = state.order.pop_front() {
                if let Some(evicted) = state.entries.remove(&oldest) {
                    state.bytes -= evicted.byte_size();
                }
            }
        }

        state.bytes += size;
        state.order.push_back(key);
        state.entries.insert(key, image);
    }

    pub fn clear(&self) {
        if let Ok(mut state) = self.state.write() {
            *state = CacheState::default();
        }
    }

    pub fn stats(&self) -> DecodeCacheStats {
        self.state
            .read()
            .map(|state| DecodeCacheStats {
                entries: state.entries.len(),
                bytes: state.bytes,
            })
            .unwrap_or(DecodeCacheStats {
                entries: 0,
                bytes: 0,
            })
    }
}
