//! The image preparation boundary.
//!
//! Owns the backend configuration, a lazily built decoder thread pool and
//! the decoded-image cache. Nothing here changes a hash value; it only
//! decides how images get read, decoded and shared.

use super::cache::{DecodeCache, DecodeCacheStats};
use super::config::{BackendConfig, DecodeOptions};
use super::fast_decode::FastDecoder;
use super::mmap_decode::read_file_bytes;
use super::prepare::PreparedImage;
use super::traits::{BitSize, HashStrategy};
use super::value::HashValue;
use crate::error::HashError;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, trace, warn};

/// Path reported in errors for in-memory buffers
pub const BUFFER_ORIGIN: &str = "<buffer>";

/// Per-path outcome of a batch run
pub type BatchResult = (PathBuf, Result<HashValue, HashError>);

/// Per-path outcome of a multi-algorithm batch
#[derive(Debug)]
pub struct FileHashes {
    pub path: PathBuf,
    /// Decode failure, or one result per strategy in the order given
    pub hashes: Result<Vec<Result<HashValue, HashError>>, HashError>,
}

/// Decodes files and buffers into [`PreparedImage`]s
pub struct ImagePreparer {
    config: BackendConfig,
    pool: OnceLock<Option<ThreadPool>>,
    cache: OnceLock<Option<DecodeCache>>,
}

impl ImagePreparer {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            pool: OnceLock::new(),
            cache: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Replace the configuration. The pool and cache are rebuilt on next use.
    pub fn reconfigure(&mut self, config: BackendConfig) {
        debug!(?config, "reconfiguring image backend");
        self.config = config;
        self.pool = OnceLock::new();
        self.cache = OnceLock::new();
    }

    fn pool(&self) -> Option<&ThreadPool> {
        self.pool
            .get_or_init(|| {
                let threads = self.config.cores.resolve();
                match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                    Ok(pool) => {
                        debug!(threads, "decoder pool ready");
                        Some(pool)
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to build decoder pool, using global pool");
                        None
                    }
                }
            })
            .as_ref()
    }

    fn cache(&self) -> Option<&DecodeCache> {
        self.cache
            .get_or_init(|| {
                self.config.cache_enabled().then(|| {
                    DecodeCache::new(self.config.max_cache_size, self.config.max_memory_bytes())
                })
            })
            .as_ref()
    }

    /// Cache occupancy, or `None` when caching is disabled
    pub fn cache_stats(&self) -> Option<DecodeCacheStats> {
        self.cache().map(DecodeCache::stats)
    }

    /// Read and decode an image file
    pub fn decode_file(&self, path: &Path) -> Result<Arc<PreparedImage>, HashError> {
        self.decode_file_with(path, &DecodeOptions::new())
    }

    /// Read and decode an image file, letting `options` pick the read path
    pub fn decode_file_with(
        &self,
        path: &Path,
        options: &DecodeOptions,
    ) -> Result<Arc<PreparedImage>, HashError> {
        let sequential = options.reads_sequentially(&self.config);
        trace!(path = %path.display(), sequential, "reading image file");
        let bytes = read_file_bytes(path, sequential)?;
        self.decode_cached(&bytes, path)
    }

    /// Decode an in-memory buffer
    ///
    /// Buffers are already resident, so only the profiles in `options`
    /// apply, and sRGB is what the decoders emit.
    pub fn decode_bytes(
        &self,
        bytes: &[u8],
        options: &DecodeOptions,
    ) -> Result<Arc<PreparedImage>, HashError> {
        trace!(len = bytes.len(), ?options, "decoding buffer");
        self.decode_cached(bytes, Path::new(BUFFER_ORIGIN))
    }

    fn decode_cached(&self, bytes: &[u8], origin: &Path) -> Result<Arc<PreparedImage>, HashError> {
        let cache = self.cache();
        let key = cache.map(|_| DecodeCache::key_for(bytes));

        if let (Some(cache), Some(key)) = (cache, key) {
            if let Some(hit) = cache.get(key) {
                trace!(origin = %origin.display(), "decode cache hit");
                return Ok(hit);
            }
        }

        let decoded = FastDecoder::decode_bytes(bytes, origin)?;
        let prepared = Arc::new(PreparedImage::from_decoded(decoded));

        if let (Some(cache), Some(key)) = (cache, key) {
            trace!(origin = %origin.display(), "decode cache miss");
            cache.insert(key, Arc::clone(&prepared));
        }

        Ok(prepared)
    }

    /// Hash every path in parallel. One failure never stops the batch.
    pub fn hash_files(
        &self,
        strategy: &dyn HashStrategy,
        paths: &[PathBuf],
        bits: BitSize,
    ) -> Vec<BatchResult> {
        self.hash_files_with(&[strategy], paths, bits, |_| {})
            .into_iter()
            .map(|file| {
                let result = file.hashes.and_then(|hashes| {
                    hashes.into_iter().next().unwrap_or_else(|| {
                        Err(HashError::validation("no hash strategy was run"))
                    })
                });
                (file.path, result)
            })
            .collect()
    }

    /// Decode each path once and run every strategy on it, in parallel on
    /// the decoder pool. `progress` is called once per finished path, from
    /// whichever worker finished it.
    pub fn hash_files_with<F>(
        &self,
        strategies: &[&dyn HashStrategy],
        paths: &[PathBuf],
        bits: BitSize,
        progress: F,
    ) -> Vec<FileHashes>
    where
        F: Fn(&Path) + Sync,
    {
        let completed = AtomicUsize::new(0);

        let run = || -> Vec<FileHashes> {
            paths
                .par_iter()
                .map(|path| {
                    let hashes = self.decode_file(path).map(|image| {
                        strategies
                            .iter()
                            .map(|strategy| strategy.hash_prepared(&image, bits))
                            .collect::<Vec<_>>()
                    });

                    match &hashes {
                        Err(e) => warn!(path = %path.display(), error = %e, "failed to decode image"),
                        Ok(results) => {
                            for e in results.iter().filter_map(|r| r.as_ref().err()) {
                                warn!(path = %path.display(), error = %e, "failed to hash image");
                            }
                        }
                    }

                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    trace!(done, total = paths.len(), "batch progress");
                    progress(path);

                    FileHashes {
                        path: path.clone(),
                        hashes,
                    }
                })
                .collect()
        };

        match self.pool() {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }
}

impl Default for ImagePreparer {
    fn default() -> Self {
        Self::new(BackendConfig::default())
    }
}
