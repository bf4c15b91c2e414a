//! # Hasher Module
//!
//! Computes perceptual fingerprints for images.
//!
//! ## Supported Algorithms
//! - **pHash (Perceptual Hash)** - DCT-based, most robust, 64-bit only
//! - **dHash (Difference Hash)** - Fast gradient signs, 8/16/32/64 bits
//! - **Color Histogram** - HSV colour distribution, 64-bit only
//! - **Mashed** - Eleven packed image statistics, 64-bit only
//!
//! ## How It Works
//! 1. Decode the file or buffer and flatten alpha against white
//! 2. Reduce it to the pixel matrix the algorithm needs
//! 3. Compute the hash bits
//! 4. Compare hashes using Hamming distance
//!
//! ## Performance Optimizations
//! - Uses `zune-jpeg` for 1.5-2x faster JPEG decoding
//! - Uses `fast_image_resize` for 5-14x faster SIMD-accelerated resizing
//! - Large files are memory-mapped when sequential access is on
//!
//! ## Example
//! ```rust,ignore
//! use phash_engine::core::hasher::{HasherConfig, HashAlgorithmKind};
//!
//! let hasher = HasherConfig::new()
//!     .algorithm(HashAlgorithmKind::Difference)
//!     .build_hasher();
//!
//! let hash = hasher.hash_file(&path, 64)?;
//! ```

mod algorithms;
mod cache;
pub mod config;
pub mod fast_decode;
pub mod fast_resize;
pub mod mmap_decode;
mod prepare;
mod preparer;
pub mod stats;
mod traits;
mod value;

pub use algorithms::{
    aspect_ratio_class, color_histogram_hash, difference_hash, grid_for, mashed_hash,
    perceptual_hash, quantized_histogram, ColorHistogramHasher, ColorQuantization,
    DifferenceHasher, MashedComponents, MashedHasher, MashedInput, PerceptualHasher,
    HISTOGRAM_SIZE, MASHED_SIZE, PHASH_SIZE,
};
pub use cache::{DecodeCache, DecodeCacheStats};
pub use config::{BackendConfig, ColorProfile, Cores, DecodeOptions};
pub use fast_resize::ResizeFilter;
pub use prepare::{GrayMatrix, Hsv, HsvMatrix, PreparedImage, RgbMatrix};
pub use preparer::{BatchResult, FileHashes, ImagePreparer, BUFFER_ORIGIN};
pub use traits::{BitSize, HashAlgorithmKind, HashStrategy, InputShape};
pub use value::HashValue;

use crate::core::comparator;
use crate::error::HashError;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use traits::unsupported_bits;

/// Configuration builder for hashers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HasherConfig {
    /// Algorithm to use
    algorithm: HashAlgorithmKind,
    /// HSV buckets, only read by the colour histogram
    quantization: ColorQuantization,
    /// Decoder resources
    backend: BackendConfig,
}

impl HasherConfig {
    /// Create a new hasher configuration with defaults
    pub fn new() -> Self {
        Self {
            algorithm: HashAlgorithmKind::Perceptual,
            quantization: ColorQuantization::default(),
            backend: BackendConfig::default(),
        }
    }

    /// Set the hash algorithm
    pub fn algorithm(mut self, algorithm: HashAlgorithmKind) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the colour histogram quantization
    pub fn quantization(mut self, quantization: ColorQuantization) -> Self {
        self.quantization = quantization;
        self
    }

    /// Set the decoder backend configuration
    pub fn backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    /// Build just the strategy
    pub fn build(&self) -> Box<dyn HashStrategy> {
        match self.algorithm {
            HashAlgorithmKind::Perceptual => Box::new(PerceptualHasher::new()),
            HashAlgorithmKind::Difference => Box::new(DifferenceHasher::new()),
            HashAlgorithmKind::ColorHistogram => {
                Box::new(ColorHistogramHasher::new(self.quantization))
            }
            HashAlgorithmKind::Mashed => Box::new(MashedHasher::new()),
        }
    }

    /// Build a strategy together with its own image preparer
    pub fn build_hasher(self) -> Hasher {
        let strategy = self.build();
        let preparer = ImagePreparer::new(self.backend.clone());
        Hasher {
            config: self,
            strategy,
            preparer,
        }
    }
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// One algorithm plus the preparer that feeds it
///
/// This is the main entry point: hash files, buffers or decoded images and
/// compare the results.
pub struct Hasher {
    config: HasherConfig,
    strategy: Box<dyn HashStrategy>,
    preparer: ImagePreparer,
}

impl Hasher {
    /// Hasher for `algorithm` with default settings
    pub fn new(algorithm: HashAlgorithmKind) -> Self {
        HasherConfig::new().algorithm(algorithm).build_hasher()
    }

    pub fn kind(&self) -> HashAlgorithmKind {
        self.strategy.kind()
    }

    pub fn strategy(&self) -> &dyn HashStrategy {
        self.strategy.as_ref()
    }

    pub fn preparer(&self) -> &ImagePreparer {
        &self.preparer
    }

    /// Map a raw width onto one this algorithm supports, before any decoding
    fn resolve_bits(&self, bits: u32) -> Result<BitSize, HashError> {
        let supported = self.strategy.supported_bits();
        BitSize::try_from(bits)
            .ok()
            .filter(|b| supported.contains(b))
            .ok_or_else(|| unsupported_bits(self.kind(), bits, supported))
    }

    /// Hash an image file
    pub fn hash_file(&self, path: impl AsRef<Path>, bits: u32) -> Result<HashValue, HashError> {
        let bits = self.resolve_bits(bits)?;
        let image = self.preparer.decode_file(path.as_ref())?;
        self.strategy.hash_prepared(&image, bits)
    }

    /// Hash an image file with per-call decode options
    pub fn hash_file_with(
        &self,
        path: impl AsRef<Path>,
        bits: u32,
        options: &DecodeOptions,
    ) -> Result<HashValue, HashError> {
        let bits = self.resolve_bits(bits)?;
        let image = self.preparer.decode_file_with(path.as_ref(), options)?;
        self.strategy.hash_prepared(&image, bits)
    }

    /// Hash an encoded image held in memory
    pub fn hash_bytes(
        &self,
        bytes: &[u8],
        bits: u32,
        options: &DecodeOptions,
    ) -> Result<HashValue, HashError> {
        let bits = self.resolve_bits(bits)?;
        let image = self.preparer.decode_bytes(bytes, options)?;
        self.strategy.hash_prepared(&image, bits)
    }

    /// Hash an image that is already decoded and prepared
    pub fn hash_image(&self, image: &PreparedImage, bits: u32) -> Result<HashValue, HashError> {
        let bits = self.resolve_bits(bits)?;
        self.strategy.hash_prepared(image, bits)
    }

    /// Hash an `image` crate image directly
    pub fn hash_dynamic(&self, image: &DynamicImage, bits: u32) -> Result<HashValue, HashError> {
        let bits = self.resolve_bits(bits)?;
        self.strategy
            .hash_prepared(&PreparedImage::from_dynamic(image.clone()), bits)
    }

    /// Hash many files in parallel; each path gets its own result
    pub fn hash_files(&self, paths: &[PathBuf], bits: u32) -> Result<Vec<BatchResult>, HashError> {
        let bits = self.resolve_bits(bits)?;
        Ok(self.preparer.hash_files(self.strategy.as_ref(), paths, bits))
    }

    /// Hamming distance between two hashes from this algorithm
    pub fn distance(&self, a: &HashValue, b: &HashValue) -> Result<u32, HashError> {
        self.strategy.distance(a, b)
    }

    /// Replace the decoder backend configuration
    pub fn configure(&mut self, backend: BackendConfig) {
        self.config.backend = backend.clone();
        self.preparer.reconfigure(backend);
    }

    /// Change the colour histogram buckets. Other algorithms reject this.
    pub fn configure_quantization(
        &mut self,
        hue_bins: u32,
        saturation_bins: u32,
        value_bins: u32,
    ) -> Result<(), HashError> {
        if self.kind() != HashAlgorithmKind::ColorHistogram {
            return Err(HashError::validation(format!(
                "quantization only applies to {}, not {}",
                HashAlgorithmKind::ColorHistogram,
                self.kind()
            )));
        }
        self.config.quantization = ColorQuantization::new(hue_bins, saturation_bins, value_bins)?;
        self.strategy = self.config.build();
        Ok(())
    }
}

/// Hamming distance between any two compatible hashes
pub fn distance(a: &HashValue, b: &HashValue) -> Result<u32, HashError> {
    comparator::distance(a, b)
}
