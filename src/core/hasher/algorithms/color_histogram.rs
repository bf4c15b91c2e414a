//! Color Histogram Hash implementation.
//!
//! Captures the global colour distribution of an image and ignores layout:
//! 1. Convert to HSV at a 256x256 working resolution
//! 2. Quantize H, S and V into `hue_bins x saturation_bins x value_bins` buckets
//! 3. Normalise the histogram by pixel count
//! 4. Encode it into 64 bits
//!
//! Grayscale sources carry the marker `1111` in bits 60-63 followed by one
//! bit per brightness level. Colour sources never set that marker; their 64
//! bits are four 16-bit blocks (low hues, mid hues, high hues, low
//! saturation), each holding the ranked bins of that region.

use crate::core::hasher::prepare::{HsvMatrix, PreparedImage};
use crate::core::hasher::traits::{
    unsupported_bits, BitSize, HashAlgorithmKind, HashStrategy, InputShape,
};
use crate::core::hasher::value::HashValue;
use crate::error::HashError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Working resolution for the histogram
pub const HISTOGRAM_SIZE: u32 = 256;

const SUPPORTED: &[BitSize] = &[BitSize::B64];

const GRAYSCALE_MARKER: u64 = 0xF << 60;

const BITS_PER_REGION: usize = 16;

/// HSV bucket counts. Hashes computed with different quantizations are not comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorQuantization {
    pub hue_bins: u32,
    pub saturation_bins: u32,
    pub value_bins: u32,
}

impl Default for ColorQuantization {
    fn default() -> Self {
        Self {
            hue_bins: 8,
            saturation_bins: 4,
            value_bins: 4,
        }
    }
}

impl ColorQuantization {
    /// Largest bucket count accepted per channel
    pub const MAX_BINS: u32 = 360;

    pub fn new(hue_bins: u32, saturation_bins: u32, value_bins: u32) -> Result<Self, HashError> {
        for (name, bins) in [
            ("hue", hue_bins),
            ("saturation", saturation_bins),
            ("value", value_bins),
        ] {
            if bins == 0 || bins > Self::MAX_BINS {
                return Err(HashError::validation(format!(
                    "{name} bins must be between 1 and {}, got {bins}",
                    Self::MAX_BINS
                )));
            }
        }

        Ok(Self {
            hue_bins,
            saturation_bins,
            value_bins,
        })
    }

    pub fn total_bins(&self) -> usize {
        (self.hue_bins * self.saturation_bins * self.value_bins) as usize
    }

    fn bin_index(&self, h: f64, s: f64, v: f64) -> usize {
        let (hb, sb, vb) = (self.hue_bins, self.saturation_bins, self.value_bins);
        let h_bin = ((h / 360.0 * hb as f64) as u32).min(hb - 1);
        let s_bin = ((s * sb as f64) as u32).min(sb - 1);
        let v_bin = ((v / 255.0 * vb as f64) as u32).min(vb - 1);
        (h_bin * sb * vb + s_bin * vb + v_bin) as usize
    }
}

/// Normalised histogram, `hue_bins * saturation_bins * value_bins` entries summing to 1
pub fn quantized_histogram(hsv: &HsvMatrix, quantization: &ColorQuantization) -> Vec<f64> {
    let mut histogram = vec![0.0; quantization.total_bins()];
    for pixel in hsv.pixels() {
        histogram[quantization.bin_index(pixel.h, pixel.s, pixel.v)] += 1.0;
    }

    let total = hsv.pixels().len() as f64;
    if total > 0.0 {
        for bin in &mut histogram {
            *bin /= total;
        }
    }
    histogram
}

fn encode_grayscale(histogram: &[f64], quantization: &ColorQuantization) -> u64 {
    let value_bins = quantization.value_bins as usize;
    let threshold = 1.0 / value_bins as f64 * 0.5;
    let mut hash = GRAYSCALE_MARKER;

    for (v, bit) in (0..value_bins).zip(4..64) {
        let mass: f64 = histogram
            .iter()
            .enumerate()
            .filter(|(i, _)| i % value_bins == v)
            .map(|(_, f)| f)
            .sum();
        if mass > threshold {
            hash |= 1 << bit;
        }
    }

    hash
}

fn encode_color(histogram: &[f64], quantization: &ColorQuantization) -> u64 {
    let mean = histogram.iter().sum::<f64>() / histogram.len() as f64;
    let (hb, sb, vb) = (
        quantization.hue_bins as usize,
        quantization.saturation_bins as usize,
        quantization.value_bins as usize,
    );

    // low hues, mid hues, high hues, low saturation
    let mut regions: [Vec<f64>; 4] = Default::default();
    for (i, &frequency) in histogram.iter().enumerate() {
        let h_bin = (i / (sb * vb)) as f64;
        let s_bin = ((i % (sb * vb)) / vb) as f64;

        let hue_region = if h_bin < hb as f64 / 3.0 {
            0
        } else if h_bin < 2.0 * hb as f64 / 3.0 {
            1
        } else {
            2
        };
        regions[hue_region].push(frequency);

        if s_bin < sb as f64 / 2.0 {
            regions[3].push(frequency);
        }
    }

    let mut hash = 0u64;
    for (r, region) in regions.iter_mut().enumerate() {
        region.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
        for (rank, &frequency) in region.iter().take(BITS_PER_REGION).enumerate() {
            if frequency > mean * 0.5 {
                hash |= 1 << (r * BITS_PER_REGION + rank);
            }
        }
    }

    hash & !GRAYSCALE_MARKER
}

/// Compute the 64-bit colour histogram hash of an HSV matrix
pub fn color_histogram_hash(
    hsv: &HsvMatrix,
    is_grayscale: bool,
    quantization: &ColorQuantization,
) -> Result<HashValue, HashError> {
    if hsv.is_empty() {
        return Err(HashError::DimensionMismatch {
            expected_width: HISTOGRAM_SIZE,
            expected_height: HISTOGRAM_SIZE,
            actual_width: hsv.width(),
            actual_height: hsv.height(),
        });
    }

    let histogram = quantized_histogram(hsv, quantization);
    let hash = if is_grayscale {
        encode_grayscale(&histogram, quantization)
    } else {
        encode_color(&histogram, quantization)
    };

    HashValue::from_bits(hash, BitSize::B64, HashAlgorithmKind::ColorHistogram.tag())
}

/// Color histogram strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorHistogramHasher {
    quantization: ColorQuantization,
}

impl ColorHistogramHasher {
    pub fn new(quantization: ColorQuantization) -> Self {
        Self { quantization }
    }

    /// Change the HSV bucket counts for subsequent hashes
    pub fn configure_quantization(
        &mut self,
        hue_bins: u32,
        saturation_bins: u32,
        value_bins: u32,
    ) -> Result<(), HashError> {
        self.quantization = ColorQuantization::new(hue_bins, saturation_bins, value_bins)?;
        Ok(())
    }
}

impl HashStrategy for ColorHistogramHasher {
    fn kind(&self) -> HashAlgorithmKind {
        HashAlgorithmKind::ColorHistogram
    }

    fn supported_bits(&self) -> &'static [BitSize] {
        SUPPORTED
    }

    fn required_input(&self, bits: BitSize) -> Result<InputShape, HashError> {
        if bits != BitSize::B64 {
            return Err(unsupported_bits(self.kind(), bits.bits(), SUPPORTED));
        }
        Ok(InputShape::Color {
            width: HISTOGRAM_SIZE,
            height: HISTOGRAM_SIZE,
        })
    }

    fn hash_prepared(&self, image: &PreparedImage, bits: BitSize) -> Result<HashValue, HashError> {
        let (width, height) = self.required_input(bits)?.dimensions();
        let hsv = image.hsv_matrix(width, height)?;
        color_histogram_hash(&hsv, image.is_grayscale, &self.quantization)
    }
}
