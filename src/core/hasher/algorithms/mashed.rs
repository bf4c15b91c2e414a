//! Mashed Hash implementation.
//!
//! Eleven cheap, mostly independent image statistics packed into fixed
//! bit fields of one 64-bit word:
//!
//! | Bits  | Field                |
//! |-------|----------------------|
//! | 0-3   | colorfulness         |
//! | 4-7   | edge density         |
//! | 8-11  | entropy              |
//! | 12-14 | aspect ratio class   |
//! | 15    | border flag          |
//! | 16-31 | colour distribution  |
//! | 32-39 | spatial layout       |
//! | 40-47 | brightness pattern   |
//! | 48-55 | texture              |
//! | 56-59 | dominant colour tier |
//! | 60-63 | special indicators   |
//!
//! Field positions are part of the stored format. The thresholds below are
//! tuning constants; changing any of them changes what a stored hash means.

use crate::core::hasher::prepare::{PreparedImage, RgbMatrix};
use crate::core::hasher::stats::{
    gray_stats, histogram_entropy, laplacian_response, Gradients, RgbStats,
};
use crate::core::hasher::traits::{
    unsupported_bits, BitSize, HashAlgorithmKind, HashStrategy, InputShape,
};
use crate::core::hasher::value::HashValue;
use crate::error::HashError;
use serde::{Deserialize, Serialize};

/// Working resolution for feature extraction
pub const MASHED_SIZE: u32 = 256;

const SUPPORTED: &[BitSize] = &[BitSize::B64];

const COLORFULNESS_SHIFT: u32 = 0;
const EDGE_DENSITY_SHIFT: u32 = 4;
const ENTROPY_SHIFT: u32 = 8;
const ASPECT_RATIO_SHIFT: u32 = 12;
const BORDER_SHIFT: u32 = 15;
const COLOR_DISTRIBUTION_SHIFT: u32 = 16;
const SPATIAL_LAYOUT_SHIFT: u32 = 32;
const BRIGHTNESS_SHIFT: u32 = 40;
const TEXTURE_SHIFT: u32 = 48;
const DOMINANT_COLORS_SHIFT: u32 = 56;
const SPECIAL_SHIFT: u32 = 60;

const NIBBLE: u64 = 0xF;
const BORDER_RANGE_THRESHOLD: f64 = 30.0;
const DOMINANCE_THRESHOLD: f64 = 50.0;
const HIGH_FREQUENCY_THRESHOLD: f64 = 20.0;
const UNIFORM_RANGE_THRESHOLD: f64 = 45.0;

/// Everything the mashed engine reads
#[derive(Debug, Clone)]
pub struct MashedInput {
    /// Pixels at the working resolution, alpha already flattened
    pub rgb: RgbMatrix,
    /// Size before resizing, for the aspect ratio class
    pub original_width: u32,
    pub original_height: u32,
    /// Source was single-channel before any colour conversion
    pub is_grayscale: bool,
}

/// The eleven unpacked fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MashedComponents {
    pub colorfulness: u8,
    pub edge_density: u8,
    pub entropy: u8,
    pub aspect_ratio: u8,
    pub has_border: bool,
    pub color_distribution: u16,
    pub spatial_layout: u8,
    pub brightness: u8,
    pub texture: u8,
    pub dominant_colors: u8,
    pub special: u8,
}

impl MashedComponents {
    /// Mask each field to its width and place it at its offset
    pub fn pack(&self) -> u64 {
        let mut hash = 0u64;
        hash |= (self.colorfulness as u64 & NIBBLE) << COLORFULNESS_SHIFT;
        hash |= (self.edge_density as u64 & NIBBLE) << EDGE_DENSITY_SHIFT;
        hash |= (self.entropy as u64 & NIBBLE) << ENTROPY_SHIFT;
        hash |= (self.aspect_ratio as u64 & 0x7) << ASPECT_RATIO_SHIFT;
        if self.has_border {
            hash |= 1 << BORDER_SHIFT;
        }
        hash |= (self.color_distribution as u64) << COLOR_DISTRIBUTION_SHIFT;
        hash |= (self.spatial_layout as u64) << SPATIAL_LAYOUT_SHIFT;
        hash |= (self.brightness as u64) << BRIGHTNESS_SHIFT;
        hash |= (self.texture as u64) << TEXTURE_SHIFT;
        hash |= (self.dominant_colors as u64 & NIBBLE) << DOMINANT_COLORS_SHIFT;
        hash |= (self.special as u64 & NIBBLE) << SPECIAL_SHIFT;
        hash
    }

    /// Split a packed word back into its fields
    pub fn unpack(hash: u64) -> Self {
        let nibble = |shift: u32| ((hash >> shift) & NIBBLE) as u8;
        let byte = |shift: u32| ((hash >> shift) & 0xFF) as u8;

        Self {
            colorfulness: nibble(COLORFULNESS_SHIFT),
            edge_density: nibble(EDGE_DENSITY_SHIFT),
            entropy: nibble(ENTROPY_SHIFT),
            aspect_ratio: ((hash >> ASPECT_RATIO_SHIFT) & 0x7) as u8,
            has_border: (hash >> BORDER_SHIFT) & 1 == 1,
            color_distribution: ((hash >> COLOR_DISTRIBUTION_SHIFT) & 0xFFFF) as u16,
            spatial_layout: byte(SPATIAL_LAYOUT_SHIFT),
            brightness: byte(BRIGHTNESS_SHIFT),
            texture: byte(TEXTURE_SHIFT),
            dominant_colors: nibble(DOMINANT_COLORS_SHIFT),
            special: nibble(SPECIAL_SHIFT),
        }
    }

    /// Extract every field from a prepared input
    pub fn extract(input: &MashedInput) -> Result<Self, HashError> {
        if input.original_width == 0 || input.original_height == 0 {
            return Err(HashError::validation(
                "original image dimensions must be non-zero",
            ));
        }

        let rgb = input.rgb.as_image();
        let gray = input.rgb.to_gray();
        let stats = RgbStats::of(rgb);
        let gradients = Gradients::of(&gray);

        Ok(Self {
            colorfulness: colorfulness(&stats, input.is_grayscale),
            edge_density: clamp_nibble(gradients.mean_magnitude / 3.2),
            entropy: clamp_nibble(histogram_entropy(&gray) * 2.0),
            aspect_ratio: aspect_ratio_class(input.original_width, input.original_height),
            has_border: has_border(&input.rgb),
            color_distribution: color_distribution(&stats),
            spatial_layout: spatial_layout(&input.rgb),
            brightness: {
                let luma = gray_stats(&gray);
                let mean = clamp_nibble(luma.mean / 17.0);
                let range = clamp_nibble(luma.range() / 17.0);
                (mean << 4) | range
            },
            texture: {
                let horizontal = clamp_nibble(gradients.mean_horizontal / 3.0);
                let vertical = clamp_nibble(gradients.mean_vertical / 3.0);
                (horizontal << 4) | vertical
            },
            dominant_colors: dominant_color_tier(stats.total_range()),
            special: special_indicators(&stats, laplacian_response(&gray)),
        })
    }
}

/// Truncate toward zero and cap at 15
fn clamp_nibble(value: f64) -> u8 {
    value.clamp(0.0, 15.0) as u8
}

/// 0 for grayscale sources, 1 for effectively neutral colour, 4-15 otherwise
fn colorfulness(stats: &RgbStats, is_grayscale: bool) -> u8 {
    if is_grayscale {
        return 0;
    }

    let [r, g, b] = stats.means();
    let mean_diff = (r - g).abs() + (g - b).abs() + (r - b).abs();
    let total_range = stats.total_range();

    if mean_diff < 5.0 && total_range < 30.0 {
        return 1;
    }

    let avg_range = total_range / 3.0;
    4 + ((avg_range + mean_diff) / 20.0).min(11.0) as u8
}

/// Seven width/height buckets, tallest first
pub fn aspect_ratio_class(width: u32, height: u32) -> u8 {
    let ratio = width as f64 / height as f64;
    match ratio {
        r if r < 0.5 => 0,
        r if r < 0.8 => 1,
        r if r < 1.2 => 2,
        r if r < 1.6 => 3,
        r if r < 2.0 => 4,
        r if r < 2.5 => 5,
        _ => 6,
    }
}

/// All four edge strips are close to a single flat colour
fn has_border(rgb: &RgbMatrix) -> bool {
    let (width, height) = (rgb.width(), rgb.height());
    let size = (width as f64 * 0.05).min(height as f64 * 0.05).min(20.0) as u32;
    if size == 0 {
        return false;
    }

    let image = rgb.as_image();
    let strips = [
        RgbStats::of_region(image, 0, 0, width, size),
        RgbStats::of_region(image, 0, height - size, width, size),
        RgbStats::of_region(image, 0, 0, size, height),
        RgbStats::of_region(image, width - size, 0, size, height),
    ];

    strips
        .iter()
        .all(|strip| strip.overall_range() < BORDER_RANGE_THRESHOLD)
}

/// 5 bits per channel mean (R low, then G, then B) plus a dominance flag in bit 15
fn color_distribution(stats: &RgbStats) -> u16 {
    let [r, g, b] = stats.means();
    let quantize = |mean: f64| ((mean / 8.0).min(31.0) as u16) & 0x1F;

    let mut distribution = quantize(r) | (quantize(g) << 5) | (quantize(b) << 10);

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    if max - min > DOMINANCE_THRESHOLD {
        distribution |= 1 << 15;
    }
    distribution
}

/// Two bits per quadrant (TL, TR, BL, BR): 1 red, 2 green, 3 blue, 0 no strict winner
fn spatial_layout(rgb: &RgbMatrix) -> u8 {
    let half_w = rgb.width() / 2;
    let half_h = rgb.height() / 2;
    let image = rgb.as_image();

    let quadrants = [(0, 0), (half_w, 0), (0, half_h), (half_w, half_h)];

    quadrants
        .iter()
        .enumerate()
        .fold(0u8, |layout, (i, &(x, y))| {
            let [r, g, b] = RgbStats::of_region(image, x, y, half_w, half_h).means();
            let dominance = if r > g && r > b {
                1
            } else if g > r && g > b {
                2
            } else if b > r && b > g {
                3
            } else {
                0
            };
            layout | (dominance << (i * 2))
        })
}

/// Coarse proxy for the number of distinct colours, from the summed channel ranges
fn dominant_color_tier(total_range: f64) -> u8 {
    match total_range {
        r if r < 90.0 => 1,
        r if r < 180.0 => 2,
        r if r < 270.0 => 4,
        r if r < 360.0 => 6,
        r if r < 450.0 => 8,
        _ => 12,
    }
}

/// bit 0: strong high-frequency content; bit 1: large uniform regions
fn special_indicators(stats: &RgbStats, laplacian: f64) -> u8 {
    let mut indicators = 0;
    if laplacian > HIGH_FREQUENCY_THRESHOLD {
        indicators |= 1;
    }
    if stats.total_range() / 3.0 < UNIFORM_RANGE_THRESHOLD {
        indicators |= 2;
    }
    indicators
}

/// Compute the mashed hash of a prepared input
pub fn mashed_hash(input: &MashedInput) -> Result<HashValue, HashError> {
    input.rgb.ensure_dimensions(MASHED_SIZE, MASHED_SIZE)?;
    let components = MashedComponents::extract(input)?;
    HashValue::from_bits(components.pack(), BitSize::B64, HashAlgorithmKind::Mashed.tag())
}

/// Mashed hash strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct MashedHasher;

impl MashedHasher {
    pub fn new() -> Self {
        Self
    }
}

impl HashStrategy for MashedHasher {
    fn kind(&self) -> HashAlgorithmKind {
        HashAlgorithmKind::Mashed
    }

    fn supported_bits(&self) -> &'static [BitSize] {
        SUPPORTED
    }

    fn required_input(&self, bits: BitSize) -> Result<InputShape, HashError> {
        if bits != BitSize::B64 {
            return Err(unsupported_bits(self.kind(), bits.bits(), SUPPORTED));
        }
        Ok(InputShape::Color {
            width: MASHED_SIZE,
            height: MASHED_SIZE,
        })
    }

    fn hash_prepared(&self, image: &PreparedImage, bits: BitSize) -> Result<HashValue, HashError> {
        let (width, height) = self.required_input(bits)?.dimensions();
        let input = MashedInput {
            rgb: image.rgb_matrix(width, height)?,
            original_width: image.original_width,
            original_height: image.original_height,
            is_grayscale: image.is_grayscale,
        };
        mashed_hash(&input)
    }
}
