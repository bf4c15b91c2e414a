//! Hash algorithm implementations.

mod color_histogram;
mod difference;
mod mashed;
mod perceptual;

pub use color_histogram::{
    color_histogram_hash, quantized_histogram, ColorHistogramHasher, ColorQuantization,
    HISTOGRAM_SIZE,
};
pub use difference::{difference_hash, grid_for, DifferenceHasher};
pub use mashed::{aspect_ratio_class, mashed_hash, MashedComponents, MashedHasher, MashedInput, MASHED_SIZE};
pub use perceptual::{perceptual_hash, PerceptualHasher, PHASH_SIZE};
