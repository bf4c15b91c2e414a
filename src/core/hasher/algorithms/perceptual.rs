//! Perceptual Hash (pHash) implementation.
//!
//! pHash uses the Discrete Cosine Transform (DCT) to capture
//! the frequency domain representation of an image:
//! 1. Reduce the image to a 32x32 grayscale matrix
//! 2. Apply an 11-coefficient DCT to every row
//! 3. Apply the DCT again down each column, keeping fewer coefficients
//!    as the column index grows (a triangular low-frequency block)
//! 4. Walk the triangle in zig-zag order, skip the DC term, and set one
//!    bit per coefficient that exceeds the mean of the 64 kept
//!
//! Thresholding against the mean rather than zero makes the hash stable
//! under uniform brightness and contrast shifts.

use crate::core::hasher::fast_resize::ResizeFilter;
use crate::core::hasher::prepare::{GrayMatrix, PreparedImage};
use crate::core::hasher::traits::{
    unsupported_bits, BitSize, HashAlgorithmKind, HashStrategy, InputShape,
};
use crate::core::hasher::value::HashValue;
use crate::error::HashError;
use std::f64::consts::PI;
use std::sync::OnceLock;

/// Side of the square input matrix
pub const PHASH_SIZE: u32 = 32;

/// Side of the retained coefficient triangle
const COEFFICIENTS: usize = 11;

const SAMPLES: usize = PHASH_SIZE as usize;

/// 1/sqrt(N/2) for N = 32
const NORMALIZATION: f64 = 0.25;

const DC_SCALE: f64 = 0.70710678118655;

/// Coefficients kept after dropping the DC term
const HASH_BITS: usize = 64;

const SUPPORTED: &[BitSize] = &[BitSize::B64];

/// `table[i][j] = cos(pi * i * (2j + 1) / 64)`, rounded to 8 decimals so
/// every platform multiplies by the same constants.
fn dct_table() -> &'static [[f64; SAMPLES]; COEFFICIENTS] {
    static TABLE: OnceLock<[[f64; SAMPLES]; COEFFICIENTS]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [[0.0; SAMPLES]; COEFFICIENTS];
        for (i, row) in table.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                let angle = PI * (i * (2 * j + 1)) as f64 / (2 * SAMPLES) as f64;
                *cell = (angle.cos() * 1e8).round() / 1e8;
            }
        }
        table
    })
}

/// First `keep` DCT-II coefficients of a 32-sample vector
fn dct_1d(samples: &[f64; SAMPLES], keep: usize) -> Vec<f64> {
    dct_table()
        .iter()
        .take(keep)
        .enumerate()
        .map(|(i, basis)| {
            let sum: f64 = samples.iter().zip(basis).map(|(s, b)| s * b).sum();
            let scaled = sum * NORMALIZATION;
            if i == 0 {
                scaled * DC_SCALE
            } else {
                scaled
            }
        })
        .collect()
}

/// Separable DCT. `result[x][y]` is coefficient `y` of transformed column `x`,
/// and column `x` keeps `11 - x` coefficients.
fn triangular_dct(matrix: &GrayMatrix) -> Vec<Vec<f64>> {
    let rows: Vec<Vec<f64>> = (0..PHASH_SIZE)
        .map(|y| {
            let mut samples = [0.0; SAMPLES];
            for (x, sample) in samples.iter_mut().enumerate() {
                *sample = matrix.get(x as u32, y) as f64;
            }
            dct_1d(&samples, COEFFICIENTS)
        })
        .collect();

    (0..COEFFICIENTS)
        .map(|x| {
            let mut column = [0.0; SAMPLES];
            for (y, sample) in column.iter_mut().enumerate() {
                *sample = rows[y][x];
            }
            dct_1d(&column, COEFFICIENTS - x)
        })
        .collect()
}

/// Anti-diagonal walk over the triangle, alternating direction per diagonal.
///
/// The triangle holds exactly `ceil(n^2 / 2 + n / 2)` cells, so the walk
/// stops once every diagonal `x + y <= n - 1` has been visited.
fn zigzag(matrix: &[Vec<f64>]) -> Vec<f64> {
    let size = matrix.len();
    let max = ((size * size) as f64 / 2.0 + size as f64 * 0.5).ceil() as usize;
    let mut result = Vec::with_capacity(max);

    for t in 0..size {
        for i in (0..=t).rev() {
            if result.len() >= max {
                return result;
            }
            let value = if t % 2 == 0 {
                matrix[i][t - i]
            } else {
                matrix[t - i][i]
            };
            result.push(value);
        }
    }

    result
}

/// Compute the 64-bit pHash of a 32x32 grayscale matrix
pub fn perceptual_hash(matrix: &GrayMatrix) -> Result<HashValue, HashError> {
    matrix.ensure_dimensions(PHASH_SIZE, PHASH_SIZE)?;

    let coefficients = zigzag(&triangular_dct(matrix));
    let kept: Vec<f64> = coefficients.iter().skip(1).take(HASH_BITS).copied().collect();
    let mean = kept.iter().sum::<f64>() / kept.len() as f64;

    let mut hash = 0u64;
    for (i, &coefficient) in kept.iter().enumerate() {
        if coefficient > mean {
            hash |= 1 << (HASH_BITS - 1 - i);
        }
    }

    HashValue::from_bits(hash, BitSize::B64, HashAlgorithmKind::Perceptual.tag())
}

/// Perceptual Hash (pHash) strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct PerceptualHasher;

impl PerceptualHasher {
    pub fn new() -> Self {
        Self
    }
}

impl HashStrategy for PerceptualHasher {
    fn kind(&self) -> HashAlgorithmKind {
        HashAlgorithmKind::Perceptual
    }

    fn supported_bits(&self) -> &'static [BitSize] {
        SUPPORTED
    }

    fn required_input(&self, bits: BitSize) -> Result<InputShape, HashError> {
        if bits != BitSize::B64 {
            return Err(unsupported_bits(self.kind(), bits.bits(), SUPPORTED));
        }
        Ok(InputShape::Gray {
            width: PHASH_SIZE,
            height: PHASH_SIZE,
        })
    }

    fn hash_prepared(&self, image: &PreparedImage, bits: BitSize) -> Result<HashValue, HashError> {
        let (width, height) = self.required_input(bits)?.dimensions();
        let matrix = image.gray_matrix(width, height, ResizeFilter::Lanczos3)?;
        perceptual_hash(&matrix)
    }
}
