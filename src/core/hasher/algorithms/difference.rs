//! Difference Hash (dHash) implementation.
//!
//! dHash works by:
//! 1. Resizing the image to a small grid, one column wider than needed
//! 2. Converting to grayscale
//! 3. Comparing each pixel to the one to its right
//! 4. If left pixel is brighter, set bit to 1, else 0
//!
//! Bits are assigned most significant first and filling stops once
//! `bits` comparisons have been made. The narrow grids for 8, 16 and 32
//! bits hold fewer comparisons than that, so their low bits stay 0.

use crate::core::hasher::fast_resize::ResizeFilter;
use crate::core::hasher::prepare::{GrayMatrix, PreparedImage};
use crate::core::hasher::traits::{BitSize, HashAlgorithmKind, HashStrategy, InputShape};
use crate::core::hasher::value::HashValue;
use crate::error::HashError;

/// Grid size for each hash width
pub fn grid_for(bits: BitSize) -> (u32, u32) {
    match bits {
        BitSize::B64 => (9, 8),
        BitSize::B32 => (8, 4),
        BitSize::B16 => (4, 4),
        BitSize::B8 => (4, 2),
    }
}

/// Compute a dHash from a grayscale matrix sized by [`grid_for`]
pub fn difference_hash(matrix: &GrayMatrix, bits: BitSize) -> Result<HashValue, HashError> {
    let (width, height) = grid_for(bits);
    matrix.ensure_dimensions(width, height)?;

    let total = bits.bits();
    let mut hash = 0u64;
    let mut bit = 0u32;

    'rows: for y in 0..height {
        for x in 0..width - 1 {
            if bit >= total {
                break 'rows;
            }
            // Compare current pixel to the one on its right
            if matrix.get(x, y) > matrix.get(x + 1, y) {
                hash |= 1 << (total - 1 - bit);
            }
            bit += 1;
        }
    }

    HashValue::from_bits(hash, bits, HashAlgorithmKind::Difference.tag())
}

/// Difference Hash (dHash) strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct DifferenceHasher;

impl DifferenceHasher {
    pub fn new() -> Self {
        Self
    }
}

impl HashStrategy for DifferenceHasher {
    fn kind(&self) -> HashAlgorithmKind {
        HashAlgorithmKind::Difference
    }

    fn supported_bits(&self) -> &'static [BitSize] {
        &BitSize::ALL
    }

    fn required_input(&self, bits: BitSize) -> Result<InputShape, HashError> {
        let (width, height) = grid_for(bits);
        Ok(InputShape::Gray { width, height })
    }

    fn hash_prepared(&self, image: &PreparedImage, bits: BitSize) -> Result<HashValue, HashError> {
        let (width, height) = self.required_input(bits)?.dimensions();
        let matrix = image.gray_matrix(width, height, ResizeFilter::Bilinear)?;
        difference_hash(&matrix, bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::comparator::distance;
    use image::{DynamicImage, ImageBuffer, Rgb};

    fn create_solid_image(r: u8, g: u8, b: u8) -> PreparedImage {
        let img = ImageBuffer::from_fn(100, 100, |_, _| Rgb([r, g, b]));
        PreparedImage::from_dynamic(DynamicImage::ImageRgb8(img))
    }

    fn create_left_to_right_gradient() -> PreparedImage {
        // Gradient: left is dark, right is bright (left < right)
        let img = ImageBuffer::from_fn(100, 100, |x, _| {
            let brightness = (x * 255 / 99) as u8;
            Rgb([brightness, brightness, brightness])
        });
        PreparedImage::from_dynamic(DynamicImage::ImageRgb8(img))
    }

    fn create_right_to_left_gradient() -> PreparedImage {
        // Gradient: right is dark, left is bright (left > right)
        let img = ImageBuffer::from_fn(100, 100, |x, _| {
            let brightness = ((99 - x) * 255 / 99) as u8;
            Rgb([brightness, brightness, brightness])
        });
        PreparedImage::from_dynamic(DynamicImage::ImageRgb8(img))
    }

    #[test]
    fn decreasing_rows_set_every_bit() {
        let matrix = GrayMatrix::from_fn(9, 8, |x, _| (200 - x * 20) as u8);
        let hash = difference_hash(&matrix, BitSize::B64).unwrap();

        assert_eq!(hash.value(), -1);
        assert_eq!(hash.to_hex(), "ffffffffffffffff");
    }

    #[test]
    fn increasing_rows_set_no_bit() {
        let matrix = GrayMatrix::from_fn(9, 8, |x, _| (x * 20) as u8);
        assert_eq!(difference_hash(&matrix, BitSize::B64).unwrap().value(), 0);
    }

    #[test]
    fn narrow_grid_fills_from_the_top() {
        // 4x2 grid gives 6 comparisons; the two low bits stay clear
        let matrix = GrayMatrix::from_fn(4, 2, |x, _| (90 - x * 30) as u8);
        let hash = difference_hash(&matrix, BitSize::B8).unwrap();
        assert_eq!(hash.value(), 0b1111_1100);
    }

    #[test]
    fn first_comparison_is_most_significant() {
        let matrix = GrayMatrix::from_fn(9, 8, |x, y| if x == 0 && y == 0 { 255 } else { 0 });
        let hash = difference_hash(&matrix, BitSize::B64).unwrap();
        assert_eq!(hash.as_u64(), 1 << 63);
    }

    #[test]
    fn equal_neighbours_do_not_set_bits() {
        let matrix = GrayMatrix::from_fn(8, 4, |_, _| 128);
        assert_eq!(difference_hash(&matrix, BitSize::B32).unwrap().value(), 0);
    }

    #[test]
    fn wrong_grid_is_rejected() {
        let matrix = GrayMatrix::from_fn(9, 8, |_, _| 0);
        let err = difference_hash(&matrix, BitSize::B32).unwrap_err();
        assert!(matches!(err, HashError::DimensionMismatch { .. }));
    }

    #[test]
    fn identical_images_produce_identical_hash() {
        let hasher = DifferenceHasher::new();
        let image = create_solid_image(128, 128, 128);

        for bits in BitSize::ALL {
            let hash1 = hasher.hash_prepared(&image, bits).unwrap();
            let hash2 = hasher.hash_prepared(&image, bits).unwrap();
            assert_eq!(distance(&hash1, &hash2).unwrap(), 0);
            assert_eq!(hash1.bits(), bits.bits());
        }
    }

    #[test]
    fn mirrored_gradient_flips_most_bits() {
        let hasher = DifferenceHasher::new();
        let forward = hasher
            .hash_prepared(&create_left_to_right_gradient(), BitSize::B64)
            .unwrap();
        let backward = hasher
            .hash_prepared(&create_right_to_left_gradient(), BitSize::B64)
            .unwrap();

        assert!(distance(&forward, &backward).unwrap() >= 56);
    }

    #[test]
    fn required_input_follows_grid_table() {
        let hasher = DifferenceHasher::new();
        assert_eq!(
            hasher.required_input(BitSize::B16).unwrap(),
            InputShape::Gray {
                width: 4,
                height: 4
            }
        );
    }

    #[test]
    fn known_answer_vectors() {
        let pattern = |x: u32, y: u32| ((x * 37 + y * 101 + (x * y) % 13) % 256) as u8;

        let wide = difference_hash(&GrayMatrix::from_fn(9, 8, pattern), BitSize::B64).unwrap();
        assert_eq!(wide.to_hex(), "0208400420820840");

        let narrow = difference_hash(&GrayMatrix::from_fn(4, 4, pattern), BitSize::B16).unwrap();
        assert_eq!(narrow.to_hex(), "0100");
    }
}
