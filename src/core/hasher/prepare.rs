//! Pixel matrices handed to the hash engines.
//!
//! A [`PreparedImage`] is a decoded image with alpha already flattened
//! against white. Engines ask it for a grayscale, RGB or HSV matrix at
//! the exact size they need.

use super::fast_decode::{is_grayscale_color, DecodedImage};
use super::fast_resize::{FastResizer, ResizeFilter};
use crate::error::HashError;
use image::{DynamicImage, GrayImage, ImageBuffer, Luma, LumaA, Rgb, RgbImage, Rgba};

/// Blend one channel over a white background
fn over_white(channel: u8, alpha: u8) -> u8 {
    let a = alpha as u32;
    ((channel as u32 * a + 255 * (255 - a) + 127) / 255) as u8
}

/// Drop the alpha channel, compositing over white; 16-bit data is narrowed to 8-bit
fn flatten_alpha(image: &DynamicImage, is_grayscale: bool) -> DynamicImage {
    let has_alpha = image.color().has_alpha();

    match (is_grayscale, has_alpha) {
        (true, false) => DynamicImage::ImageLuma8(image.to_luma8()),
        (true, true) => {
            let la = image.to_luma_alpha8();
            let flat = ImageBuffer::from_fn(la.width(), la.height(), |x, y| {
                let LumaA([l, a]) = *la.get_pixel(x, y);
                Luma([over_white(l, a)])
            });
            DynamicImage::ImageLuma8(flat)
        }
        (false, false) => DynamicImage::ImageRgb8(image.to_rgb8()),
        (false, true) => {
            let rgba = image.to_rgba8();
            let flat = ImageBuffer::from_fn(rgba.width(), rgba.height(), |x, y| {
                let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
                Rgb([over_white(r, a), over_white(g, a), over_white(b, a)])
            });
            DynamicImage::ImageRgb8(flat)
        }
    }
}

/// A decoded image ready for any engine
#[derive(Debug, Clone)]
pub struct PreparedImage {
    /// Flattened pixels, `ImageLuma8` for grayscale sources and `ImageRgb8` otherwise
    pub image: DynamicImage,
    /// Source was single-channel, detected before any colour conversion
    pub is_grayscale: bool,
    /// Dimensions before any resize
    pub original_width: u32,
    pub original_height: u32,
}

impl PreparedImage {
    /// Wrap an already-decoded image, detecting grayscale from its colour type
    pub fn from_dynamic(image: DynamicImage) -> Self {
        let is_grayscale = is_grayscale_color(image.color());
        Self::build(&image, is_grayscale)
    }

    pub(crate) fn from_decoded(decoded: DecodedImage) -> Self {
        Self::build(&decoded.image, decoded.is_grayscale)
    }

    fn build(image: &DynamicImage, is_grayscale: bool) -> Self {
        Self {
            original_width: image.width(),
            original_height: image.height(),
            image: flatten_alpha(image, is_grayscale),
            is_grayscale,
        }
    }

    /// Approximate decoded size, used for cache accounting
    pub fn byte_size(&self) -> usize {
        self.image.as_bytes().len()
    }

    /// Luminance matrix of exactly `width` x `height`
    pub fn gray_matrix(
        &self,
        width: u32,
        height: u32,
        filter: ResizeFilter,
    ) -> Result<GrayMatrix, HashError> {
        let gray = match &self.image {
            DynamicImage::ImageLuma8(gray) => gray.clone(),
            other => other.to_luma8(),
        };
        if gray.dimensions() == (width, height) {
            return Ok(GrayMatrix::new(gray));
        }
        let resized = FastResizer::new().resize_gray(&gray, width, height, filter)?;
        Ok(GrayMatrix::new(resized))
    }

    /// RGB matrix at `width` x `height`; grayscale sources are expanded to three equal channels
    pub fn rgb_matrix(&self, width: u32, height: u32) -> Result<RgbMatrix, HashError> {
        let rgb = match &self.image {
            DynamicImage::ImageRgb8(rgb) => rgb.clone(),
            other => other.to_rgb8(),
        };
        if rgb.dimensions() == (width, height) {
            return Ok(RgbMatrix::new(rgb));
        }
        let resized = FastResizer::new().resize_rgb(&rgb, width, height, ResizeFilter::Lanczos3)?;
        Ok(RgbMatrix::new(resized))
    }

    /// HSV matrix at `width` x `height`
    pub fn hsv_matrix(&self, width: u32, height: u32) -> Result<HsvMatrix, HashError> {
        Ok(HsvMatrix::from_rgb(&self.rgb_matrix(width, height)?))
    }
}

fn check_dimensions(
    actual: (u32, u32),
    expected_width: u32,
    expected_height: u32,
) -> Result<(), HashError> {
    if actual == (expected_width, expected_height) {
        Ok(())
    } else {
        Err(HashError::DimensionMismatch {
            expected_width,
            expected_height,
            actual_width: actual.0,
            actual_height: actual.1,
        })
    }
}

/// Row-major single-channel samples (0-255)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayMatrix {
    image: GrayImage,
}

impl GrayMatrix {
    pub fn new(image: GrayImage) -> Self {
        Self { image }
    }

    /// Build from a sample function, mostly for tests and callers with raw data
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> Self {
        Self::new(GrayImage::from_fn(width, height, |x, y| Luma([f(x, y)])))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Sample at column `x`, row `y`
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.image.get_pixel(x, y)[0]
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }

    pub fn ensure_dimensions(&self, width: u32, height: u32) -> Result<(), HashError> {
        check_dimensions(self.image.dimensions(), width, height)
    }
}

/// Row-major three-channel samples (0-255)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbMatrix {
    image: RgbImage,
}

impl RgbMatrix {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 3]) -> Self {
        Self::new(RgbImage::from_fn(width, height, |x, y| Rgb(f(x, y))))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn get(&self, x: u32, y: u32) -> [u8; 3] {
        self.image.get_pixel(x, y).0
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.image
    }

    /// Luminance view of the same pixels
    pub fn to_gray(&self) -> GrayImage {
        DynamicImage::ImageRgb8(self.image.clone()).to_luma8()
    }

    pub fn ensure_dimensions(&self, width: u32, height: u32) -> Result<(), HashError> {
        check_dimensions(self.image.dimensions(), width, height)
    }
}

/// One HSV sample: hue in degrees [0, 360), saturation in [0, 1], value in [0, 255]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub h: f64,
    pub s: f64,
    pub v: f64,
}

impl Hsv {
    pub fn from_rgb([r, g, b]: [u8; 3]) -> Self {
        let (r, g, b) = (r as f64, g as f64, b as f64);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let s = if max > 0.0 { delta / max } else { 0.0 };

        let h = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * ((g - b) / delta).rem_euclid(6.0)
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };

        Self { h, s, v: max }
    }
}

/// Row-major HSV samples
#[derive(Debug, Clone, PartialEq)]
pub struct HsvMatrix {
    width: u32,
    height: u32,
    pixels: Vec<Hsv>,
}

impl HsvMatrix {
    pub fn from_rgb(rgb: &RgbMatrix) -> Self {
        Self {
            width: rgb.width(),
            height: rgb.height(),
            pixels: rgb.as_image().pixels().map(|p| Hsv::from_rgb(p.0)).collect(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Hsv] {
        &self.pixels
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}
