//! Image statistics used by the feature-based engines.
//!
//! Gradients and histograms come from `imageproc`; the Laplacian response is
//! computed directly because only its mean magnitude is needed.

use image::{GrayImage, RgbImage};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

/// Mean, minimum and maximum of one channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelStats {
    pub mean: f64,
    pub min: u8,
    pub max: u8,
}

impl ChannelStats {
    /// max - min
    pub fn range(&self) -> f64 {
        (self.max - self.min) as f64
    }
}

/// Statistics for the R, G and B channels of a region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RgbStats {
    pub channels: [ChannelStats; 3],
}

impl RgbStats {
    /// Statistics over the whole image
    pub fn of(image: &RgbImage) -> Self {
        Self::of_region(image, 0, 0, image.width(), image.height())
    }

    /// Statistics over the rectangle at (`x`, `y`) with the given size, clipped to the image
    pub fn of_region(image: &RgbImage, x: u32, y: u32, width: u32, height: u32) -> Self {
        let x_end = x.saturating_add(width).min(image.width());
        let y_end = y.saturating_add(height).min(image.height());

        let mut sums = [0u64; 3];
        let mut mins = [u8::MAX; 3];
        let mut maxs = [u8::MIN; 3];
        let mut count = 0u64;

        for py in y..y_end {
            for px in x..x_end {
                let pixel = image.get_pixel(px, py);
                for c in 0..3 {
                    let v = pixel[c];
                    sums[c] += v as u64;
                    mins[c] = mins[c].min(v);
                    maxs[c] = maxs[c].max(v);
                }
                count += 1;
            }
        }

        if count == 0 {
            let empty = ChannelStats {
                mean: 0.0,
                min: 0,
                max: 0,
            };
            return Self {
                channels: [empty; 3],
            };
        }

        let channel = |c: usize| ChannelStats {
            mean: sums[c] as f64 / count as f64,
            min: mins[c],
            max: maxs[c],
        };

        Self {
            channels: [channel(0), channel(1), channel(2)],
        }
    }

    pub fn means(&self) -> [f64; 3] {
        [self.channels[0].mean, self.channels[1].mean, self.channels[2].mean]
    }

    /// Sum of the three channel ranges
    pub fn total_range(&self) -> f64 {
        self.channels.iter().map(ChannelStats::range).sum()
    }

    /// Largest value in any band minus smallest value in any band
    pub fn overall_range(&self) -> f64 {
        let max = self.channels.iter().map(|c| c.max).max().unwrap_or(0);
        let min = self.channels.iter().map(|c| c.min).min().unwrap_or(0);
        (max - min) as f64
    }
}

/// Mean, minimum and maximum of a grayscale image
pub fn gray_stats(image: &GrayImage) -> ChannelStats {
    let (mut sum, mut min, mut max) = (0u64, u8::MAX, u8::MIN);
    for pixel in image.pixels() {
        let v = pixel[0];
        sum += v as u64;
        min = min.min(v);
        max = max.max(v);
    }

    let count = image.width() as u64 * image.height() as u64;
    if count == 0 {
        return ChannelStats {
            mean: 0.0,
            min: 0,
            max: 0,
        };
    }

    ChannelStats {
        mean: sum as f64 / count as f64,
        min,
        max,
    }
}

/// Shannon entropy (base 2) of the 256-bin intensity histogram
pub fn histogram_entropy(image: &GrayImage) -> f64 {
    let histogram = imageproc::stats::histogram(image);
    let counts = &histogram.channels[0];
    let total: u64 = counts.iter().map(|&c| c as u64).sum();
    if total == 0 {
        return 0.0;
    }

    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}

/// Mean Sobel responses, normalised to the 0-255 sample range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gradients {
    /// Mean of sqrt(gx^2 + gy^2)
    pub mean_magnitude: f64,
    /// Mean of |gx|
    pub mean_horizontal: f64,
    /// Mean of |gy|
    pub mean_vertical: f64,
}

impl Gradients {
    // A 3x3 Sobel kernel has total positive weight 4
    const SCALE: f64 = 4.0;

    pub fn of(image: &GrayImage) -> Self {
        let gx = horizontal_sobel(image);
        let gy = vertical_sobel(image);

        let count = image.width() as f64 * image.height() as f64;
        if count == 0.0 {
            return Self {
                mean_magnitude: 0.0,
                mean_horizontal: 0.0,
                mean_vertical: 0.0,
            };
        }

        let (mut magnitude, mut horizontal, mut vertical) = (0.0, 0.0, 0.0);
        for (dx, dy) in gx.pixels().zip(gy.pixels()) {
            let (dx, dy) = (dx[0] as f64, dy[0] as f64);
            magnitude += (dx * dx + dy * dy).sqrt();
            horizontal += dx.abs();
            vertical += dy.abs();
        }

        Self {
            mean_magnitude: magnitude / count / Self::SCALE,
            mean_horizontal: horizontal / count / Self::SCALE,
            mean_vertical: vertical / count / Self::SCALE,
        }
    }
}

/// Mean absolute 8-neighbour Laplacian response over interior pixels
pub fn laplacian_response(image: &GrayImage) -> f64 {
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return 0.0;
    }

    let at = |x: u32, y: u32| image.get_pixel(x, y)[0] as i32;
    let mut total = 0u64;

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut neighbours = 0;
            for dy in 0..3 {
                for dx in 0..3 {
                    if dx != 1 || dy != 1 {
                        neighbours += at(x + dx - 1, y + dy - 1);
                    }
                }
            }
            total += (8 * at(x, y) - neighbours).unsigned_abs() as u64;
        }
    }

    total as f64 / ((width - 2) as f64 * (height - 2) as f64)
}
