//! Integration tests for the hashing facade.
//!
//! These tests go through real files and buffers:
//! - Lossless re-encodes hash identically
//! - Alpha is flattened against white
//! - Mirrored gradients flip the difference hash
//! - Colour histogram quantization and the grayscale marker
//! - Batches and decode failures

use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat, Luma, Rgb, RgbImage, Rgba};
use phash_engine::core::comparator::{self, find_duplicate_pairs, MatchType, ThresholdStrategy};
use phash_engine::core::hasher::{
    BackendConfig, DecodeOptions, HashAlgorithmKind, HashValue, Hasher, HasherConfig,
};
use phash_engine::HashError;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
    bytes
}

fn save(dir: &Path, name: &str, image: &DynamicImage, format: ImageFormat) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, encode(image, format)).unwrap();
    path
}

fn gradient(side: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_fn(side, side, |x, y| {
        Rgb([(x * 255 / side) as u8, (y * 128 / side) as u8, 80])
    }))
}

fn solid_red() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([255, 0, 0])))
}

#[test]
fn png_and_bmp_copies_hash_identically() {
    let dir = TempDir::new().unwrap();
    let image = gradient(96);
    let png = save(dir.path(), "photo.png", &image, ImageFormat::Png);
    let bmp = save(dir.path(), "photo.bmp", &image, ImageFormat::Bmp);

    for kind in HashAlgorithmKind::ALL {
        let hasher = Hasher::new(kind);
        let a = hasher.hash_file(&png, 64).unwrap();
        let b = hasher.hash_file(&bmp, 64).unwrap();
        assert_eq!(hasher.distance(&a, &b).unwrap(), 0, "{kind}");
    }
}

#[test]
fn netpbm_and_tga_files_hash_like_png() {
    let dir = TempDir::new().unwrap();
    let image = gradient(72);
    let png = save(dir.path(), "photo.png", &image, ImageFormat::Png);
    let ppm = save(dir.path(), "photo.ppm", &image, ImageFormat::Pnm);
    let tga = save(dir.path(), "photo.tga", &image, ImageFormat::Tga);

    let hasher = Hasher::new(HashAlgorithmKind::Difference);
    let expected = hasher.hash_file(&png, 64).unwrap();
    assert_eq!(hasher.hash_file(&ppm, 64).unwrap(), expected);
    assert_eq!(hasher.hash_file(&tga, 64).unwrap(), expected);
}

#[test]
fn prepared_images_and_read_hints_hash_like_files() {
    let dir = TempDir::new().unwrap();
    let image = gradient(90);
    let path = save(dir.path(), "photo.png", &image, ImageFormat::Png);

    for kind in HashAlgorithmKind::ALL {
        let hasher = Hasher::new(kind);
        let from_file = hasher.hash_file(&path, 64).unwrap();
        let prepared = hasher.preparer().decode_file(&path).unwrap();

        assert_eq!(hasher.hash_image(&prepared, 64).unwrap(), from_file, "{kind}");
        assert_eq!(hasher.hash_dynamic(&image, 64).unwrap(), from_file, "{kind}");
        assert_eq!(
            hasher
                .hash_file_with(&path, 64, &DecodeOptions::new().sequential_access(false))
                .unwrap(),
            from_file,
            "{kind}"
        );
    }
}

#[test]
fn solid_red_duplicates_are_exact_matches() {
    let dir = TempDir::new().unwrap();
    let a = save(dir.path(), "a.png", &solid_red(), ImageFormat::Png);
    let b = save(dir.path(), "b.png", &solid_red(), ImageFormat::Png);

    for kind in [
        HashAlgorithmKind::Perceptual,
        HashAlgorithmKind::Difference,
        HashAlgorithmKind::ColorHistogram,
    ] {
        let hasher = Hasher::new(kind);
        let ha = hasher.hash_file(&a, 64).unwrap();
        let hb = hasher.hash_file(&b, 64).unwrap();
        assert_eq!(comparator::distance(&ha, &hb).unwrap(), 0);
        assert_eq!(MatchType::from_distance(0, 64), MatchType::Exact);
    }
}

#[test]
fn mirrored_gradient_flips_the_difference_hash() {
    let image = DynamicImage::ImageLuma8(GrayImage::from_fn(64, 64, |x, _| {
        Luma([(x * 4) as u8])
    }));
    let mirrored = image.fliph();

    let hasher = Hasher::new(HashAlgorithmKind::Difference);
    let a = hasher.hash_dynamic(&image, 64).unwrap();
    let b = hasher.hash_dynamic(&mirrored, 64).unwrap();

    assert!(hasher.distance(&a, &b).unwrap() >= 56);
}

#[test]
fn difference_hash_respects_requested_width() {
    let hasher = Hasher::new(HashAlgorithmKind::Difference);
    for bits in [8u32, 16, 32] {
        let hash = hasher.hash_dynamic(&gradient(64), bits).unwrap();
        assert_eq!(hash.bits(), bits);
        assert!(hash.value() >= 0);
        assert!(hash.as_u64() < 1u64 << bits);
    }
}

#[test]
fn transparent_pixels_hash_like_white() {
    let transparent = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(
        40,
        40,
        Rgba([12, 200, 90, 0]),
    ));
    let white = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 40, Rgb([255, 255, 255])));

    let transparent_png = encode(&transparent, ImageFormat::Png);
    let white_png = encode(&white, ImageFormat::Png);

    for kind in HashAlgorithmKind::ALL {
        let hasher = Hasher::new(kind);
        let a = hasher
            .hash_bytes(&transparent_png, 64, &DecodeOptions::default())
            .unwrap();
        let b = hasher
            .hash_bytes(&white_png, 64, &DecodeOptions::default())
            .unwrap();
        assert_eq!(a, b, "{kind}");
    }
}

#[test]
fn quantization_is_configurable_through_the_facade() {
    let image = DynamicImage::ImageRgb8(ImageBuffer::from_fn(256, 256, |x, _| {
        if x < 128 {
            Rgb([255, 0, 0])
        } else {
            Rgb([255, 128, 0])
        }
    }));
    let bytes = encode(&image, ImageFormat::Png);

    let mut hasher = Hasher::new(HashAlgorithmKind::ColorHistogram);
    let coarse = hasher.hash_bytes(&bytes, 64, &DecodeOptions::new()).unwrap();

    hasher.configure_quantization(16, 8, 8).unwrap();
    let fine = hasher.hash_bytes(&bytes, 64, &DecodeOptions::new()).unwrap();

    assert_eq!(coarse.value(), 1);
    assert_eq!(fine.value(), 3);

    assert!(hasher.configure_quantization(0, 4, 4).is_err());
    assert!(hasher.configure_quantization(361, 4, 4).is_err());
}

#[test]
fn grayscale_files_carry_the_marker() {
    let gray = DynamicImage::ImageLuma8(GrayImage::from_fn(64, 64, |x, y| {
        Luma([((x + y) * 2) as u8])
    }));
    let bytes = encode(&gray, ImageFormat::Png);

    let hasher = Hasher::new(HashAlgorithmKind::ColorHistogram);
    let hash = hasher.hash_bytes(&bytes, 64, &DecodeOptions::new()).unwrap();
    assert_eq!(hash.as_u64() >> 60, 0xF);
    assert!(hash.value() < 0);

    let colour = hasher
        .hash_bytes(&encode(&gradient(64), ImageFormat::Png), 64, &DecodeOptions::new())
        .unwrap();
    assert_ne!(colour.as_u64() >> 60, 0xF);
}

#[test]
fn batch_reports_every_path() {
    let dir = TempDir::new().unwrap();
    let good = save(dir.path(), "good.png", &gradient(32), ImageFormat::Png);
    let corrupt = dir.path().join("corrupt.jpg");
    std::fs::write(&corrupt, b"this is not a valid image file").unwrap();
    let missing = dir.path().join("missing.png");

    let hasher = HasherConfig::new()
        .algorithm(HashAlgorithmKind::Mashed)
        .build_hasher();
    let results = hasher
        .hash_files(&[good.clone(), corrupt.clone(), missing.clone()], 64)
        .unwrap();

    let paths: Vec<_> = results.iter().map(|(p, _)| p.clone()).collect();
    assert_eq!(paths, vec![good, corrupt, missing]);
    assert!(results[0].1.is_ok());
    assert!(matches!(results[1].1, Err(HashError::DecodeError { .. })));
    assert!(matches!(results[2].1, Err(HashError::DecodeError { .. })));
}

#[test]
fn batch_rejects_unsupported_width_up_front() {
    let hasher = Hasher::new(HashAlgorithmKind::Mashed);
    let err = hasher.hash_files(&[PathBuf::from("/nowhere.png")], 16).unwrap_err();
    assert!(matches!(err, HashError::UnsupportedBitSize { bits: 16, .. }));
}

#[test]
fn decode_errors_name_the_source() {
    let hasher = Hasher::new(HashAlgorithmKind::Perceptual);

    let err = hasher.hash_file("/nonexistent/image.png", 64).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/image.png"));

    let dir = TempDir::new().unwrap();
    let err = hasher.hash_file(dir.path(), 64).unwrap_err();
    assert!(err.is_decode_failure());

    let err = hasher
        .hash_bytes(&[], 64, &DecodeOptions::new())
        .unwrap_err();
    assert!(err.to_string().contains("<buffer>"));
}

#[test]
fn backend_changes_never_change_hashes() {
    let bytes = encode(&gradient(80), ImageFormat::Png);
    let mut hasher = Hasher::new(HashAlgorithmKind::Perceptual);
    let before = hasher.hash_bytes(&bytes, 64, &DecodeOptions::new()).unwrap();

    hasher.configure(
        BackendConfig::new()
            .disable_cache(true)
            .sequential_access(false)
            .max_memory(1),
    );
    let after = hasher
        .hash_bytes(&bytes, 64, &DecodeOptions::new().sequential_access(true))
        .unwrap();

    assert_eq!(before, after);
}

#[test]
fn duplicate_pairs_from_real_hashes() {
    let dir = TempDir::new().unwrap();
    let a = save(dir.path(), "a.png", &gradient(64), ImageFormat::Png);
    let b = save(dir.path(), "b.bmp", &gradient(64), ImageFormat::Bmp);
    let c = save(dir.path(), "c.png", &gradient(64).fliph(), ImageFormat::Png);

    let hasher = Hasher::new(HashAlgorithmKind::Difference);
    let hashed: Vec<(PathBuf, HashValue)> = hasher
        .hash_files(&[a.clone(), b.clone(), c], 64)
        .unwrap()
        .into_iter()
        .map(|(path, result)| (path, result.unwrap()))
        .collect();

    let pairs = find_duplicate_pairs(&hashed, &ThresholdStrategy::balanced()).unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].image_a, a);
    assert_eq!(pairs[0].image_b, b);
    assert_eq!(pairs[0].match_type, MatchType::Exact);
}
