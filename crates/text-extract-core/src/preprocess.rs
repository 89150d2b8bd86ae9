//! Image preprocessing: upscale, normalize, grayscale, sharpen, blur, binarize
//!
//! Every step returns a new buffer. The final binarized image is wrapped in
//! [`PreprocessedImage`], which is the only input the segmenter accepts.

use crate::image_io::{load_image, upscale};
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::contrast::otsu_level;
use imageproc::filter::{filter3x3, separable_filter_equal};
use imageproc::map::map_colors;
use std::path::Path;
use text_extract_common::{ProcessingError, Result};
use tracing::debug;

/// Sharpening kernel: center 9, neighbors -1
const SHARPEN_KERNEL: [i32; 9] = [-1, -1, -1, -1, 9, -1, -1, -1, -1];

/// Fixed 7-tap binomial Gaussian `[2, 7, 14, 18, 14, 7, 2] / 64`, the table
/// used for a 7x7 kernel when no sigma is given; applied in both directions
const GAUSSIAN_KERNEL_7: [f32; 7] = [
    0.031_25, 0.109_375, 0.218_75, 0.281_25, 0.218_75, 0.109_375, 0.031_25,
];

/// Single-channel image whose pixels are all 0 or 255
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessedImage(GrayImage);

impl PreprocessedImage {
    /// Wrap an image that is already binarized
    #[must_use]
    pub fn from_binarized(image: GrayImage) -> Self {
        Self(image)
    }

    #[must_use]
    pub fn as_image(&self) -> &GrayImage {
        &self.0
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    #[must_use]
    pub fn into_inner(self) -> GrayImage {
        self.0
    }
}

/// Run the full preprocessing chain on the image at `path`
///
/// The upscaled temporary copy is removed before this returns, whether or
/// not the later steps succeed.
pub fn preprocess<P: AsRef<Path>>(path: P) -> Result<PreprocessedImage> {
    let path = path.as_ref();
    let upscaled = upscale(path)?;
    let raw = load_image(&upscaled)?;
    drop(upscaled);

    let preprocessed = preprocess_image(&raw)?;
    let (width, height) = preprocessed.dimensions();
    debug!("Preprocessed {} into {}x{} binary image", path.display(), width, height);
    Ok(preprocessed)
}

/// Steps after loading: normalize, grayscale, sharpen, blur, binarize
pub fn preprocess_image(raw: &RgbImage) -> Result<PreprocessedImage> {
    let (width, height) = raw.dimensions();
    if width == 0 || height == 0 {
        return Err(ProcessingError::Preprocessing(
            "Cannot preprocess an empty image".to_string(),
        ));
    }

    let normalized = normalize_min_max(raw);
    let gray = to_grayscale(&normalized);
    let sharpened = sharpen(&gray);
    let blurred = gaussian_blur_7x7(&sharpened);
    Ok(PreprocessedImage(binarize_otsu(&blurred)))
}

/// Stretch intensities so the global minimum maps to 0 and the maximum to 255
///
/// Minimum and maximum are taken across all channels. A constant image has no
/// range to stretch and maps to all zeros.
#[must_use]
pub fn normalize_min_max(image: &RgbImage) -> RgbImage {
    let raw = image.as_raw();
    let min = raw.iter().copied().min().unwrap_or(0);
    let max = raw.iter().copied().max().unwrap_or(0);

    let range = f32::from(max) - f32::from(min);
    let scale = if range > f32::EPSILON { 255.0 / range } else { 0.0 };
    let shift = -f32::from(min) * scale;

    let data = raw
        .iter()
        .map(|&v| (f32::from(v) * scale + shift).round().clamp(0.0, 255.0) as u8)
        .collect();

    let (width, height) = image.dimensions();
    // Same length as the source buffer, so from_raw cannot fail
    RgbImage::from_raw(width, height, data).unwrap_or_else(|| RgbImage::new(width, height))
}

/// Rec.601 luma in 14-bit fixed point (0.299, 0.587, 0.114)
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;
const LUMA_SHIFT: u32 = 14;

/// Rec.601 luma, rounded; weights sum to `1 << LUMA_SHIFT` so white stays 255
#[must_use]
pub fn to_grayscale(image: &RgbImage) -> GrayImage {
    map_colors(image, |Rgb([r, g, b])| {
        let luma = u32::from(r) * LUMA_R + u32::from(g) * LUMA_G + u32::from(b) * LUMA_B;
        Luma([((luma + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT) as u8])
    })
}

/// 3x3 sharpen with saturation to `[0, 255]`
#[must_use]
pub fn sharpen(image: &GrayImage) -> GrayImage {
    filter3x3(image, &SHARPEN_KERNEL)
}

#[must_use]
pub fn gaussian_blur_7x7(image: &GrayImage) -> GrayImage {
    separable_filter_equal(image, &GAUSSIAN_KERNEL_7)
}

/// Binary threshold at Otsu's level: above the level becomes 255, the rest 0
#[must_use]
pub fn binarize_otsu(image: &GrayImage) -> GrayImage {
    let level = otsu_level(image);
    debug!("Otsu level {}", level);
    map_colors(image, |Luma([v])| {
        if v > level {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_stretches_range() {
        let mut img = RgbImage::from_pixel(4, 4, Rgb([50, 50, 50]));
        img.put_pixel(0, 0, Rgb([101, 76, 60]));

        let normalized = normalize_min_max(&img);

        assert_eq!(normalized.get_pixel(1, 1), &Rgb([0, 0, 0]));
        // range 51 gives an exact scale of 5
        assert_eq!(normalized.get_pixel(0, 0), &Rgb([255, 130, 50]));
    }

    #[test]
    fn test_normalize_constant_image_is_zero() {
        let img = RgbImage::from_pixel(3, 3, Rgb([255, 255, 255]));
        let normalized = normalize_min_max(&img);
        assert!(normalized.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_grayscale_uses_rec601_weights() {
        let img = RgbImage::from_fn(4, 1, |x, _| match x {
            0 => Rgb([255, 0, 0]),
            1 => Rgb([0, 255, 0]),
            2 => Rgb([0, 0, 255]),
            _ => Rgb([255, 255, 255]),
        });

        let gray = to_grayscale(&img);

        assert_eq!(gray.get_pixel(0, 0), &Luma([76]));
        assert_eq!(gray.get_pixel(1, 0), &Luma([150]));
        assert_eq!(gray.get_pixel(2, 0), &Luma([29]));
        assert_eq!(gray.get_pixel(3, 0), &Luma([255]));
    }

    #[test]
    fn test_sharpen_saturates() {
        let mut img = GrayImage::from_pixel(5, 5, Luma([100]));
        img.put_pixel(2, 2, Luma([200]));

        let sharpened = sharpen(&img);

        // 9*200 - 8*100 = 1000, clamped
        assert_eq!(sharpened.get_pixel(2, 2), &Luma([255]));
        // Flat areas are unchanged: 9*100 - 8*100
        assert_eq!(sharpened.get_pixel(0, 4), &Luma([100]));
        // Neighbor of the bright pixel: 9*100 - 7*100 - 200 = 0
        assert_eq!(sharpened.get_pixel(2, 1), &Luma([0]));
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_gaussian_kernel_sums_to_one() {
        assert_eq!(GAUSSIAN_KERNEL_7.iter().sum::<f32>(), 1.0);
    }

    #[test]
    fn test_blur_keeps_flat_image() {
        let img = GrayImage::from_pixel(9, 9, Luma([128]));
        let blurred = gaussian_blur_7x7(&img);
        assert!(blurred.pixels().all(|p| (i32::from(p[0]) - 128).abs() <= 1));
    }

    #[test]
    fn test_binarize_is_two_valued() {
        let img = GrayImage::from_fn(16, 16, |x, _| if x < 8 { Luma([30]) } else { Luma([220]) });

        let binary = binarize_otsu(&img);

        assert_eq!(binary.get_pixel(0, 0), &Luma([0]));
        assert_eq!(binary.get_pixel(15, 15), &Luma([255]));
        assert!(binary.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn test_preprocess_image_dark_text_on_light_background() {
        let mut img = RgbImage::from_pixel(40, 20, Rgb([250, 250, 250]));
        for y in 5..15 {
            for x in 10..30 {
                img.put_pixel(x, y, Rgb([10, 10, 10]));
            }
        }

        let binary = preprocess_image(&img).unwrap();

        assert_eq!(binary.dimensions(), (40, 20));
        assert_eq!(binary.as_image().get_pixel(0, 0), &Luma([255]));
        assert_eq!(binary.as_image().get_pixel(20, 10), &Luma([0]));
    }

    #[test]
    fn test_preprocess_upscales_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        let mut img = RgbImage::from_pixel(30, 12, Rgb([255, 255, 255]));
        img.put_pixel(10, 6, Rgb([0, 0, 0]));
        img.save(&path).unwrap();

        let binary = preprocess(&path).unwrap();

        assert_eq!(binary.dimensions(), (60, 24));
        assert!(binary.as_image().pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn test_preprocess_missing_file() {
        let err = preprocess("/nonexistent/page.png").unwrap_err();
        assert!(matches!(err, ProcessingError::NotFound { .. }));
    }

    #[test]
    fn test_preprocess_empty_image_rejected() {
        let err = preprocess_image(&RgbImage::new(0, 0)).unwrap_err();
        assert!(matches!(err, ProcessingError::Preprocessing(_)));
    }
}
