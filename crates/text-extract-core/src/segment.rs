//! Region segmentation on the binarized image
//!
//! Uses imageproc for contour detection instead of `OpenCV`. Only external
//! borders are considered: components sitting inside another component's
//! hole (the inside of an "O", for example) are dropped.

use crate::preprocess::PreprocessedImage;
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use text_extract_common::{BoundingRect, ProcessingError, Region, Result};
use tracing::debug;

/// Boxes at or below this area are candidates for rejection
pub const MIN_AREA: u64 = 100;

/// Boxes at or below this width/height ratio are candidates for rejection
pub const MIN_ASPECT_RATIO: f64 = 0.1;

const RECT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const CORNER_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const CORNER_RADIUS: i32 = 8;

/// Whether a bounding box is kept as a text region
///
/// A box is discarded only when it is both small (`area <= MIN_AREA`) and
/// thin (`width / height <= MIN_ASPECT_RATIO`). Failing just one of the two
/// tests is not enough to drop it.
#[must_use]
pub fn is_text_candidate(rect: &BoundingRect) -> bool {
    rect.area() > MIN_AREA || rect.aspect_ratio() > MIN_ASPECT_RATIO
}

/// Copy of `image` inside a one-pixel background frame
///
/// `find_contours` never starts an outer border in column 0, so components
/// touching the image edge are only reported once they are moved off it.
fn pad_with_background(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut padded = GrayImage::new(width + 2, height + 2);
    image::imageops::replace(&mut padded, image, 1, 1);
    padded
}

/// Inclusive bounding rectangle of a contour traced on the padded image,
/// in coordinates of the unpadded image
fn bounding_rect(contour: &Contour<u32>) -> Option<BoundingRect> {
    let first = contour.points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &contour.points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(BoundingRect::new(
        min_x.saturating_sub(1),
        min_y.saturating_sub(1),
        max_x - min_x + 1,
        max_y - min_y + 1,
    ))
}

/// Find, filter, classify and crop the text regions of a binarized image
///
/// Regions come back in contour-detection order.
pub fn segment(image: &PreprocessedImage) -> Result<Vec<Region>> {
    let binary = image.as_image();
    let (width, height) = binary.dimensions();
    if width == 0 || height == 0 {
        return Err(ProcessingError::Segmentation(format!(
            "Cannot segment an empty image ({}x{})",
            width, height
        )));
    }

    let contours = find_contours::<u32>(&pad_with_background(binary));
    let external = contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none());

    let mut regions = Vec::new();
    let mut discarded = 0usize;

    for contour in external {
        let Some(bounds) = bounding_rect(contour) else {
            continue;
        };

        if !is_text_candidate(&bounds) {
            discarded += 1;
            continue;
        }

        if !bounds.fits_within(width, height) {
            return Err(ProcessingError::Segmentation(format!(
                "Region {:?} exceeds image bounds {}x{}",
                bounds, width, height
            )));
        }

        let crop = image::imageops::crop_imm(binary, bounds.x, bounds.y, bounds.width, bounds.height)
            .to_image();
        regions.push(Region::new(bounds, crop));
    }

    debug!(
        "Segmented {} contour(s): {} region(s) kept, {} discarded",
        contours.len(),
        regions.len(),
        discarded
    );

    Ok(regions)
}

/// Copy of `image` with every region outlined and its top-left corner marked
#[must_use]
pub fn annotate(image: &GrayImage, regions: &[Region]) -> RgbImage {
    let mut canvas = DynamicImage::ImageLuma8(image.clone()).to_rgb8();
    for region in regions {
        let b = region.bounds;
        let (Ok(x), Ok(y)) = (i32::try_from(b.x), i32::try_from(b.y)) else {
            continue;
        };
        draw_hollow_rect_mut(&mut canvas, Rect::at(x, y).of_size(b.width, b.height), RECT_COLOR);
        draw_filled_circle_mut(&mut canvas, (x, y), CORNER_RADIUS, CORNER_COLOR);
    }
    canvas
}
