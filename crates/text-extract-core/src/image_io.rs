//! Image loading, upscaling and PNG output
//!
//! Decoding sniffs the format from the file contents rather than the
//! extension, so uploads with a wrong or missing extension still load.
//! The upscaler writes PNGs through the `png` crate directly so the output
//! carries a `pHYs` chunk with the fixed 1200 dpi resolution.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage, RgbImage};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::TempPath;
use text_extract_common::{ProcessingError, Result};
use tracing::debug;

/// Magnification applied before preprocessing
pub const UPSCALE_FACTOR: u32 = 2;

/// Resolution written into upscaled images
pub const UPSCALE_DPI: u32 = 1200;

/// `UPSCALE_DPI` expressed in pixels per meter, the unit PNG stores
const UPSCALE_PIXELS_PER_METER: u32 = 47_244;

fn not_found(path: &Path, reason: impl ToString) -> ProcessingError {
    ProcessingError::NotFound {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Read and decode an image file, mapping every failure to `NotFound`
fn decode_file(path: &Path) -> Result<DynamicImage> {
    let data = fs::read(path).map_err(|e| not_found(path, e))?;
    image::load_from_memory(&data).map_err(|e| not_found(path, e))
}

/// Load an image as 8-bit RGB
///
/// Fails with [`ProcessingError::NotFound`] when the file is missing or its
/// contents cannot be decoded; never returns an empty image.
///
/// # Example
/// ```no_run
/// use text_extract_core::image_io::load_image;
/// let img = load_image("scan.png")?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    let path = path.as_ref();
    let img = decode_file(path)?;

    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(not_found(path, "decoded image is empty"));
    }

    debug!("Loaded {} ({}x{})", path.display(), width, height);
    Ok(img.to_rgb8())
}

/// Write a magnified copy of `path` to a fresh temporary PNG
///
/// Both dimensions are multiplied by [`UPSCALE_FACTOR`] using Lanczos3
/// resampling. The file is complete and synced when this returns; it is
/// deleted when the returned [`TempPath`] is dropped.
pub fn upscale<P: AsRef<Path>>(path: P) -> Result<TempPath> {
    let path = path.as_ref();
    let img = decode_file(path)?;

    let (width, height) = img.dimensions();
    let (new_width, new_height) = match (
        width.checked_mul(UPSCALE_FACTOR),
        height.checked_mul(UPSCALE_FACTOR),
    ) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(ProcessingError::Preprocessing(format!(
                "Cannot upscale image of {}x{}",
                width, height
            )))
        }
    };

    let resized = img
        .resize_exact(new_width, new_height, FilterType::Lanczos3)
        .to_rgb8();

    let temp = tempfile::Builder::new()
        .prefix("upscaled_")
        .suffix(".png")
        .tempfile()?;
    write_png_with_dpi(&resized, temp.as_file())?;
    temp.as_file().sync_all()?;

    debug!(
        "Upscaled {} from {}x{} to {}x{} at {}",
        path.display(),
        width,
        height,
        new_width,
        new_height,
        temp.path().display()
    );

    Ok(temp.into_temp_path())
}

fn write_png_with_dpi<W: Write>(image: &RgbImage, writer: W) -> Result<()> {
    let mut writer = BufWriter::new(writer);
    let (width, height) = image.dimensions();

    let mut encoder = png::Encoder::new(&mut writer, width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_pixel_dims(Some(png::PixelDimensions {
        xppu: UPSCALE_PIXELS_PER_METER,
        yppu: UPSCALE_PIXELS_PER_METER,
        unit: png::Unit::Meter,
    }));

    let mut png_writer = encoder
        .write_header()
        .map_err(|e| ProcessingError::Preprocessing(format!("Failed to write PNG header: {e}")))?;
    png_writer
        .write_image_data(image.as_raw())
        .map_err(|e| ProcessingError::Preprocessing(format!("Failed to write PNG data: {e}")))?;
    png_writer
        .finish()
        .map_err(|e| ProcessingError::Preprocessing(format!("Failed to finish PNG: {e}")))?;

    writer.flush()?;
    Ok(())
}

/// Save a grayscale image as PNG (debug artifacts)
pub fn save_gray_png<P: AsRef<Path>>(image: &GrayImage, path: P) -> Result<()> {
    image.save_with_format(path.as_ref(), image::ImageFormat::Png)?;
    Ok(())
}

/// Save an RGB image as PNG (debug artifacts)
pub fn save_rgb_png<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<()> {
    image.save_with_format(path.as_ref(), image::ImageFormat::Png)?;
    Ok(())
}
