//! Common types and utilities for the text extraction pipeline

use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the image stages of the pipeline (load, preprocess, segment)
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Image not found at {}: {reason}", path.display())]
    NotFound { path: PathBuf, reason: String },

    #[error("Preprocessing error: {0}")]
    Preprocessing(String),

    #[error("Segmentation error: {0}")]
    Segmentation(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<image::ImageError> for ProcessingError {
    fn from(err: image::ImageError) -> Self {
        ProcessingError::Preprocessing(err.to_string())
    }
}

/// Result type for image stage operations
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Text layout of a region, derived from its bounding box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    /// Vertical only when strictly taller than wide; squares are horizontal.
    #[must_use]
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if height > width {
            Orientation::Vertical
        } else {
            Orientation::Horizontal
        }
    }
}

/// Axis-aligned rectangle in pixel coordinates of the preprocessed image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingRect {
    #[inline]
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Width divided by height (zero height yields infinity)
    #[inline]
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }

    #[inline]
    #[must_use]
    pub fn orientation(&self) -> Orientation {
        Orientation::from_dimensions(self.width, self.height)
    }

    /// True when the rectangle lies fully inside a `width` x `height` image
    #[must_use]
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        u64::from(self.x) + u64::from(self.width) <= u64::from(width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(height)
    }
}

/// A cropped block of text ready for recognition
#[derive(Debug, Clone)]
pub struct Region {
    pub bounds: BoundingRect,
    pub orientation: Orientation,
    pub image: GrayImage,
}

impl Region {
    /// Build a region from its bounds and crop; orientation comes from the bounds.
    #[must_use]
    pub fn new(bounds: BoundingRect, image: GrayImage) -> Self {
        Self {
            orientation: bounds.orientation(),
            bounds,
            image,
        }
    }
}
