//! OCR dispatch using Tesseract 5.x
//!
//! This crate runs an OCR engine over the text regions produced by the
//! segmentation stage, choosing a page segmentation mode (and language) from
//! each region's orientation.
//!
//! # Engines
//! - [`TesseractCli`]: spawns the `tesseract` binary per region (default)
//! - `LepTessEngine`: in-process Tesseract through `leptess` (feature `leptess`)
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use text_extract_ocr::{OcrConfig, OcrDispatcher, TesseractCli};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dispatcher = OcrDispatcher::new(Arc::new(TesseractCli::new()), OcrConfig::default());
//! let texts = dispatcher.recognize(&[])?;
//! assert!(texts.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod dispatch;
#[cfg(feature = "leptess")]
pub mod leptess_engine;
pub mod tesseract;

pub use dispatch::{LanguageMap, OcrConfig, OcrDispatcher};
#[cfg(feature = "leptess")]
pub use leptess_engine::LepTessEngine;
pub use tesseract::TesseractCli;

use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use text_extract_common::Orientation;
use thiserror::Error;

/// Tesseract model for horizontal Japanese text
pub const JPN_LANGUAGE: &str = "jpn";

/// Tesseract model for vertical Japanese text
pub const JPN_VERT_LANGUAGE: &str = "jpn_vert";

/// Default OCR engine mode (LSTM with legacy fallback where available)
pub const DEFAULT_ENGINE_MODE: &str = "--oem 3";

/// Errors that can occur during OCR processing
#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("OCR engine failed: {0}")]
    EngineFailed(String),

    #[error("OCR engine timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Invalid image dimensions: {0}")]
    InvalidImageDimensions(String),

    #[error("Failed to encode region image: {0}")]
    EncodeError(String),

    #[error("Engine produced invalid output: {0}")]
    InvalidOutput(String),

    #[error("OCR failed for region {index} ({orientation:?})")]
    RegionFailed {
        index: usize,
        orientation: Orientation,
        #[source]
        source: Box<OcrError>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Page segmentation mode passed to the engine alongside the engine mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationMode {
    /// PSM 6: a single uniform block of horizontal text
    HorizontalBlock,
    /// PSM 5: a single uniform block of vertically aligned text
    VerticalBlock,
}

impl SegmentationMode {
    #[must_use]
    pub fn for_orientation(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Horizontal => SegmentationMode::HorizontalBlock,
            Orientation::Vertical => SegmentationMode::VerticalBlock,
        }
    }

    /// Engine flag for this mode, as understood by the tesseract CLI
    #[must_use]
    pub const fn as_flag(&self) -> &'static str {
        match self {
            SegmentationMode::HorizontalBlock => "--psm 6",
            SegmentationMode::VerticalBlock => "--psm 5",
        }
    }
}

/// A single engine invocation
#[derive(Debug, Clone, Copy)]
pub struct OcrRequest<'a> {
    /// Tesseract language model, e.g. `jpn` or `jpn_vert`
    pub language: &'a str,
    /// Composite configuration string, e.g. `--oem 3 --psm 5`
    pub config: &'a str,
    /// Deadline for this call; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl<'a> OcrRequest<'a> {
    /// Configuration tokens in order, suitable as command line arguments
    pub fn config_args(&self) -> impl Iterator<Item = &'a str> {
        self.config.split_whitespace()
    }

    /// Value following `--psm` in the configuration string, if any
    #[must_use]
    pub fn page_segmentation_mode(&self) -> Option<&'a str> {
        flag_value(self.config, "--psm")
    }

    /// Value following `--oem` in the configuration string, if any
    #[must_use]
    pub fn engine_mode(&self) -> Option<&'a str> {
        flag_value(self.config, "--oem")
    }
}

fn flag_value<'a>(config: &'a str, flag: &str) -> Option<&'a str> {
    let mut tokens = config.split_whitespace();
    while let Some(token) = tokens.next() {
        if token == flag {
            return tokens.next();
        }
    }
    None
}

/// An OCR engine that turns one grayscale crop into raw text
///
/// Implementations must be shareable across threads so regions can be
/// dispatched on the rayon pool.
pub trait OcrEngine: Send + Sync {
    /// Engine identifier used in logs
    fn name(&self) -> &str;

    /// Recognize the text in `image` using the language and configuration in `request`
    fn image_to_string(&self, image: &GrayImage, request: &OcrRequest<'_>)
        -> Result<String, OcrError>;
}

pub(crate) fn ensure_non_empty(image: &GrayImage) -> Result<(), OcrError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(OcrError::InvalidImageDimensions(format!(
            "Image dimensions must be non-zero (got {}x{})",
            width, height
        )));
    }
    Ok(())
}
