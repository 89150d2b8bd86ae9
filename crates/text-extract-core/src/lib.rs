//! Image-to-text extraction pipeline
//!
//! A scanned page goes through five stages:
//!
//! 1. [`image_io`]: load the file and write a 2x upscaled copy at 1200 dpi
//! 2. [`preprocess`]: normalize, grayscale, sharpen, blur and Otsu-binarize
//! 3. [`segment`]: find external contours, drop specks, crop text regions
//! 4. OCR dispatch ([`text_extract_ocr::OcrDispatcher`]): one engine call per
//!    region, with the language and page segmentation mode picked from the
//!    region's orientation
//! 5. [`normalize`]: collapse whitespace, one line per region
//!
//! [`TextExtractor`] wires the stages together and is the only place errors
//! are recovered.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use text_extract_core::{ExtractorConfig, TextExtractor};
//! use text_extract_ocr::TesseractCli;
//!
//! let config = ExtractorConfig::default();
//! let extractor = TextExtractor::from_config(&config, Arc::new(TesseractCli::new()))?;
//! if let Some(text) = extractor.run("scan.png").text() {
//!     print!("{text}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod error;
pub mod image_io;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod preprocess;
pub mod segment;

pub use config::{ExtractorConfig, OutputMode};
pub use error::{ConfigError, ExtractError};
pub use normalize::normalize;
pub use output::OutputTarget;
pub use pipeline::{Extraction, ExtractionResult, TextExtractor};
pub use preprocess::PreprocessedImage;
pub use text_extract_common::{BoundingRect, Orientation, ProcessingError, Region};
