//! Error types for the extraction pipeline

use std::path::PathBuf;
use text_extract_common::ProcessingError;
use text_extract_ocr::OcrError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Processing error: {0}")]
    Processing(#[from] ProcessingError),

    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    #[error("Failed to write result to {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ExtractError {
    /// Failure class reported at the recovery boundary
    #[must_use]
    pub fn class(&self) -> &'static str {
        match self {
            ExtractError::Processing(ProcessingError::NotFound { .. }) => "NotFoundError",
            ExtractError::Processing(ProcessingError::Segmentation(_)) => "SegmentationError",
            ExtractError::Processing(_) => "PreprocessingError",
            ExtractError::Ocr(_) => "OcrError",
            ExtractError::Output { .. } => "OutputError",
            ExtractError::Config(_) => "ConfigError",
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parsing error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
