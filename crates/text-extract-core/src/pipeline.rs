//! End-to-end extraction: preprocess, segment, recognize, normalize, persist
//!
//! [`TextExtractor::run`] is the only place errors are recovered. Every stage
//! below it returns a `Result` and stops at the first failure, so a run either
//! produces the complete text or a [`ExtractionResult::Failure`].

use crate::config::ExtractorConfig;
use crate::error::{ConfigError, ExtractError};
use crate::image_io::{save_gray_png, save_rgb_png};
use crate::normalize::normalize;
use crate::output::OutputTarget;
use crate::preprocess::{preprocess, PreprocessedImage};
use crate::segment::{annotate, segment};
use serde::{Deserialize, Serialize};
use std::error::Error as _;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use text_extract_common::{ProcessingError, Region};
use text_extract_ocr::{OcrDispatcher, OcrEngine};
use tracing::{debug, error, info, warn};

/// Output of a successful [`TextExtractor::try_run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    pub region_count: usize,
    /// File the text was written to, when saving is enabled
    pub output_path: Option<PathBuf>,
}

/// Outcome of [`TextExtractor::run`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExtractionResult {
    Success {
        text: String,
        output_path: Option<PathBuf>,
    },
    Failure {
        message: String,
    },
}

impl ExtractionResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionResult::Success { .. })
    }

    /// Recognized text, `None` on failure
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            ExtractionResult::Success { text, .. } => Some(text),
            ExtractionResult::Failure { .. } => None,
        }
    }
}

/// Image-to-text pipeline bound to one OCR engine
pub struct TextExtractor {
    dispatcher: OcrDispatcher,
    output: Option<OutputTarget>,
    debug_dir: Option<PathBuf>,
}

impl TextExtractor {
    /// Extractor that neither saves results nor writes debug artifacts
    pub fn new(dispatcher: OcrDispatcher) -> Self {
        Self {
            dispatcher,
            output: None,
            debug_dir: None,
        }
    }

    /// Build an extractor from a validated config and an engine
    pub fn from_config(
        config: &ExtractorConfig,
        engine: Arc<dyn OcrEngine>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut extractor = Self::new(OcrDispatcher::new(engine, config.ocr_config()));
        extractor.output = config.output_target();
        if config.debug {
            extractor.debug_dir = Some(config.debug_dir.clone());
        }
        Ok(extractor)
    }

    #[must_use]
    pub fn with_output(mut self, target: OutputTarget) -> Self {
        self.output = Some(target);
        self
    }

    /// Write the binarized image and the region overlay into `dir` on each run
    #[must_use]
    pub fn with_debug_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug_dir = Some(dir.into());
        self
    }

    pub fn dispatcher(&self) -> &OcrDispatcher {
        &self.dispatcher
    }

    /// Extract text from the image at `path`; never panics or returns an error
    ///
    /// Failures are logged and reported as [`ExtractionResult::Failure`].
    pub fn run<P: AsRef<Path>>(&self, path: P) -> ExtractionResult {
        let path = path.as_ref();

        match catch_unwind(AssertUnwindSafe(|| self.try_run(path))) {
            Ok(Ok(extraction)) => ExtractionResult::Success {
                text: extraction.text,
                output_path: extraction.output_path,
            },
            Ok(Err(err)) => {
                error!(
                    class = err.class(),
                    path = %path.display(),
                    "Error when running text extractor: {}",
                    err
                );
                error!("{}", cause_chain(&err));
                ExtractionResult::Failure {
                    message: err.to_string(),
                }
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(
                    path = %path.display(),
                    "Error when running text extractor: panic: {}",
                    message
                );
                error!(
                    "Caused by: a pipeline stage panicked while processing {}: {}",
                    path.display(),
                    message
                );
                ExtractionResult::Failure {
                    message: format!("panic: {message}"),
                }
            }
        }
    }

    /// Extract text from the image at `path`, returning the typed error
    pub fn try_run<P: AsRef<Path>>(&self, path: P) -> Result<Extraction, ExtractError> {
        let path = path.as_ref();
        let start = Instant::now();

        let binary = preprocess(path)?;
        let regions = segment(&binary)?;
        debug!("{} region(s) in {}", regions.len(), path.display());

        if let Some(dir) = &self.debug_dir {
            write_debug_artifacts(dir, path, &binary, &regions);
        }

        let texts = self.dispatcher.recognize(&regions)?;
        let text = normalize(&texts);

        let output_path = match &self.output {
            Some(target) => Some(target.persist(&text)?),
            None => None,
        };

        info!(
            "Extracted {} region(s) from {} in {:?}",
            regions.len(),
            path.display(),
            start.elapsed()
        );

        Ok(Extraction {
            text,
            region_count: regions.len(),
            output_path,
        })
    }
}

/// Error message followed by each underlying cause, one per line
fn cause_chain(err: &ExtractError) -> String {
    let mut chain = format!("Caused by: {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str(&format!("\n  {cause}"));
        source = cause.source();
    }
    chain
}

/// Debug artifacts are best effort; failures only warn
fn write_debug_artifacts(dir: &Path, input: &Path, binary: &PreprocessedImage, regions: &[Region]) {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let preprocessed_path = dir.join(format!("{stem}_preprocessed.png"));
    let regions_path = dir.join(format!("{stem}_regions.png"));

    let result = std::fs::create_dir_all(dir)
        .map_err(ProcessingError::from)
        .and_then(|()| save_gray_png(binary.as_image(), &preprocessed_path))
        .and_then(|()| save_rgb_png(&annotate(binary.as_image(), regions), &regions_path));

    match result {
        Ok(()) => debug!(
            "Wrote debug images {} and {}",
            preprocessed_path.display(),
            regions_path.display()
        ),
        Err(e) => warn!("Failed to write debug images to {}: {}", dir.display(), e),
    }
}
