//! Per-region OCR dispatch

use crate::{OcrEngine, OcrError, OcrRequest, SegmentationMode, DEFAULT_ENGINE_MODE};
use crate::{JPN_LANGUAGE, JPN_VERT_LANGUAGE};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use text_extract_common::{Orientation, Region};
use tracing::{debug, info};

/// Language model per region orientation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageMap {
    pub horizontal: String,
    pub vertical: String,
}

impl LanguageMap {
    #[must_use]
    pub fn new(horizontal: impl Into<String>, vertical: impl Into<String>) -> Self {
        Self {
            horizontal: horizontal.into(),
            vertical: vertical.into(),
        }
    }

    /// Same language for both orientations
    #[must_use]
    pub fn uniform(language: impl Into<String>) -> Self {
        let language = language.into();
        Self {
            horizontal: language.clone(),
            vertical: language,
        }
    }

    #[must_use]
    pub fn language_for(&self, orientation: Orientation) -> &str {
        match orientation {
            Orientation::Horizontal => &self.horizontal,
            Orientation::Vertical => &self.vertical,
        }
    }
}

impl Default for LanguageMap {
    fn default() -> Self {
        Self::new(JPN_LANGUAGE, JPN_VERT_LANGUAGE)
    }
}

/// Configuration for OCR dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Language model per orientation
    #[serde(default)]
    pub languages: LanguageMap,
    /// Engine operating mode token (e.g. `--oem 3`)
    #[serde(default = "default_engine_mode")]
    pub engine_mode: String,
    /// Per-region deadline
    #[serde(default)]
    pub timeout: Option<Duration>,
    /// Recognize regions on the rayon pool instead of one by one
    #[serde(default)]
    pub parallel: bool,
}

fn default_engine_mode() -> String {
    DEFAULT_ENGINE_MODE.to_string()
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: LanguageMap::default(),
            engine_mode: default_engine_mode(),
            timeout: None,
            parallel: false,
        }
    }
}

/// Runs an [`OcrEngine`] over every region, in region order
pub struct OcrDispatcher {
    engine: Arc<dyn OcrEngine>,
    config: OcrConfig,
}

impl OcrDispatcher {
    pub fn new(engine: Arc<dyn OcrEngine>, config: OcrConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// Composite engine configuration for a region orientation
    #[must_use]
    pub fn engine_config(&self, orientation: Orientation) -> String {
        format!(
            "{} {}",
            self.config.engine_mode,
            SegmentationMode::for_orientation(orientation).as_flag()
        )
    }

    /// Recognize every region, one string per region in the same order
    ///
    /// The first engine failure aborts the dispatch; no partial output is returned.
    pub fn recognize(&self, regions: &[Region]) -> Result<Vec<String>, OcrError> {
        let start = Instant::now();

        let texts = if self.config.parallel {
            regions
                .par_iter()
                .enumerate()
                .map(|(index, region)| self.recognize_region(index, region))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            regions
                .iter()
                .enumerate()
                .map(|(index, region)| self.recognize_region(index, region))
                .collect::<Result<Vec<_>, _>>()?
        };

        info!(
            "OCR ({}) complete in {:?}: {} region(s)",
            self.engine.name(),
            start.elapsed(),
            texts.len()
        );

        Ok(texts)
    }

    fn recognize_region(&self, index: usize, region: &Region) -> Result<String, OcrError> {
        let config = self.engine_config(region.orientation);
        let request = OcrRequest {
            language: self.config.languages.language_for(region.orientation),
            config: &config,
            timeout: self.config.timeout,
        };

        debug!(
            "Region {} at ({}, {}) {}x{}: lang={} config='{}'",
            index,
            region.bounds.x,
            region.bounds.y,
            region.bounds.width,
            region.bounds.height,
            request.language,
            request.config
        );

        self.engine
            .image_to_string(&region.image, &request)
            .map_err(|e| OcrError::RegionFailed {
                index,
                orientation: region.orientation,
                source: Box::new(e),
            })
    }
}
