//! Extractor configuration

use crate::error::ConfigError;
use crate::output::OutputTarget;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use text_extract_ocr::{LanguageMap, OcrConfig, DEFAULT_ENGINE_MODE, JPN_LANGUAGE, JPN_VERT_LANGUAGE};

/// How persisted results are named
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// `output_path` is a file overwritten by every run
    #[default]
    Fixed,
    /// `output_path` is a directory; each run writes a new file
    PerRun,
}

/// Settings for a [`TextExtractor`](crate::TextExtractor)
///
/// Every field has a default; a YAML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Language for horizontal regions
    pub language: String,
    /// Language for vertical regions
    pub vertical_language: String,
    /// Engine operating mode token
    pub engine_mode: String,
    /// Persist the normalized text on success
    pub save_result: bool,
    pub output_mode: OutputMode,
    /// File (fixed mode) or directory (per-run mode)
    pub output_path: PathBuf,
    /// Write preprocessed and annotated images
    pub debug: bool,
    pub debug_dir: PathBuf,
    /// Per-region OCR deadline in seconds
    pub ocr_timeout_secs: Option<u64>,
    /// Recognize regions in parallel
    pub parallel: bool,
    /// Binary used by the command line engine
    pub tesseract_binary: PathBuf,
    pub tessdata_dir: Option<PathBuf>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            language: JPN_LANGUAGE.to_string(),
            vertical_language: JPN_VERT_LANGUAGE.to_string(),
            engine_mode: DEFAULT_ENGINE_MODE.to_string(),
            save_result: true,
            output_mode: OutputMode::Fixed,
            output_path: PathBuf::from("output/recognized.txt"),
            debug: false,
            debug_dir: PathBuf::from("output/debug"),
            ocr_timeout_secs: None,
            parallel: false,
            tesseract_binary: PathBuf::from("tesseract"),
            tessdata_dir: None,
        }
    }
}

impl ExtractorConfig {
    /// Load a config from a YAML file and validate it
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.language.trim().is_empty() {
            return Err(ConfigError::Invalid("language must not be empty".to_string()));
        }
        if self.vertical_language.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "vertical_language must not be empty".to_string(),
            ));
        }
        if self.ocr_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "ocr_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Dispatcher settings derived from this config
    #[must_use]
    pub fn ocr_config(&self) -> OcrConfig {
        OcrConfig {
            languages: LanguageMap::new(&self.language, &self.vertical_language),
            engine_mode: self.engine_mode.clone(),
            timeout: self.ocr_timeout_secs.map(Duration::from_secs),
            parallel: self.parallel,
        }
    }

    /// Where results go, or `None` when saving is disabled
    #[must_use]
    pub fn output_target(&self) -> Option<OutputTarget> {
        if !self.save_result {
            return None;
        }
        Some(match self.output_mode {
            OutputMode::Fixed => OutputTarget::Fixed(self.output_path.clone()),
            OutputMode::PerRun => OutputTarget::PerRun(self.output_path.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExtractorConfig::default();
        assert_eq!(config.language, "jpn");
        assert_eq!(config.vertical_language, "jpn_vert");
        assert_eq!(config.engine_mode, "--oem 3");
        assert!(config.save_result);
        assert!(!config.debug);
        assert_eq!(
            config.output_target(),
            Some(OutputTarget::Fixed(PathBuf::from("output/recognized.txt")))
        );
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "language: eng\noutput_mode: per_run\noutput_path: results\nocr_timeout_secs: 30\n",
        )
        .unwrap();

        let config = ExtractorConfig::from_yaml(&path).unwrap();

        assert_eq!(config.language, "eng");
        assert_eq!(config.vertical_language, "jpn_vert");
        assert_eq!(
            config.output_target(),
            Some(OutputTarget::PerRun(PathBuf::from("results")))
        );
        assert_eq!(config.ocr_config().timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_ocr_config_maps_languages() {
        let config = ExtractorConfig {
            language: "eng".to_string(),
            vertical_language: "chi_tra_vert".to_string(),
            parallel: true,
            ..Default::default()
        };

        let ocr = config.ocr_config();

        assert_eq!(ocr.languages, LanguageMap::new("eng", "chi_tra_vert"));
        assert_eq!(ocr.engine_mode, "--oem 3");
        assert!(ocr.parallel);
        assert_eq!(ocr.timeout, None);
    }

    #[test]
    fn test_save_disabled_has_no_target() {
        let config = ExtractorConfig {
            save_result: false,
            ..Default::default()
        };
        assert_eq!(config.output_target(), None);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let empty_language = ExtractorConfig {
            language: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(empty_language.validate(), Err(ConfigError::Invalid(_))));

        let zero_timeout = ExtractorConfig {
            ocr_timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(matches!(zero_timeout.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = ExtractorConfig::from_yaml("/nonexistent/config.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "parallel: [not, a, bool]\n").unwrap();

        let err = ExtractorConfig::from_yaml(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
