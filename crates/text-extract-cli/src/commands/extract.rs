//! Extract command implementation

use anyhow::{Context as _, Result};
use clap::{Args, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use text_extract_core::{ExtractionResult, ExtractorConfig, OutputMode, TextExtractor};
use text_extract_ocr::{OcrEngine, TesseractCli};
use tracing::info;

/// OCR backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EngineKind {
    /// `tesseract` binary
    Tesseract,
    /// In-process libtesseract (requires the `leptess` feature)
    Leptess,
}

#[derive(Args)]
pub struct ExtractCommand {
    /// Input image path
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// YAML config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Language for horizontal regions
    #[arg(long)]
    language: Option<String>,

    /// Language for vertical regions
    #[arg(long)]
    vertical_language: Option<String>,

    /// Engine mode token passed to Tesseract (e.g. "--oem 1")
    #[arg(long, allow_hyphen_values = true)]
    engine_mode: Option<String>,

    /// OCR backend
    #[arg(long, value_enum, default_value_t = EngineKind::Tesseract)]
    engine: EngineKind,

    /// Do not write the result to disk
    #[arg(long)]
    no_save: bool,

    /// Result file, overwritten on every run
    #[arg(short, long, conflicts_with = "per_run_output")]
    output: Option<PathBuf>,

    /// Directory receiving a new result file per run
    #[arg(long)]
    per_run_output: Option<PathBuf>,

    /// Write the binarized page and region overlay as PNGs
    #[arg(long)]
    debug: bool,

    /// Directory for debug images
    #[arg(long)]
    debug_dir: Option<PathBuf>,

    /// Per-region OCR timeout (seconds)
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Recognize regions in parallel
    #[arg(long)]
    parallel: bool,

    /// Path to the tesseract binary
    #[arg(long)]
    tesseract: Option<PathBuf>,

    /// Directory holding *.traineddata files
    #[arg(long)]
    tessdata_dir: Option<PathBuf>,

    /// Print a JSON envelope instead of plain text
    #[arg(long)]
    json: bool,
}

/// JSON shape returned to upload front ends
#[derive(Debug, Serialize)]
struct Envelope {
    success: bool,
    message: String,
    result: Option<String>,
}

impl ExtractCommand {
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config()?;
        info!("Input: {}", self.input.display());
        info!(
            "Languages: {} (horizontal), {} (vertical)",
            config.language, config.vertical_language
        );

        if !self.input.exists() {
            if self.json {
                print_envelope(&Envelope {
                    success: false,
                    message: "The image was not found, please reupload it.".to_string(),
                    result: None,
                })?;
            }
            anyhow::bail!("Input file does not exist: {}", self.input.display());
        }

        let engine = self.build_engine(&config)?;
        let extractor = TextExtractor::from_config(&config, engine)
            .context("Failed to build text extractor")?;

        let input = self.input.clone();
        let result = tokio::task::spawn_blocking(move || extractor.run(&input))
            .await
            .context("Extraction task failed")?;

        match result {
            ExtractionResult::Success { text, output_path } => {
                if let Some(path) = output_path {
                    info!("Saved result to {}", path.display());
                }
                if self.json {
                    print_envelope(&Envelope {
                        success: true,
                        message: "Processing completed successfully".to_string(),
                        result: Some(text),
                    })?;
                } else {
                    print!("{text}");
                }
                Ok(())
            }
            ExtractionResult::Failure { message } => {
                if self.json {
                    print_envelope(&Envelope {
                        success: false,
                        message: "Processing failed, please try again.".to_string(),
                        result: None,
                    })?;
                }
                anyhow::bail!("Extraction failed: {}", message)
            }
        }
    }

    /// Config file (or defaults) with command line overrides applied
    fn build_config(&self) -> Result<ExtractorConfig> {
        let mut config = match &self.config {
            Some(path) => ExtractorConfig::from_yaml(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ExtractorConfig::default(),
        };

        if let Some(language) = &self.language {
            config.language = language.clone();
        }
        if let Some(language) = &self.vertical_language {
            config.vertical_language = language.clone();
        }
        if let Some(mode) = &self.engine_mode {
            config.engine_mode = mode.clone();
        }
        if self.no_save {
            config.save_result = false;
        }
        if let Some(path) = &self.output {
            config.output_mode = OutputMode::Fixed;
            config.output_path = path.clone();
        }
        if let Some(dir) = &self.per_run_output {
            config.output_mode = OutputMode::PerRun;
            config.output_path = dir.clone();
        }
        if self.debug {
            config.debug = true;
        }
        if let Some(dir) = &self.debug_dir {
            config.debug_dir = dir.clone();
        }
        if self.timeout.is_some() {
            config.ocr_timeout_secs = self.timeout;
        }
        if self.parallel {
            config.parallel = true;
        }
        if let Some(binary) = &self.tesseract {
            config.tesseract_binary = binary.clone();
        }
        if let Some(dir) = &self.tessdata_dir {
            config.tessdata_dir = Some(dir.clone());
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    fn build_engine(&self, config: &ExtractorConfig) -> Result<Arc<dyn OcrEngine>> {
        match self.engine {
            EngineKind::Tesseract => {
                let mut engine = TesseractCli::with_binary(&config.tesseract_binary);
                if let Some(dir) = &config.tessdata_dir {
                    engine = engine.with_tessdata_dir(dir);
                }
                Ok(Arc::new(engine))
            }
            #[cfg(feature = "leptess")]
            EngineKind::Leptess => {
                let data_path = config
                    .tessdata_dir
                    .as_ref()
                    .map(|dir| dir.to_string_lossy().into_owned());
                let engine = text_extract_ocr::LepTessEngine::new(data_path, &config.language)
                    .context("Failed to initialize leptess engine")?;
                Ok(Arc::new(engine))
            }
            #[cfg(not(feature = "leptess"))]
            EngineKind::Leptess => {
                anyhow::bail!("This build does not include the leptess engine (enable the `leptess` feature)")
            }
        }
    }
}

fn print_envelope(envelope: &Envelope) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(())
}
