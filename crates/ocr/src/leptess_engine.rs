//! In-process OCR using `leptess` (libtesseract + leptonica)

use crate::{ensure_non_empty, OcrEngine, OcrError, OcrRequest};
use image::GrayImage;
use leptess::{LepTess, Variable};
use tracing::debug;

/// Source resolution reported to Tesseract; matches the upscaler's dpi
const SOURCE_RESOLUTION: i32 = 1200;

/// Tesseract engine linked into the process
///
/// A fresh `LepTess` handle is created per call, so the engine can be shared
/// across threads. The engine mode token is not applied (leptess always uses
/// the default mode) and timeouts are not enforced.
#[derive(Debug, Clone, Default)]
pub struct LepTessEngine {
    data_path: Option<String>,
}

impl LepTessEngine {
    /// Create an engine, verifying Tesseract can load `check_language`
    pub fn new(data_path: Option<String>, check_language: &str) -> Result<Self, OcrError> {
        LepTess::new(data_path.as_deref(), check_language).map_err(|e| {
            OcrError::EngineUnavailable(format!(
                "Failed to initialize Tesseract with language '{}': {}. \
                 Make sure language data is installed (e.g., 'apt install tesseract-ocr-jpn')",
                check_language, e
            ))
        })?;

        Ok(Self { data_path })
    }
}

impl OcrEngine for LepTessEngine {
    fn name(&self) -> &str {
        "leptess"
    }

    fn image_to_string(
        &self,
        image: &GrayImage,
        request: &OcrRequest<'_>,
    ) -> Result<String, OcrError> {
        ensure_non_empty(image)?;

        let mut lt = LepTess::new(self.data_path.as_deref(), request.language).map_err(|e| {
            OcrError::EngineUnavailable(format!(
                "Failed to initialize Tesseract with language '{}': {}",
                request.language, e
            ))
        })?;

        if let Some(psm) = request.page_segmentation_mode() {
            lt.set_variable(Variable::TesseditPagesegMode, psm)
                .map_err(|e| OcrError::EngineFailed(format!("Failed to set PSM: {}", e)))?;
        }
        if let Some(oem) = request.engine_mode() {
            debug!("leptess ignores engine mode {}", oem);
        }

        // leptess expects encoded image data
        let mut png_buf = std::io::Cursor::new(Vec::new());
        image
            .write_to(&mut png_buf, image::ImageFormat::Png)
            .map_err(|e| OcrError::EncodeError(format!("Failed to encode image to PNG: {}", e)))?;

        lt.set_image_from_mem(png_buf.get_ref())
            .map_err(|e| OcrError::EngineFailed(format!("Failed to set image from memory: {}", e)))?;
        lt.set_source_resolution(SOURCE_RESOLUTION);

        lt.get_utf8_text()
            .map_err(|e| OcrError::InvalidOutput(format!("Output is not valid UTF-8: {}", e)))
    }
}
