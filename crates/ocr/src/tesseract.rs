//! OCR through the `tesseract` command line binary
//!
//! Each call writes the crop to a PNG inside a scratch directory, runs
//! `tesseract <png> <outbase> -l <lang> <config...>` and reads `<outbase>.txt`.
//! Output goes to files rather than pipes so a deadline can be enforced by
//! polling the child without risking a full pipe buffer.

use crate::{ensure_non_empty, OcrEngine, OcrError, OcrRequest};
use image::GrayImage;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Interval between child status checks while a deadline is armed
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Tesseract engine backed by the system binary
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: PathBuf,
    tessdata_dir: Option<PathBuf>,
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new()
    }
}

impl TesseractCli {
    /// Use `tesseract` from `PATH`
    pub fn new() -> Self {
        Self::with_binary("tesseract")
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            tessdata_dir: None,
        }
    }

    /// Directory holding `*.traineddata` files (`--tessdata-dir`)
    pub fn with_tessdata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tessdata_dir = Some(dir.into());
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn build_command(&self, input: &Path, output_base: &Path, request: &OcrRequest<'_>) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(input).arg(output_base);
        if let Some(dir) = &self.tessdata_dir {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        cmd.arg("-l").arg(request.language);
        cmd.args(request.config_args());
        cmd
    }
}

impl OcrEngine for TesseractCli {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn image_to_string(
        &self,
        image: &GrayImage,
        request: &OcrRequest<'_>,
    ) -> Result<String, OcrError> {
        ensure_non_empty(image)?;

        // Removed on drop, including on every error path below
        let workdir = tempfile::Builder::new().prefix("ocr_region_").tempdir()?;
        let input = workdir.path().join("region.png");
        let output_base = workdir.path().join("result");
        let stderr_path = workdir.path().join("stderr.log");

        image
            .save_with_format(&input, image::ImageFormat::Png)
            .map_err(|e| OcrError::EncodeError(format!("Failed to write region PNG: {e}")))?;

        let mut cmd = self.build_command(&input, &output_base, request);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(File::create(&stderr_path)?));

        debug!("Running {:?}", cmd);

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                OcrError::EngineUnavailable(format!(
                    "'{}' not found. Make sure Tesseract is installed \
                     (e.g., 'apt install tesseract-ocr tesseract-ocr-jpn tesseract-ocr-jpn-vert')",
                    self.binary.display()
                ))
            } else {
                OcrError::EngineUnavailable(format!(
                    "Failed to spawn '{}': {}",
                    self.binary.display(),
                    e
                ))
            }
        })?;

        let status = wait_with_deadline(&mut child, request.timeout)?;

        if !status.success() {
            let stderr = fs::read_to_string(&stderr_path).unwrap_or_default();
            return Err(OcrError::EngineFailed(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                status,
                stderr.trim()
            )));
        }

        let bytes = fs::read(output_base.with_extension("txt"))?;
        String::from_utf8(bytes)
            .map_err(|e| OcrError::InvalidOutput(format!("Output is not valid UTF-8: {e}")))
    }
}

/// Wait for `child`, killing it once `timeout` has elapsed
fn wait_with_deadline(child: &mut Child, timeout: Option<Duration>) -> Result<ExitStatus, OcrError> {
    let Some(timeout) = timeout else {
        return Ok(child.wait()?);
    };

    let start = Instant::now();
    loop {
        match child.try_wait()? {
            Some(status) => return Ok(status),
            None => {
                if start.elapsed() > timeout {
                    warn!("OCR engine exceeded {:?}, killing pid {}", timeout, child.id());
                    let _ = child.kill();
                    let _ = child.wait(); // Reap zombie
                    return Err(OcrError::Timeout(timeout));
                }
                std::thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn request<'a>(config: &'a str, timeout: Option<Duration>) -> OcrRequest<'a> {
        OcrRequest {
            language: "jpn_vert",
            config,
            timeout,
        }
    }

    #[test]
    fn test_command_arguments() {
        let engine = TesseractCli::with_binary("/usr/bin/tesseract").with_tessdata_dir("/opt/tessdata");
        let req = request("--oem 3 --psm 5", None);

        let cmd = engine.build_command(Path::new("in.png"), Path::new("out"), &req);
        let args: Vec<_> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(cmd.get_program(), "/usr/bin/tesseract");
        assert_eq!(
            args,
            vec![
                "in.png",
                "out",
                "--tessdata-dir",
                "/opt/tessdata",
                "-l",
                "jpn_vert",
                "--oem",
                "3",
                "--psm",
                "5"
            ]
        );
    }

    #[test]
    fn test_missing_binary_is_engine_unavailable() {
        let engine = TesseractCli::with_binary("/nonexistent/path/to/tesseract");
        let image = GrayImage::from_pixel(8, 8, Luma([255]));

        let err = engine
            .image_to_string(&image, &request("--oem 3 --psm 6", None))
            .unwrap_err();

        assert!(matches!(err, OcrError::EngineUnavailable(_)), "got {err:?}");
    }

    #[test]
    fn test_zero_sized_region_rejected() {
        let engine = TesseractCli::new();
        let err = engine
            .image_to_string(&GrayImage::new(0, 0), &request("--psm 6", None))
            .unwrap_err();
        assert!(matches!(err, OcrError::InvalidImageDimensions(_)));
    }

    #[cfg(unix)]
    mod fake_binary {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        /// Write an executable shell script standing in for tesseract
        fn script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("fake-tesseract");
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[test]
        fn test_reads_output_file() {
            let dir = tempfile::tempdir().unwrap();
            // $2 is the output base; tesseract appends .txt
            let binary = script(dir.path(), "printf '縦書き  テキスト\\n' > \"$2.txt\"");
            let engine = TesseractCli::with_binary(binary);

            let text = engine
                .image_to_string(
                    &GrayImage::from_pixel(4, 4, Luma([0])),
                    &request("--oem 3 --psm 5", Some(Duration::from_secs(10))),
                )
                .unwrap();

            assert_eq!(text, "縦書き  テキスト\n");
        }

        #[test]
        fn test_non_zero_exit_reports_stderr() {
            let dir = tempfile::tempdir().unwrap();
            let binary = script(
                dir.path(),
                "echo 'Failed loading language jpn_vert' >&2\nexit 1",
            );
            let engine = TesseractCli::with_binary(binary);

            let err = engine
                .image_to_string(&GrayImage::new(4, 4), &request("--psm 5", None))
                .unwrap_err();

            match err {
                OcrError::EngineFailed(message) => {
                    assert!(message.contains("Failed loading language"), "{message}");
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }

        #[test]
        fn test_hung_engine_times_out() {
            let dir = tempfile::tempdir().unwrap();
            let binary = script(dir.path(), "sleep 5");
            let engine = TesseractCli::with_binary(binary);

            let start = Instant::now();
            let err = engine
                .image_to_string(
                    &GrayImage::new(4, 4),
                    &request("--psm 6", Some(Duration::from_millis(100))),
                )
                .unwrap_err();

            assert!(matches!(err, OcrError::Timeout(_)), "got {err:?}");
            assert!(start.elapsed() < Duration::from_secs(5));
        }
    }
}
