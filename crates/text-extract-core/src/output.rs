//! Persistence of normalized text

use crate::error::ExtractError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a successful extraction is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// One file, overwritten by every run
    Fixed(PathBuf),
    /// A directory receiving a new uniquely named file per run
    PerRun(PathBuf),
}

impl OutputTarget {
    /// Write `text` and return the path of the file written
    ///
    /// Parent directories are created as needed.
    pub fn persist(&self, text: &str) -> Result<PathBuf, ExtractError> {
        let path = match self {
            OutputTarget::Fixed(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    create_dir(parent)?;
                }
                fs::write(path, text).map_err(|source| ExtractError::Output {
                    path: path.clone(),
                    source,
                })?;
                path.clone()
            }
            OutputTarget::PerRun(dir) => {
                create_dir(dir)?;
                let file = tempfile::Builder::new()
                    .prefix("recognized-")
                    .suffix(".txt")
                    .tempfile_in(dir)
                    .map_err(|source| output_error(dir, source))?;
                fs::write(file.path(), text).map_err(|source| output_error(file.path(), source))?;
                let (_, path) = file
                    .keep()
                    .map_err(|e| output_error(dir, e.error))?;
                path
            }
        };

        debug!("Saved {} bytes of text to {}", text.len(), path.display());
        Ok(path)
    }
}

fn create_dir(dir: &Path) -> Result<(), ExtractError> {
    fs::create_dir_all(dir).map_err(|source| output_error(dir, source))
}

fn output_error(path: &Path, source: std::io::Error) -> ExtractError {
    ExtractError::Output {
        path: path.to_path_buf(),
        source,
    }
}
