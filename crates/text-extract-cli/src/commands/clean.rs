//! Upload directory cleanup

use anyhow::Result;
use clap::Args;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{error, info, warn};

#[derive(Args)]
pub struct CleanCommand {
    /// Directory holding uploaded images
    #[arg(value_name = "DIR")]
    dir: PathBuf,

    /// Only delete files last modified at least this many minutes ago
    #[arg(long, value_name = "MINUTES")]
    older_than: Option<u64>,
}

impl CleanCommand {
    pub async fn execute(self) -> Result<()> {
        let min_age = self.older_than.map(|m| Duration::from_secs(m.saturating_mul(60)));
        let deleted = clean_dir(&self.dir, min_age, SystemTime::now());
        info!("Deleted {} file(s) from {}", deleted, self.dir.display());
        Ok(())
    }
}

/// Delete regular files in `dir`, returning how many were removed
///
/// Subdirectories are left alone. Errors are logged per file and never abort
/// the sweep; a missing directory deletes nothing.
fn clean_dir(dir: &Path, min_age: Option<Duration>, now: SystemTime) -> usize {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            error!("Error when cleaning uploads in {}: {}", dir.display(), e);
            return 0;
        }
    };

    let mut deleted = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(metadata) = entry.metadata() else {
            warn!("Skipping {}: metadata unavailable", path.display());
            continue;
        };
        if !metadata.is_file() {
            continue;
        }

        if let Some(min_age) = min_age {
            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age < min_age {
                continue;
            }
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleted file: {}", path.display());
                deleted += 1;
            }
            Err(e) => error!("Error when deleting file {}: {}", path.display(), e),
        }
    }

    deleted
}
