// src/output/backup.rs
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{debug, info};

/// `<stem>_backup_YYYYMMDD.csv` inside `dir`.
pub fn backup_path(csv_path: &Path, dir: &Path, day: NaiveDate) -> PathBuf {
    let stem = csv_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    dir.join(format!("{stem}_backup_{}.csv", day.format("%Y%m%d")))
}

/// Copy the store into today's backup slot unless one already exists.
/// Returns the path when a copy was made.
pub fn backup_once_per_day(csv_path: &Path, dir: &Path, day: NaiveDate) -> Result<Option<PathBuf>> {
    if !csv_path.exists() {
        return Ok(None);
    }
    let target = backup_path(csv_path, dir, day);
    if target.exists() {
        debug!(backup = %target.display(), "backup for today already present");
        return Ok(None);
    }
    fs::create_dir_all(dir).with_context(|| format!("creating backup dir {}", dir.display()))?;
    fs::copy(csv_path, &target)
        .with_context(|| format!("copying {} to {}", csv_path.display(), target.display()))?;
    info!(backup = %target.display(), "backup created");
    Ok(Some(target))
}
