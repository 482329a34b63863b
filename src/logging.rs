// src/logging.rs
//! Persistent run log at `logs/main.log`, next to the console output.
//!
//! The file is rotated by size when a run starts (`main.log` → `main.log.1` → …),
//! keeping at most `LOG_BACKUP_COUNT` old files.

use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use crate::config::ai::env_parse;

pub const LOG_FILE_NAME: &str = "main.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    /// Rotate once the file reaches this size. 0 never rotates.
    pub max_bytes: u64,
    pub backup_count: usize,
}

impl Default for LogFileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("logs"),
            max_bytes: 10 * 1024 * 1024,
            backup_count: 5,
        }
    }
}

impl LogFileConfig {
    /// `LOG_FILE_ENABLED`, `LOG_DIR`, `LOG_ROTATION_SIZE_MB`, `LOG_BACKUP_COUNT`.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = env::var("LOG_FILE_ENABLED") {
            cfg.enabled = !v.trim().eq_ignore_ascii_case("false");
        }
        if let Some(v) = env::var("LOG_DIR").ok().filter(|v| !v.trim().is_empty()) {
            cfg.dir = PathBuf::from(v.trim());
        }
        if let Some(mb) = env_parse::<u64>("LOG_ROTATION_SIZE_MB") {
            cfg.max_bytes = mb.saturating_mul(1024 * 1024);
        }
        if let Some(n) = env_parse::<usize>("LOG_BACKUP_COUNT") {
            cfg.backup_count = n;
        }
        cfg
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(LOG_FILE_NAME)
    }

    fn backup_path(&self, n: usize) -> PathBuf {
        self.dir.join(format!("{LOG_FILE_NAME}.{n}"))
    }
}

/// Shift an oversized `main.log` into `main.log.1`, older backups up by one,
/// dropping whatever falls past `backup_count`. Returns whether it rotated.
pub fn rotate_if_oversized(cfg: &LogFileConfig) -> Result<bool> {
    let current = cfg.path();
    let size = match fs::metadata(&current) {
        Ok(m) => m.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e).with_context(|| format!("inspecting {}", current.display())),
    };
    if cfg.max_bytes == 0 || size < cfg.max_bytes {
        return Ok(false);
    }

    if cfg.backup_count == 0 {
        fs::remove_file(&current).with_context(|| format!("removing {}", current.display()))?;
        return Ok(true);
    }
    let oldest = cfg.backup_path(cfg.backup_count);
    if oldest.exists() {
        fs::remove_file(&oldest).with_context(|| format!("removing {}", oldest.display()))?;
    }
    for n in (1..cfg.backup_count).rev() {
        let from = cfg.backup_path(n);
        if from.exists() {
            fs::rename(&from, cfg.backup_path(n + 1))
                .with_context(|| format!("shifting {}", from.display()))?;
        }
    }
    fs::rename(&current, cfg.backup_path(1))
        .with_context(|| format!("rotating {}", current.display()))?;
    Ok(true)
}

/// Open `main.log` for appending behind a background writer.
/// Lines still buffered are lost unless the guard lives until exit.
pub fn file_writer(cfg: &LogFileConfig) -> Result<(NonBlocking, WorkerGuard)> {
    fs::create_dir_all(&cfg.dir).with_context(|| format!("creating {}", cfg.dir.display()))?;
    rotate_if_oversized(cfg)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix("main")
        .filename_suffix("log")
        .build(&cfg.dir)
        .with_context(|| format!("opening {}", cfg.path().display()))?;
    Ok(tracing_appender::non_blocking(appender))
}
