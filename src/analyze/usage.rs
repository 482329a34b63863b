// src/analyze/usage.rs
//! Running AI usage counters, persisted as JSON after every update.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayUsage {
    #[serde(default)]
    pub requests: u64,
    #[serde(default)]
    pub cache_hits: u64,
    #[serde(default)]
    pub cache_misses: u64,
    #[serde(default)]
    pub failures: u64,
    #[serde(default)]
    pub tokens: u64,
    #[serde(default)]
    pub cost_usd: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageMetrics {
    #[serde(default)]
    pub total_requests: u64,
    #[serde(default)]
    pub cache_hits: u64,
    #[serde(default)]
    pub cache_misses: u64,
    #[serde(default)]
    pub failures: u64,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub total_cost_usd: f64,
    /// Keyed by `YYYY-MM-DD` (UTC).
    #[serde(default)]
    pub daily: BTreeMap<String, DayUsage>,
}

impl UsageMetrics {
    pub fn cache_hit_rate(&self) -> f64 {
        let lookups = self.cache_hits + self.cache_misses;
        if lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / lookups as f64
        }
    }
}

/// Owns the counters and their file. `path = None` keeps everything in memory.
#[derive(Debug, Default)]
pub struct UsageTracker {
    metrics: UsageMetrics,
    path: Option<PathBuf>,
}

impl UsageTracker {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Resume from an existing metrics file. A missing or unreadable file starts at zero.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let metrics = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "usage metrics file unreadable, starting fresh");
                UsageMetrics::default()
            }),
            Err(_) => UsageMetrics::default(),
        };
        Self {
            metrics,
            path: Some(path),
        }
    }

    pub fn metrics(&self) -> &UsageMetrics {
        &self.metrics
    }

    /// Every classification attempt counts as one request: a hit, a success or a failure.
    pub fn record_hit(&mut self) {
        self.metrics.cache_hits += 1;
        self.today().cache_hits += 1;
        self.count_request();
        self.persist();
    }

    /// A completed model call (counted once, however many attempts it took).
    pub fn record_success(&mut self, tokens: u64, cost_usd: f64) {
        self.metrics.cache_misses += 1;
        self.metrics.total_tokens += tokens;
        self.metrics.total_cost_usd += cost_usd;
        let day = self.today();
        day.cache_misses += 1;
        day.tokens += tokens;
        day.cost_usd += cost_usd;
        self.count_request();
        self.persist();
    }

    /// Exhausted retries, an unusable reply, or AI not configured.
    pub fn record_failure(&mut self) {
        self.metrics.cache_misses += 1;
        self.metrics.failures += 1;
        let day = self.today();
        day.cache_misses += 1;
        day.failures += 1;
        self.count_request();
        self.persist();
    }

    fn count_request(&mut self) {
        self.metrics.total_requests += 1;
        self.today().requests += 1;
    }

    fn today(&mut self) -> &mut DayUsage {
        self.metrics
            .daily
            .entry(Utc::now().format("%Y-%m-%d").to_string())
            .or_default()
    }

    fn persist(&self) {
        let Some(path) = &self.path else { return };
        if let Err(e) = save_atomic(path, &self.metrics) {
            warn!(path = %path.display(), error = ?e, "could not save usage metrics");
        } else {
            debug!(path = %path.display(), "usage metrics saved");
        }
    }
}

fn save_atomic(path: &Path, metrics: &UsageMetrics) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    let body = serde_json::to_string_pretty(metrics)?;
    fs::write(&tmp, body).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("renaming onto {}", path.display()))?;
    Ok(())
}
