// src/config/mod.rs
pub mod ai;
pub mod portals;

pub use ai::AiConfig;
pub use portals::{PortalConfig, PortalsFile, SectionConfig, StrategyKind};

use ai::env_parse;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Scan + output tunables, read from the environment with defaults.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub http_timeout: Duration,
    pub http_max_attempts: u32,
    /// Pause between two successive enabled portals.
    pub portal_delay: Duration,
    pub user_agent: String,
    pub output_csv: PathBuf,
    pub create_backup: bool,
    pub backup_dir: PathBuf,
    /// Base URL of a Browserless instance; interactive portals need it.
    pub browserless_url: Option<String>,
    pub browserless_token: Option<String>,
    pub metrics_textfile: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(15),
            http_max_attempts: 3,
            portal_delay: Duration::from_secs(2),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            output_csv: PathBuf::from("results_stage1.csv"),
            create_backup: true,
            backup_dir: PathBuf::from("backups"),
            browserless_url: None,
            browserless_token: None,
            metrics_textfile: PathBuf::from("logs/metrics.prom"),
        }
    }
}

impl RunConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = env_parse::<u64>("SCRAPER_TIMEOUT") {
            cfg.http_timeout = Duration::from_secs(v.max(1));
        }
        if let Some(v) = env_parse::<u32>("SCRAPER_MAX_RETRIES") {
            cfg.http_max_attempts = v.max(1);
        }
        if let Some(v) = env_parse::<f64>("SCRAPER_DELAY_SECONDS") {
            if v.is_finite() && v >= 0.0 {
                cfg.portal_delay = Duration::from_secs_f64(v);
            }
        }
        if let Some(v) = non_empty_var("SCRAPER_USER_AGENT") {
            cfg.user_agent = v;
        }
        if let Some(v) = non_empty_var("OUTPUT_CSV_FILE") {
            cfg.output_csv = PathBuf::from(v);
        }
        if let Ok(v) = env::var("OUTPUT_CREATE_BACKUP") {
            cfg.create_backup = v.trim().eq_ignore_ascii_case("true");
        }
        if let Some(v) = non_empty_var("OUTPUT_BACKUP_DIR") {
            cfg.backup_dir = PathBuf::from(v);
        }
        cfg.browserless_url = non_empty_var("BROWSERLESS_URL");
        cfg.browserless_token = non_empty_var("BROWSERLESS_TOKEN");
        if let Some(v) = non_empty_var("METRICS_TEXTFILE") {
            cfg.metrics_textfile = PathBuf::from(v);
        }
        cfg
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
