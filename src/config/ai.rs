// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-flash-latest".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_true() -> bool {
    true
}
fn default_cache_ttl_hours() -> u64 {
    24
}
fn default_cost_per_1k_tokens() -> f64 {
    0.00015
}
fn default_metrics_file() -> String {
    "logs/gemini_metrics.json".to_string()
}
fn default_max_prompt_chars() -> usize {
    10_000
}
fn default_prompts_path() -> String {
    "config/prompts.json".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// "gemini" | "mock" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from GEMINI_API_KEY. Empty after resolution disables the client.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: u64,
    #[serde(default = "default_cost_per_1k_tokens")]
    pub cost_per_1k_tokens: f64,
    #[serde(default = "default_metrics_file")]
    pub metrics_file: String,
    /// Prompt-size ceiling applied to candidate text.
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
    #[serde(default = "default_prompts_path")]
    pub prompts_path: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: default_provider(),
            model: default_model(),
            api_key: default_api_key(),
            retry_attempts: default_retry_attempts(),
            cache_enabled: true,
            cache_ttl_hours: default_cache_ttl_hours(),
            cost_per_1k_tokens: default_cost_per_1k_tokens(),
            metrics_file: default_metrics_file(),
            max_prompt_chars: default_max_prompt_chars(),
            prompts_path: default_prompts_path(),
        }
    }
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let cfg: AiConfig = serde_json::from_str(&data)?;
        Ok(cfg.finish())
    }

    /// Missing file → defaults; a file that exists but does not parse is an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if path.as_ref().exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default().finish())
        }
    }

    fn finish(mut self) -> Self {
        // Normalize provider
        self.provider = self.provider.trim().to_lowercase();

        // Resolve api key if "ENV"; a missing key is not fatal, the client is disabled instead.
        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = env::var("GEMINI_API_KEY").unwrap_or_default();
        }

        self.apply_env_overrides();

        if self.retry_attempts == 0 {
            self.retry_attempts = 1;
        }
        if !self.cost_per_1k_tokens.is_finite() || self.cost_per_1k_tokens < 0.0 {
            self.cost_per_1k_tokens = default_cost_per_1k_tokens();
        }
        self
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse::<u32>("GEMINI_RETRY_ATTEMPTS") {
            self.retry_attempts = v;
        }
        if let Ok(v) = env::var("GEMINI_ENABLE_CACHE") {
            self.cache_enabled = v.trim().eq_ignore_ascii_case("true");
        }
        if let Some(v) = env_parse::<u64>("GEMINI_CACHE_TTL_HOURS") {
            self.cache_ttl_hours = v;
        }
        if let Some(v) = env_parse::<f64>("GEMINI_COST_PER_1K_TOKENS") {
            self.cost_per_1k_tokens = v;
        }
        if let Ok(v) = env::var("GEMINI_METRICS_FILE") {
            if !v.trim().is_empty() {
                self.metrics_file = v;
            }
        }
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        // Capped at ten years (chrono panics past its range).
        chrono::Duration::hours(self.cache_ttl_hours.min(24 * 365 * 10) as i64)
    }
}

pub(crate) fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[serial_test::serial]
    #[test]
    fn defaults_and_env_resolution() {
        env::set_var("GEMINI_API_KEY", "k-123");
        env::set_var("GEMINI_RETRY_ATTEMPTS", "5");
        env::remove_var("GEMINI_ENABLE_CACHE");
        let cfg: AiConfig = serde_json::from_str(r#"{"provider":"Gemini"}"#).unwrap();
        let cfg = cfg.finish();
        assert_eq!(cfg.provider, "gemini");
        assert_eq!(cfg.api_key, "k-123");
        assert_eq!(cfg.retry_attempts, 5);
        assert!(cfg.cache_enabled);
        assert_eq!(cfg.max_prompt_chars, 10_000);
        env::remove_var("GEMINI_API_KEY");
        env::remove_var("GEMINI_RETRY_ATTEMPTS");
    }

    #[serial_test::serial]
    #[test]
    fn cache_can_be_switched_off_from_env() {
        env::set_var("GEMINI_ENABLE_CACHE", "false");
        let cfg = AiConfig::default().finish();
        assert!(!cfg.cache_enabled);
        env::remove_var("GEMINI_ENABLE_CACHE");
    }
}
