// src/analyze/classifier.rs
use metrics::counter;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::analyze::ai_adapter::{build_provider, AiError, DynAiProvider};
use crate::analyze::cache::{AnalysisCache, CacheKey};
use crate::analyze::prompt::PromptTemplate;
use crate::analyze::response::{parse_analysis, Analysis, ResponseError};
use crate::analyze::usage::UsageTracker;
use crate::config::AiConfig;
use crate::retry::RetryPolicy;
use crate::telemetry::ensure_metrics_described;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("AI classification disabled")]
    Disabled,

    #[error("AI call failed after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: AiError },

    #[error("model reply could not be parsed: {0}")]
    Malformed(ResponseError),

    #[error("model reply failed validation: {0}")]
    Invalid(ResponseError),
}

/// Cache-first, retrying, validating wrapper around an [`AiProvider`](crate::analyze::ai_adapter::AiProvider).
pub struct ResilientClassifier {
    provider: DynAiProvider,
    prompt: PromptTemplate,
    cache: AnalysisCache,
    usage: UsageTracker,
    retry: RetryPolicy,
    max_chars: usize,
    cache_enabled: bool,
    cost_per_1k: f64,
}

impl ResilientClassifier {
    /// Defaults: in-memory usage, 24h cache, 3 attempts with 1s/2s/4s backoff.
    pub fn new(provider: DynAiProvider, prompt: PromptTemplate) -> Self {
        let defaults = AiConfig::default();
        Self {
            provider,
            prompt,
            cache: AnalysisCache::new(defaults.cache_ttl()),
            usage: UsageTracker::in_memory(),
            retry: RetryPolicy::ai_default(defaults.retry_attempts),
            max_chars: defaults.max_prompt_chars,
            cache_enabled: defaults.cache_enabled,
            cost_per_1k: defaults.cost_per_1k_tokens,
        }
    }

    /// Wire provider, prompt file, cache and usage file from config.
    pub fn from_config(config: &AiConfig) -> Self {
        let provider = build_provider(config);
        info!(
            provider = provider.name(),
            model = %config.model,
            cache = config.cache_enabled,
            ttl_h = config.cache_ttl_hours,
            "classifier ready"
        );
        Self {
            provider,
            prompt: PromptTemplate::load_or_default(&config.prompts_path),
            cache: AnalysisCache::new(config.cache_ttl()),
            usage: UsageTracker::load(&config.metrics_file),
            retry: RetryPolicy::ai_default(config.retry_attempts),
            max_chars: config.max_prompt_chars,
            cache_enabled: config.cache_enabled,
            cost_per_1k: config.cost_per_1k_tokens,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cache(mut self, cache: AnalysisCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn with_usage(mut self, usage: UsageTracker) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    pub fn with_cost_per_1k(mut self, cost: f64) -> Self {
        self.cost_per_1k = cost;
        self
    }

    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Classify a candidate; every failure collapses to `None` (already logged).
    pub async fn classify(&mut self, text: &str, triggers: &[String]) -> Option<Analysis> {
        self.try_classify(text, triggers).await.ok()
    }

    pub async fn try_classify(
        &mut self,
        text: &str,
        triggers: &[String],
    ) -> Result<Analysis, ClassifyError> {
        ensure_metrics_described();
        counter!("classifier_requests_total").increment(1);

        let key = CacheKey::for_text(text);
        if self.cache_enabled {
            if let Some(hit) = self.cache.get(&key) {
                debug!(key = %key, "analysis cache hit");
                counter!("classifier_cache_hits_total").increment(1);
                self.usage.record_hit();
                return Ok(hit);
            }
        }

        let prompt = self.prompt.render(text, triggers, self.max_chars);
        let result = self.call_and_parse(&prompt).await;

        match result {
            Ok((analysis, tokens)) => {
                let cost = tokens as f64 / 1000.0 * self.cost_per_1k;
                self.usage.record_success(tokens, cost);
                if self.cache_enabled {
                    self.cache.put(key, analysis.clone(), tokens);
                }
                info!(
                    category = %analysis.category,
                    score = analysis.score,
                    tokens,
                    cost_usd = cost,
                    "candidate classified"
                );
                Ok(analysis)
            }
            Err(ClassifyError::Disabled) => {
                debug!("AI disabled, candidate not classified");
                counter!("classifier_failures_total").increment(1);
                self.usage.record_failure();
                Err(ClassifyError::Disabled)
            }
            Err(e) => {
                error!(error = %e, "classification failed");
                counter!("classifier_failures_total").increment(1);
                self.usage.record_failure();
                Err(e)
            }
        }
    }

    /// Retry the provider call, then parse once. Parse and validation errors are not retried.
    async fn call_and_parse(&self, prompt: &str) -> Result<(Analysis, u64), ClassifyError> {
        let attempts = self.retry.attempts();
        let mut attempt = 0;
        let reply = loop {
            attempt += 1;
            match self.provider.generate(prompt).await {
                Ok(reply) => break reply,
                Err(AiError::Disabled) => return Err(ClassifyError::Disabled),
                Err(e) if attempt >= attempts => {
                    return Err(ClassifyError::Exhausted { attempts, last: e });
                }
                Err(e) => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        provider = self.provider.name(),
                        attempt,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "AI call failed, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        };

        let tokens = reply
            .tokens
            .unwrap_or_else(|| estimate_tokens(prompt, &reply.text));
        let analysis = parse_analysis(&reply.text).map_err(|e| {
            if e.is_parse_failure() {
                ClassifyError::Malformed(e)
            } else {
                ClassifyError::Invalid(e)
            }
        })?;
        Ok((analysis, tokens))
    }
}

/// Rough token count when the provider reports none: one token per four characters.
pub fn estimate_tokens(prompt: &str, response: &str) -> u64 {
    let chars = (prompt.chars().count() + response.chars().count()) as u64;
    chars.div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::ai_adapter::MockProvider;
    use std::sync::Arc;

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens("abcd", ""), 1);
        assert_eq!(estimate_tokens("abcd", "e"), 2);
        assert_eq!(estimate_tokens("", ""), 0);
    }

    #[tokio::test]
    async fn invalid_reply_is_not_cached() {
        let provider = Arc::new(MockProvider::new(r#"{"MIA_Rubro":"r","MIA_Score_IA":1}"#));
        let mut c = ResilientClassifier::new(provider, PromptTemplate::default())
            .with_retry(RetryPolicy::immediate(3));
        let err = c.try_classify("texto", &[]).await.unwrap_err();
        assert!(matches!(err, ClassifyError::Invalid(ResponseError::MissingField(_))));
        assert!(c.cache().is_empty());
        assert_eq!(c.usage().metrics().failures, 1);
    }
}
