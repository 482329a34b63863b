//! AI adapter: provider abstraction for the text-in / text-out model call.
//! Caching, retries and validation live in the classifier, not here.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AiConfig;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Raw model output plus the token usage the provider reported, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiReply {
    pub text: String,
    pub tokens: Option<u64>,
}

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI provider disabled (no API key or disabled in config)")]
    Disabled,

    #[error("network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("provider returned no text")]
    EmptyResponse,

    #[error("unexpected provider payload: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        AiError::Network(err.to_string())
    }
}

/// Low-level provider: does the remote call and nothing else.
pub trait AiProvider: Send + Sync {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<AiReply, AiError>> + Send + 'a>>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type DynAiProvider = Arc<dyn AiProvider>;

/// Factory: build a provider according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns a deterministic mock provider.
/// * Else if `config.enabled == false` or there is no API key, returns a disabled provider.
/// * Else builds the Gemini provider.
pub fn build_provider(config: &AiConfig) -> DynAiProvider {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
        || config.provider == "mock"
    {
        return Arc::new(MockProvider::new(MOCK_ANALYSIS));
    }

    if !config.enabled {
        return Arc::new(DisabledProvider);
    }

    match config.provider.as_str() {
        "gemini" if !config.api_key.trim().is_empty() => {
            match GeminiProvider::new(&config.api_key, &config.model) {
                Ok(p) => Arc::new(p),
                Err(e) => {
                    tracing::error!(error = %e, "could not build Gemini client, AI disabled");
                    Arc::new(DisabledProvider)
                }
            }
        }
        "gemini" => {
            tracing::warn!("GEMINI_API_KEY not set, AI classification disabled");
            Arc::new(DisabledProvider)
        }
        other => {
            tracing::warn!(provider = other, "unsupported AI provider, AI classification disabled");
            Arc::new(DisabledProvider)
        }
    }
}

// ------------------------------------------------------------
// Concrete providers
// ------------------------------------------------------------

/// Google Gemini `generateContent` REST API.
pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiProvider {
    pub fn new(api_key: &str, model: &str) -> Result<Self, AiError> {
        let http = reqwest::Client::builder()
            .user_agent("tender-radar/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            model: model.to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        })
    }

    /// Point at a different API root (proxies, test servers).
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}
#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}
#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<RespCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}
#[derive(Deserialize)]
struct RespCandidate {
    content: Option<RespContent>,
}
#[derive(Deserialize)]
struct RespContent {
    #[serde(default)]
    parts: Vec<RespPart>,
}
#[derive(Deserialize)]
struct RespPart {
    #[serde(default)]
    text: String,
}
#[derive(Deserialize)]
struct UsageMetadata {
    #[serde(rename = "totalTokenCount")]
    total_token_count: Option<u64>,
}

impl AiProvider for GeminiProvider {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<AiReply, AiError>> + Send + 'a>> {
        Box::pin(async move {
            let req = GenerateRequest {
                contents: vec![Content {
                    parts: vec![Part { text: prompt }],
                }],
            };

            let resp = self
                .http
                .post(self.url())
                .header("x-goog-api-key", &self.api_key)
                .json(&req)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let message = resp.text().await.unwrap_or_default();
                return Err(AiError::Api {
                    status: status.as_u16(),
                    message,
                });
            }
            let body: GenerateResponse = resp
                .json()
                .await
                .map_err(|e| AiError::Decode(e.to_string()))?;

            let text: String = body
                .candidates
                .first()
                .and_then(|c| c.content.as_ref())
                .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect())
                .unwrap_or_default();
            if text.trim().is_empty() {
                return Err(AiError::EmptyResponse);
            }
            Ok(AiReply {
                text,
                tokens: body.usage_metadata.and_then(|u| u.total_token_count),
            })
        })
    }
    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// Always fails with `AiError::Disabled`; used when AI is not configured.
pub struct DisabledProvider;

impl AiProvider for DisabledProvider {
    fn generate<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<AiReply, AiError>> + Send + 'a>> {
        Box::pin(async { Err(AiError::Disabled) })
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

const MOCK_ANALYSIS: &str = r#"```json
{"MIA_Rubro":"Purificación","MIA_Score_IA":50,"MIA_Resumen_Tecnico":"Respuesta simulada (mock)."}
```"#;

/// Simple mock provider for tests/local runs.
#[derive(Clone)]
pub struct MockProvider {
    pub fixed: String,
}

impl MockProvider {
    pub fn new(fixed: &str) -> Self {
        Self {
            fixed: fixed.to_string(),
        }
    }
}

impl AiProvider for MockProvider {
    fn generate<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<AiReply, AiError>> + Send + 'a>> {
        let out = self.fixed.clone();
        Box::pin(async move {
            Ok(AiReply {
                text: out,
                tokens: None,
            })
        })
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}
