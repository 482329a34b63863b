//! Scripted browser sessions.
//!
//! The browser engine itself is external; `BrowserSession` is the capability
//! an interactive adapter drives. `BrowserlessSession` runs the script on a
//! remote Browserless instance through its `/function` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Empty document returned for {0}")]
    EmptyDocument(String),
}

impl From<reqwest::Error> for BrowserError {
    fn from(err: reqwest::Error) -> Self {
        BrowserError::Network(err.to_string())
    }
}

/// navigate → (optionally) click the search control → wait → hand back the DOM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionScript {
    pub url: String,
    pub click_selector: Option<String>,
    /// Wait after navigation, before clicking.
    pub settle: Duration,
    /// Wait after clicking, for results to render.
    pub results_wait: Duration,
}

impl SessionScript {
    pub fn search_listing(url: &str, click_selector: &str) -> Self {
        let click = click_selector.trim();
        Self {
            url: url.to_string(),
            click_selector: (!click.is_empty()).then(|| click.to_string()),
            settle: Duration::from_secs(2),
            results_wait: Duration::from_secs(3),
        }
    }
}

#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Run the script and return the rendered HTML.
    async fn run(&self, script: &SessionScript) -> Result<String, BrowserError>;
}

const FUNCTION_SOURCE: &str = r#"module.exports = async ({ page, context }) => {
  await page.goto(context.url, { waitUntil: "networkidle2", timeout: context.timeoutMs });
  await new Promise((r) => setTimeout(r, context.settleMs));
  if (context.clickSelector) {
    await page.click(context.clickSelector);
    await new Promise((r) => setTimeout(r, context.resultsMs));
  }
  return { data: await page.content(), type: "text/html" };
};"#;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FunctionContext<'a> {
    url: &'a str,
    click_selector: Option<&'a str>,
    settle_ms: u64,
    results_ms: u64,
    timeout_ms: u64,
}

#[derive(Serialize)]
struct FunctionRequest<'a> {
    code: &'static str,
    context: FunctionContext<'a>,
}

pub struct BrowserlessSession {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    navigation_timeout: Duration,
}

impl BrowserlessSession {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self, BrowserError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
            navigation_timeout: Duration::from_secs(30),
        })
    }

    fn endpoint(&self) -> String {
        let mut endpoint = format!("{}/function", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }
        endpoint
    }
}

#[async_trait]
impl BrowserSession for BrowserlessSession {
    async fn run(&self, script: &SessionScript) -> Result<String, BrowserError> {
        let body = FunctionRequest {
            code: FUNCTION_SOURCE,
            context: FunctionContext {
                url: &script.url,
                click_selector: script.click_selector.as_deref(),
                settle_ms: script.settle.as_millis() as u64,
                results_ms: script.results_wait.as_millis() as u64,
                timeout_ms: self.navigation_timeout.as_millis() as u64,
            },
        };
        debug!(url = %script.url, "running browser session");

        let resp = self.client.post(self.endpoint()).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserError::Api {
                status: status.as_u16(),
                message,
            });
        }
        let html = resp.text().await?;
        if html.trim().is_empty() {
            return Err(BrowserError::EmptyDocument(script.url.clone()));
        }
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_selector_means_no_click() {
        let s = SessionScript::search_listing("https://x.test", "  ");
        assert!(s.click_selector.is_none());
        let s = SessionScript::search_listing("https://x.test", "#btnSearch");
        assert_eq!(s.click_selector.as_deref(), Some("#btnSearch"));
    }

    #[test]
    fn token_goes_into_query() {
        let s = BrowserlessSession::new("http://browserless:3000/", Some("t0k")).unwrap();
        assert_eq!(s.endpoint(), "http://browserless:3000/function?token=t0k");
    }
}
