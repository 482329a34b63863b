// src/portals/static_scan.rs
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;
use tracing::{info, warn};

use crate::config::PortalConfig;
use crate::portals::fetch::{FetchError, PageFetcher};
use crate::portals::html;
use crate::portals::{Candidate, PortalAdapter};
use crate::triggers::match_triggers;

/// Fetches a fixed list of pages and keeps those whose visible text
/// contains at least one trigger. One candidate per page.
pub struct StaticScanAdapter {
    name: String,
    base_url: String,
    targets: Vec<String>,
    fallback_to_base: bool,
    fetcher: Arc<dyn PageFetcher>,
}

impl StaticScanAdapter {
    pub fn new(portal: &PortalConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            name: portal.name.clone(),
            base_url: portal.url.clone(),
            targets: portal.target_urls(),
            fallback_to_base: portal.fallback_to_base,
            fetcher,
        }
    }

    fn page_to_candidate(&self, url: &str, body: &str, triggers: &[String]) -> Option<Candidate> {
        let text = html::visible_text(body);
        let matched = match_triggers(&text, triggers);
        if matched.is_empty() {
            info!(portal = %self.name, url, "no trigger phrases on page");
            return None;
        }
        info!(
            portal = %self.name,
            url,
            triggers = %matched.join(", "),
            "opportunity detected"
        );
        Some(Candidate {
            portal: self.name.clone(),
            url: url.to_string(),
            matched_triggers: matched,
            text,
            title: html::title(body),
            fields: None,
        })
    }
}

#[async_trait]
impl PortalAdapter for StaticScanAdapter {
    async fn search(&self, triggers: &[String]) -> Result<Vec<Candidate>> {
        let mut out = Vec::new();
        let mut fetched_any = false;

        for url in &self.targets {
            match self.fetcher.fetch(url).await {
                Ok(body) => {
                    fetched_any = true;
                    out.extend(self.page_to_candidate(url, &body, triggers));
                }
                Err(e) => log_fetch_error(&self.name, url, &e),
            }
        }

        let base_already_tried = self.targets.iter().any(|t| t == &self.base_url);
        if !fetched_any && self.fallback_to_base && !base_already_tried {
            info!(portal = %self.name, url = %self.base_url, "all targets failed, trying base url");
            match self.fetcher.fetch(&self.base_url).await {
                Ok(body) => out.extend(self.page_to_candidate(&self.base_url, &body, triggers)),
                Err(e) => log_fetch_error(&self.name, &self.base_url, &e),
            }
        }

        Ok(out)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn log_fetch_error(portal: &str, url: &str, err: &FetchError) {
    counter!("fetch_failures_total").increment(1);
    match err {
        FetchError::Status { status, message } if *status >= 500 => {
            tracing::error!(portal, url, status, message, "server error, page skipped")
        }
        FetchError::Status { status, message } => {
            warn!(portal, url, status, message, "client error, page skipped")
        }
        FetchError::Connect(_) | FetchError::Timeout(_) => {
            warn!(portal, url, error = %err, "could not reach page after retries")
        }
        FetchError::Other(_) => tracing::error!(portal, url, error = %err, "unexpected fetch error"),
    }
}
