// src/pipeline.rs
//! One batch run: scan portals, classify each candidate, record the survivors.

use std::sync::Arc;

use anyhow::{Context, Result};
use metrics::gauge;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analyze::{Analysis, ClassifyError, ResilientClassifier};
use crate::config::{AiConfig, PortalConfig, PortalsFile, RunConfig};
use crate::output::{DedupSink, PendingRow};
use crate::portals::browserless::{BrowserSession, BrowserlessSession};
use crate::portals::fetch::{HttpFetcher, PageFetcher};
use crate::portals::{AdapterRegistry, Candidate};
use crate::retry::RetryPolicy;
use crate::scan::Scanner;
use crate::telemetry::ensure_metrics_described;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub candidates: usize,
    pub classified: usize,
    pub written: usize,
    /// Rows the sink refused (invalid or duplicate).
    pub rejected: usize,
    /// Candidates the classifier could not analyse.
    pub failed: usize,
}

pub struct Pipeline {
    scanner: Scanner,
    classifier: ResilientClassifier,
    sink: DedupSink,
    portals: Vec<PortalConfig>,
    triggers: Vec<String>,
}

impl Pipeline {
    pub fn new(
        scanner: Scanner,
        classifier: ResilientClassifier,
        sink: DedupSink,
        file: PortalsFile,
    ) -> Self {
        Self {
            scanner,
            classifier,
            sink,
            portals: file.portals,
            triggers: file.triggers,
        }
    }

    /// Wire the production components: HTTP fetcher, optional Browserless
    /// session, Gemini classifier and the CSV store.
    pub fn build(run: &RunConfig, file: PortalsFile, ai: &AiConfig) -> Result<Self> {
        let policy = RetryPolicy {
            max_attempts: run.http_max_attempts,
            ..RetryPolicy::http_default()
        };
        let fetcher: Arc<dyn PageFetcher> = Arc::new(
            HttpFetcher::new(&run.user_agent, run.http_timeout, policy)
                .context("building HTTP client")?,
        );

        let session: Option<Arc<dyn BrowserSession>> = match run.browserless_url.as_deref() {
            Some(url) => {
                let s = BrowserlessSession::new(url, run.browserless_token.as_deref())
                    .context("building browser session client")?;
                Some(Arc::new(s))
            }
            None => {
                if file.portals.iter().any(|p| p.enabled && p.is_interactive()) {
                    warn!("BROWSERLESS_URL not set, interactive portals will yield nothing");
                }
                None
            }
        };

        let registry = AdapterRegistry::from_configs(&file.portals, fetcher, session);
        let scanner = Scanner::new(registry, run.portal_delay);
        let classifier = ResilientClassifier::from_config(ai);
        let sink = DedupSink::open(&run.output_csv, &run.backup_dir, run.create_backup)
            .context("opening output store")?;

        Ok(Self::new(scanner, classifier, sink, file))
    }

    pub fn classifier(&self) -> &ResilientClassifier {
        &self.classifier
    }

    pub fn sink(&self) -> &DedupSink {
        &self.sink
    }

    pub async fn run_once(&mut self) -> RunSummary {
        ensure_metrics_described();
        info!(
            portals = self.portals.len(),
            triggers = self.triggers.len(),
            "run started"
        );
        let candidates = self.scanner.scan_all(&self.portals, &self.triggers).await;
        let summary = process_candidates(&candidates, &mut self.classifier, &mut self.sink).await;
        gauge!("pipeline_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
        info!(
            candidates = summary.candidates,
            classified = summary.classified,
            written = summary.written,
            rejected = summary.rejected,
            failed = summary.failed,
            "run finished"
        );
        summary
    }
}

/// Classify and store each candidate in scan order. Disabled AI is reported
/// once per run at `warn`, later candidates at `debug`.
pub async fn process_candidates(
    candidates: &[Candidate],
    classifier: &mut ResilientClassifier,
    sink: &mut DedupSink,
) -> RunSummary {
    let mut summary = RunSummary {
        candidates: candidates.len(),
        ..RunSummary::default()
    };
    let mut disabled_reported = false;
    for c in candidates {
        let analysis = match classifier.try_classify(&c.text, &c.matched_triggers).await {
            Ok(analysis) => analysis,
            Err(ClassifyError::Disabled) => {
                if disabled_reported {
                    debug!(portal = %c.portal, url = %c.url, "AI disabled, candidate not classified");
                } else {
                    warn!(
                        portal = %c.portal,
                        url = %c.url,
                        "AI disabled (is GEMINI_API_KEY set?), candidates will not be classified"
                    );
                    disabled_reported = true;
                }
                summary.failed += 1;
                continue;
            }
            Err(e) => {
                warn!(portal = %c.portal, url = %c.url, error = %e, "candidate not classified, skipping");
                summary.failed += 1;
                continue;
            }
        };
        summary.classified += 1;
        if sink.add(&row_for(c, &analysis)) {
            summary.written += 1;
        } else {
            summary.rejected += 1;
        }
    }
    summary
}

pub fn row_for(candidate: &Candidate, analysis: &Analysis) -> PendingRow {
    PendingRow {
        portal: candidate.portal.clone(),
        url: candidate.url.clone(),
        triggers: candidate.triggers_joined(),
        category: analysis.category.clone(),
        score: Some(analysis.score),
        summary: analysis.summary.clone(),
    }
}
