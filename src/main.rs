//! Tender radar batch entrypoint.
//! One run: scan the configured portals, classify candidates, append new rows to the CSV store.
//!
//! See `README.md` for configuration.

use std::process::ExitCode;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::NonBlocking;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tender_radar::config::ai::DEFAULT_AI_CONFIG_PATH;
use tender_radar::config::portals::load_portals_default;
use tender_radar::config::{AiConfig, RunConfig};
use tender_radar::logging::{self, LogFileConfig};
use tender_radar::telemetry::Telemetry;
use tender_radar::{Pipeline, RunSummary};

/// `RUST_LOG` wins; otherwise `LOG_LEVEL` (default `info`). `JSON_LOGS=true` switches
/// the console to JSON lines. The run log file, when open, gets plain text.
fn init_tracing(log_file: Option<NonBlocking>) {
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tender_radar={level},warn")));

    let json = std::env::var("JSON_LOGS")
        .ok()
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));

    let file_layer = log_file.map(|w| fmt::layer().with_ansi(false).with_writer(w));
    let base = tracing_subscriber::registry().with(file_layer).with(filter);

    if json {
        base.with(fmt::layer().json()).init();
    } else {
        base.with(fmt::layer().compact()).init();
    }
}

async fn run(run_cfg: &RunConfig) -> anyhow::Result<RunSummary> {
    let portals = load_portals_default().context("loading portal configuration")?;
    let ai = AiConfig::load_or_default(DEFAULT_AI_CONFIG_PATH).context("loading AI configuration")?;
    if portals.triggers.is_empty() {
        warn!("no triggers configured, nothing can match");
    }

    let mut pipeline = Pipeline::build(run_cfg, portals, &ai)?;
    let summary = pipeline.run_once().await;

    let usage = pipeline.classifier().usage().metrics();
    info!(
        requests = usage.total_requests,
        cache_hit_rate = usage.cache_hit_rate(),
        tokens = usage.total_tokens,
        cost_usd = usage.total_cost_usd,
        "AI usage so far"
    );
    Ok(summary)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let log_cfg = LogFileConfig::from_env();
    let log_file = if log_cfg.enabled {
        Some(logging::file_writer(&log_cfg))
    } else {
        None
    };
    // The guard flushes the run log on drop; it must outlive `run`.
    let (writer, _log_guard, log_err) = match log_file {
        Some(Ok((writer, guard))) => (Some(writer), Some(guard), None),
        Some(Err(e)) => (None, None, Some(e)),
        None => (None, None, None),
    };
    init_tracing(writer);
    if let Some(e) = log_err {
        warn!(path = %log_cfg.path().display(), error = ?e, "run log unavailable, console only");
    }

    let telemetry = match Telemetry::install() {
        Ok(t) => Some(t),
        Err(e) => {
            warn!(error = ?e, "metrics recorder not installed");
            None
        }
    };

    let run_cfg = RunConfig::from_env();
    let code = match run(&run_cfg).await {
        Ok(summary) => {
            info!(?summary, "done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = ?e, "run aborted");
            ExitCode::FAILURE
        }
    };

    if let Some(t) = telemetry {
        if let Err(e) = t.write_textfile(&run_cfg.metrics_textfile) {
            warn!(path = %run_cfg.metrics_textfile.display(), error = %e, "could not write metrics textfile");
        }
    }
    code
}
