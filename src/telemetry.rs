// src/telemetry.rs
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::path::Path;

/// One-time metrics registration (so series show up in the exposition even at zero).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("scan_portals_total", "Enabled portals scanned.");
        describe_counter!(
            "scan_portal_errors_total",
            "Portals whose adapter failed or was missing."
        );
        describe_counter!("scan_candidates_total", "Candidates produced by adapters.");
        describe_counter!(
            "fetch_retries_total",
            "HTTP fetch attempts that were retried after a transient failure."
        );
        describe_counter!(
            "fetch_failures_total",
            "Pages that could not be fetched after all attempts."
        );
        describe_counter!(
            "classifier_requests_total",
            "Classification attempts (hits, misses and failures)."
        );
        describe_counter!("classifier_cache_hits_total", "Analyses served from cache.");
        describe_counter!(
            "classifier_failures_total",
            "Classifications that ended without a valid analysis."
        );
        describe_counter!("sink_rows_written_total", "Rows appended to the output store.");
        describe_counter!(
            "sink_rows_rejected_total",
            "Rows rejected as invalid or duplicate."
        );
        describe_gauge!("pipeline_last_run_ts", "Unix ts when the pipeline last ran.");
    });
}

/// Prometheus recorder for a batch process: nothing scrapes us, so the
/// exposition is written to a file at the end of the run.
pub struct Telemetry {
    handle: PrometheusHandle,
}

impl Telemetry {
    pub fn install() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Write the exposition text (node_exporter textfile-collector style).
    pub fn write_textfile(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = path.with_extension("prom.tmp");
        std::fs::write(&tmp, self.render())?;
        std::fs::rename(tmp, path)
    }
}
