// src/scan.rs
use std::time::Duration;

use metrics::counter;
use tracing::{error, info, warn};

use crate::config::PortalConfig;
use crate::portals::{AdapterRegistry, Candidate};
use crate::telemetry::ensure_metrics_described;

/// Walks the configured portals in order, one at a time.
pub struct Scanner {
    registry: AdapterRegistry,
    /// Pause between two successive enabled portals.
    delay: Duration,
}

impl Scanner {
    pub fn new(registry: AdapterRegistry, delay: Duration) -> Self {
        Self { registry, delay }
    }

    /// Scan every enabled portal and concatenate their candidates.
    ///
    /// A portal whose adapter fails (or has no adapter) is logged and skipped;
    /// the remaining portals still run. An empty result is not an error.
    pub async fn scan_all(&self, portals: &[PortalConfig], triggers: &[String]) -> Vec<Candidate> {
        ensure_metrics_described();

        let mut out = Vec::new();
        let mut first = true;
        for portal in portals {
            if !portal.enabled {
                info!(portal = %portal.name, "portal disabled, skipping");
                continue;
            }
            if !first && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            first = false;

            info!(portal = %portal.name, url = %portal.url, "scanning portal");
            counter!("scan_portals_total").increment(1);

            let Some(adapter) = self.registry.get(&portal.name) else {
                warn!(portal = %portal.name, "no adapter registered for portal");
                counter!("scan_portal_errors_total").increment(1);
                continue;
            };

            match adapter.search(triggers).await {
                Ok(found) => {
                    info!(portal = %portal.name, found = found.len(), "portal scanned");
                    counter!("scan_candidates_total").increment(found.len() as u64);
                    out.extend(found);
                }
                Err(e) => {
                    error!(portal = %portal.name, url = %portal.url, error = ?e, "portal scan failed");
                    counter!("scan_portal_errors_total").increment(1);
                }
            }
        }
        out
    }
}
