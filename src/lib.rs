// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod logging;
pub mod retry;
pub mod telemetry;
pub mod triggers;

// Scanning: adapters, registry and the orchestrator
pub mod portals;
pub mod scan;

// Classification and output
pub mod analyze;
pub mod output;

pub mod pipeline;

// ---- Re-exports for stable public API ----
pub use crate::analyze::{Analysis, ResilientClassifier};
pub use crate::output::{DedupSink, PendingRow};
pub use crate::pipeline::{Pipeline, RunSummary};
pub use crate::portals::{Candidate, PortalAdapter};
pub use crate::scan::Scanner;
pub use crate::triggers::match_triggers;
