// src/portals/mod.rs
pub mod browserless;
pub mod fetch;
pub mod html;
pub mod interactive;
pub mod registry;
pub mod static_scan;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub use registry::AdapterRegistry;

/// Structured fields an adapter could read off a results table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenderFields {
    pub tender_number: Option<String>,
    pub subject: Option<String>,
    pub status: Option<String>,
    pub dates: Option<String>,
    pub budget: Option<String>,
    pub section: Option<String>,
}

/// A page or table row suspected of describing a tender, pending classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub portal: String,
    pub url: String,
    /// Triggers found in the text; never empty for a candidate an adapter emits.
    pub matched_triggers: Vec<String>,
    /// Raw text handed to the classifier (truncated there, not here).
    pub text: String,
    pub title: Option<String>,
    pub fields: Option<TenderFields>,
}

impl Candidate {
    pub fn triggers_joined(&self) -> String {
        self.matched_triggers.join(", ")
    }
}

/// One scanning strategy for one portal.
#[async_trait::async_trait]
pub trait PortalAdapter: Send + Sync {
    /// Scan the portal and return candidates matching any of `triggers`.
    /// Per-page failures are logged inside; `Err` means the whole portal failed.
    async fn search(&self, triggers: &[String]) -> Result<Vec<Candidate>>;
    fn name(&self) -> &str;
}
