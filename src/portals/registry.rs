// src/portals/registry.rs
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{PortalConfig, StrategyKind};
use crate::portals::browserless::BrowserSession;
use crate::portals::fetch::PageFetcher;
use crate::portals::interactive::InteractiveAdapter;
use crate::portals::static_scan::StaticScanAdapter;
use crate::portals::PortalAdapter;

/// Adapters keyed by portal name (case-insensitive).
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Box<dyn PortalAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one adapter per configured portal, choosing the variant from
    /// its strategy. Disabled portals get an adapter too; the scanner skips them.
    pub fn from_configs(
        portals: &[PortalConfig],
        fetcher: Arc<dyn PageFetcher>,
        session: Option<Arc<dyn BrowserSession>>,
    ) -> Self {
        let mut reg = Self::new();
        for p in portals {
            let adapter: Box<dyn PortalAdapter> = match p.strategy {
                StrategyKind::Static => Box::new(StaticScanAdapter::new(p, fetcher.clone())),
                StrategyKind::Interactive => {
                    if p.requires_auth {
                        warn!(portal = %p.name, "portal may require authentication");
                    }
                    Box::new(InteractiveAdapter::new(p, session.clone()))
                }
            };
            info!(portal = %p.name, strategy = ?p.strategy, "adapter registered");
            reg.register(&p.name, adapter);
        }
        reg
    }

    /// Add or replace the adapter for `portal`.
    pub fn register(&mut self, portal: &str, adapter: Box<dyn PortalAdapter>) {
        self.adapters.insert(portal.to_ascii_lowercase(), adapter);
    }

    pub fn get(&self, portal: &str) -> Option<&dyn PortalAdapter> {
        self.adapters
            .get(&portal.to_ascii_lowercase())
            .map(|a| a.as_ref())
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
