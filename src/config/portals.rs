// src/config/portals.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_PORTALS_PATH: &str = "TENDER_PORTALS_PATH";
pub const DEFAULT_PORTALS_PATH: &str = "config/portals.toml";

/// How a portal is scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Plain HTTP GET of fixed pages, full-page text search.
    Static,
    /// Scripted browser session over a results table.
    Interactive,
}

/// A listing page driven through a browser session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionConfig {
    pub name: String,
    pub url: String,
}

fn default_true() -> bool {
    true
}

fn default_search_selector() -> String {
    "#btnSearch".to_string()
}

/// One procurement portal. Immutable for the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalConfig {
    pub name: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub strategy: StrategyKind,
    #[serde(default)]
    pub priority: Option<u8>,
    #[serde(default)]
    pub requires_auth: bool,
    #[serde(default)]
    pub notes: Option<String>,

    /// Static: paths appended to `url` (or absolute URLs). Empty means just `url`.
    #[serde(default)]
    pub targets: Vec<String>,
    /// Static: fetch `url` itself when every target failed.
    #[serde(default)]
    pub fallback_to_base: bool,

    /// Interactive: listing pages to open.
    #[serde(default)]
    pub sections: Vec<SectionConfig>,
    /// Interactive: CSS selector of the element that runs the search.
    #[serde(default = "default_search_selector")]
    pub search_selector: String,
}

impl PortalConfig {
    /// Minimal static portal, mostly for tests and ad-hoc runs.
    pub fn static_site(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            enabled: true,
            strategy: StrategyKind::Static,
            priority: None,
            requires_auth: false,
            notes: None,
            targets: Vec::new(),
            fallback_to_base: false,
            sections: Vec::new(),
            search_selector: default_search_selector(),
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.strategy == StrategyKind::Interactive
    }

    /// Resolve the static target list into absolute URLs.
    pub fn target_urls(&self) -> Vec<String> {
        if self.targets.is_empty() {
            return vec![self.url.clone()];
        }
        let base = self.url.trim_end_matches('/');
        self.targets
            .iter()
            .map(|t| {
                let t = t.trim();
                if t.starts_with("http://") || t.starts_with("https://") {
                    t.to_string()
                } else if t.is_empty() {
                    self.url.clone()
                } else if t.starts_with('/') {
                    format!("{base}{t}")
                } else {
                    format!("{base}/{t}")
                }
            })
            .collect()
    }
}

/// Contents of `config/portals.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortalsFile {
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub portals: Vec<PortalConfig>,
}

/// Load portals + triggers from an explicit path. TOML or JSON by extension.
pub fn load_portals_from(path: &Path) -> Result<PortalsFile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading portals from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let parsed: PortalsFile = match ext.as_str() {
        "json" => serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?,
        _ => toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?,
    };
    clean(parsed)
}

/// Load using env var + fallback:
/// 1) $TENDER_PORTALS_PATH
/// 2) config/portals.toml
pub fn load_portals_default() -> Result<PortalsFile> {
    if let Ok(p) = std::env::var(ENV_PORTALS_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            return Err(anyhow!("{ENV_PORTALS_PATH} points to non-existent path"));
        }
        return load_portals_from(&pb);
    }
    load_portals_from(Path::new(DEFAULT_PORTALS_PATH))
}

fn clean(mut file: PortalsFile) -> Result<PortalsFile> {
    let mut triggers: Vec<String> = Vec::with_capacity(file.triggers.len());
    for t in file.triggers.drain(..) {
        let t = t.trim().to_string();
        if !t.is_empty() && !triggers.contains(&t) {
            triggers.push(t);
        }
    }
    file.triggers = triggers;

    let mut seen = std::collections::HashSet::new();
    for p in &file.portals {
        if p.name.trim().is_empty() {
            bail!("portal with empty name");
        }
        if !seen.insert(p.name.to_ascii_lowercase()) {
            bail!("duplicate portal name: {}", p.name);
        }
        url::Url::parse(&p.url).with_context(|| format!("portal {}: bad url", p.name))?;
    }
    Ok(file)
}
