// src/portals/interactive.rs
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::{PortalConfig, SectionConfig};
use crate::portals::browserless::{BrowserSession, SessionScript};
use crate::portals::html::collapse_ws;
use crate::portals::{Candidate, PortalAdapter, TenderFields};
use crate::triggers::match_triggers;

/// One row of a tender results table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenderRow {
    pub status: String,
    pub number: String,
    pub subject: String,
    pub dates: String,
    pub budget: Option<String>,
    /// Absolute detail link, when the row carries one.
    pub link: Option<String>,
}

/// Parse `table tbody tr` rows laid out as
/// status | number | subject | dates | [budget]. Rows with fewer than four
/// cells are skipped.
pub fn parse_result_rows(html: &str, listing_url: &str) -> Vec<TenderRow> {
    let doc = Html::parse_document(html);
    let (Ok(row_sel), Ok(cell_sel), Ok(link_sel)) = (
        Selector::parse("table tbody tr"),
        Selector::parse("td"),
        Selector::parse("a[href]"),
    ) else {
        return Vec::new();
    };
    let base = Url::parse(listing_url).ok();

    let mut out = Vec::new();
    for row in doc.select(&row_sel) {
        let cells: Vec<String> = row.select(&cell_sel).map(cell_text).collect();
        if cells.len() < 4 {
            debug!(cells = cells.len(), "skipping short table row");
            continue;
        }
        let link = row
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| resolve(base.as_ref(), href));
        out.push(TenderRow {
            status: cells[0].clone(),
            number: cells[1].clone(),
            subject: cells[2].clone(),
            dates: cells[3].clone(),
            budget: cells.get(4).filter(|b| !b.is_empty()).cloned(),
            link,
        });
    }
    out
}

fn cell_text(cell: ElementRef<'_>) -> String {
    collapse_ws(&cell.text().collect::<Vec<_>>().join(" "))
}

fn resolve(base: Option<&Url>, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("javascript:") || href == "#" {
        return None;
    }
    match base {
        Some(b) => b.join(href).ok().map(|u| u.to_string()),
        None => Url::parse(href).ok().map(|u| u.to_string()),
    }
}

/// Drives a browser session over each listing section and turns matching
/// table rows into structured candidates.
pub struct InteractiveAdapter {
    name: String,
    sections: Vec<SectionConfig>,
    search_selector: String,
    session: Option<Arc<dyn BrowserSession>>,
}

impl InteractiveAdapter {
    pub fn new(portal: &PortalConfig, session: Option<Arc<dyn BrowserSession>>) -> Self {
        Self {
            name: portal.name.clone(),
            sections: portal.sections.clone(),
            search_selector: portal.search_selector.clone(),
            session,
        }
    }

    fn row_to_candidate(
        &self,
        row: TenderRow,
        section: &SectionConfig,
        triggers: &[String],
    ) -> Option<Candidate> {
        let descriptive = format!("{} {}", row.subject, row.number);
        let matched = match_triggers(&descriptive, triggers);
        if matched.is_empty() {
            return None;
        }
        let url = row.link.clone().unwrap_or_else(|| fallback_url(&section.url, &row.number));
        let budget = row.budget.clone().unwrap_or_else(|| "No aplica".to_string());
        let text = format!(
            "Licitación {}: {}. Estado: {}. Fechas: {}. Presupuesto: {}",
            row.number, row.subject, row.status, row.dates, budget
        );
        Some(Candidate {
            portal: self.name.clone(),
            url,
            matched_triggers: matched,
            text,
            title: Some(format!("{} - {}", row.number, row.subject)),
            fields: Some(TenderFields {
                tender_number: Some(row.number),
                subject: Some(row.subject),
                status: Some(row.status),
                dates: Some(row.dates),
                budget: row.budget,
                section: Some(section.name.clone()),
            }),
        })
    }
}

/// Rows without a detail link still need a distinct URL for deduplication.
fn fallback_url(listing: &str, number: &str) -> String {
    let number = number.trim();
    if number.is_empty() {
        return listing.to_string();
    }
    match Url::parse(listing) {
        Ok(mut u) => {
            u.set_fragment(Some(number));
            u.to_string()
        }
        Err(_) => format!("{listing}#{number}"),
    }
}

#[async_trait]
impl PortalAdapter for InteractiveAdapter {
    async fn search(&self, triggers: &[String]) -> Result<Vec<Candidate>> {
        let Some(session) = self.session.as_ref() else {
            warn!(portal = %self.name, "no browser session available, interactive scan skipped");
            return Ok(Vec::new());
        };
        if self.sections.is_empty() {
            warn!(portal = %self.name, "interactive scan not implemented for this portal yet");
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        for section in &self.sections {
            info!(portal = %self.name, section = %section.name, url = %section.url, "scanning section");
            let script = SessionScript::search_listing(&section.url, &self.search_selector);
            let html = match session.run(&script).await {
                Ok(h) => h,
                Err(e) => {
                    error!(portal = %self.name, section = %section.name, url = %section.url, error = %e, "browser session failed");
                    continue;
                }
            };
            let before = out.len();
            for row in parse_result_rows(&html, &section.url) {
                out.extend(self.row_to_candidate(row, section, triggers));
            }
            info!(
                portal = %self.name,
                section = %section.name,
                found = out.len() - before,
                "section scanned"
            );
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"<table><tbody>
        <tr><td>Abierta</td><td>LP 12/25</td><td>Provisión de hipoclorito de sodio</td><td>01/02 - 15/02</td><td>$ 1.000.000</td>
            <td><a href="/detalle?id=12">ver</a></td></tr>
        <tr><td>Abierta</td><td>CD 3/25</td><td>Servicio de limpieza</td><td>03/02</td></tr>
        <tr><td>solo</td><td>dos</td></tr>
    </tbody></table>"#;

    #[test]
    fn rows_are_parsed_and_links_resolved() {
        let rows = parse_result_rows(TABLE, "https://aysa.test/licitaciones/");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].number, "LP 12/25");
        assert_eq!(rows[0].budget.as_deref(), Some("$ 1.000.000"));
        assert_eq!(rows[0].link.as_deref(), Some("https://aysa.test/detalle?id=12"));
        assert_eq!(rows[1].link, None);
        assert_eq!(rows[1].budget, None);
    }

    #[test]
    fn fallback_url_keeps_rows_distinct() {
        assert_eq!(
            fallback_url("https://aysa.test/licitaciones/", "CD 3/25"),
            "https://aysa.test/licitaciones/#CD%203/25"
        );
        assert_eq!(fallback_url("https://aysa.test/l/", ""), "https://aysa.test/l/");
    }
}
