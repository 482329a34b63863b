// src/output/sink.rs
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use metrics::counter;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::output::backup::backup_once_per_day;
use crate::telemetry::ensure_metrics_described;

pub const HEADER: [&str; 7] = [
    "Timestamp_Deteccion",
    "Portal",
    "MIA_URL",
    "MIA_Keywords_Detectadas",
    "MIA_Rubro",
    "MIA_Score_IA",
    "MIA_Resumen_Tecnico",
];

const URL_COLUMN: &str = "MIA_URL";

/// A classified candidate on its way to the store (timestamp is added on write).
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRow {
    pub portal: String,
    pub url: String,
    /// Already joined, e.g. "licitación, provisión de".
    pub triggers: String,
    pub category: String,
    pub score: Option<f64>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("required field missing: {0}")]
    MissingField(&'static str),

    #[error("invalid URL (needs scheme and host): {0}")]
    InvalidUrl(String),

    #[error("score out of range (0-100): {0}")]
    ScoreOutOfRange(f64),

    #[error("URL already recorded: {0}")]
    Duplicate(String),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("row rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("store I/O: {0}")]
    Io(String),
}

impl From<io::Error> for SinkError {
    fn from(e: io::Error) -> Self {
        SinkError::Io(e.to_string())
    }
}

impl From<csv::Error> for SinkError {
    fn from(e: csv::Error) -> Self {
        SinkError::Io(e.to_string())
    }
}

/// Append-only CSV store that refuses rows whose URL it has already seen.
#[derive(Debug)]
pub struct DedupSink {
    path: PathBuf,
    backup_dir: PathBuf,
    create_backup: bool,
    seen: HashSet<String>,
}

impl DedupSink {
    /// Open the store and load the URLs it already contains.
    pub fn open<P: AsRef<Path>, B: AsRef<Path>>(
        path: P,
        backup_dir: B,
        create_backup: bool,
    ) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let seen = load_urls(&path)?;
        info!(path = %path.display(), urls = seen.len(), "output store opened");
        Ok(Self {
            path,
            backup_dir: backup_dir.as_ref().to_path_buf(),
            create_backup,
            seen,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// `true` when the row was written. Rejections and I/O errors are logged, never raised.
    pub fn add(&mut self, row: &PendingRow) -> bool {
        match self.try_add(row) {
            Ok(()) => true,
            Err(SinkError::Rejected(Rejection::Duplicate(url))) => {
                info!(url = %url, "duplicate URL, skipping");
                false
            }
            Err(SinkError::Rejected(r)) => {
                warn!(portal = %row.portal, url = %row.url, reason = %r, "row rejected");
                false
            }
            Err(e) => {
                error!(url = %row.url, error = %e, "could not write row");
                false
            }
        }
    }

    pub fn try_add(&mut self, row: &PendingRow) -> Result<(), SinkError> {
        self.try_add_at(row, Local::now())
    }

    pub fn try_add_at(&mut self, row: &PendingRow, now: DateTime<Local>) -> Result<(), SinkError> {
        ensure_metrics_described();
        if let Err(r) = validate(row).and_then(|()| self.check_new(&row.url)) {
            counter!("sink_rows_rejected_total").increment(1);
            return Err(r.into());
        }

        if self.create_backup {
            if let Err(e) = backup_once_per_day(&self.path, &self.backup_dir, now.date_naive()) {
                error!(error = ?e, "backup failed, writing anyway");
            }
        }

        self.append(row, now)?;
        self.seen.insert(row.url.clone());
        counter!("sink_rows_written_total").increment(1);
        info!(portal = %row.portal, url = %row.url, "row written");
        Ok(())
    }

    fn check_new(&self, url: &str) -> Result<(), Rejection> {
        if self.seen.contains(url) {
            Err(Rejection::Duplicate(url.to_string()))
        } else {
            Ok(())
        }
    }

    fn append(&self, row: &PendingRow, now: DateTime<Local>) -> Result<(), SinkError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let needs_header = fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut w = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if needs_header {
            debug!(path = %self.path.display(), "new store, writing header");
            w.write_record(HEADER)?;
        }
        let score = row.score.map(format_score).unwrap_or_default();
        w.write_record([
            now.format("%Y-%m-%d %H:%M:%S").to_string().as_str(),
            row.portal.as_str(),
            row.url.as_str(),
            row.triggers.as_str(),
            row.category.as_str(),
            score.as_str(),
            row.summary.as_str(),
        ])?;
        w.flush()?;
        Ok(())
    }
}

/// Field-level checks, in column order.
pub fn validate(row: &PendingRow) -> Result<(), Rejection> {
    if row.portal.trim().is_empty() {
        return Err(Rejection::MissingField("Portal"));
    }
    if row.url.trim().is_empty() {
        return Err(Rejection::MissingField(URL_COLUMN));
    }
    if !is_valid_url(&row.url) {
        return Err(Rejection::InvalidUrl(row.url.clone()));
    }
    if row.category.trim().is_empty() {
        return Err(Rejection::MissingField("MIA_Rubro"));
    }
    let score = row.score.ok_or(Rejection::MissingField("MIA_Score_IA"))?;
    // The integer part is what must fall in 0..=100; 100.5 and -0.5 pass.
    if !score.is_finite() || !(0.0..=100.0).contains(&score.trunc()) {
        return Err(Rejection::ScoreOutOfRange(score));
    }
    Ok(())
}

fn is_valid_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(u) => u.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}

fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{}", score as i64)
    } else {
        format!("{score}")
    }
}

fn load_urls(path: &Path) -> anyhow::Result<HashSet<String>> {
    let mut seen = HashSet::new();
    let file = match fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(seen),
        Err(e) => return Err(anyhow::anyhow!("opening {}: {e}", path.display())),
    };
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(file);
    let Some(col) = rdr.headers()?.iter().position(|h| h == URL_COLUMN) else {
        warn!(path = %path.display(), "store has no MIA_URL column, dedup starts empty");
        return Ok(seen);
    };
    for record in rdr.records() {
        match record {
            Ok(rec) => {
                if let Some(url) = rec.get(col).filter(|u| !u.is_empty()) {
                    seen.insert(url.to_string());
                }
            }
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable row"),
        }
    }
    Ok(seen)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(url: &str) -> PendingRow {
        PendingRow {
            portal: "comprar.gob.ar".into(),
            url: url.into(),
            triggers: "licitación".into(),
            category: "Purificación".into(),
            score: Some(80.0),
            summary: "Planta potabilizadora.".into(),
        }
    }

    #[test]
    fn validation_rules() {
        assert!(validate(&row("https://comprar.gob.ar/x")).is_ok());
        assert_eq!(
            validate(&row("comprar.gob.ar/x")),
            Err(Rejection::InvalidUrl("comprar.gob.ar/x".into()))
        );
        let mut r = row("https://a.test/");
        r.score = Some(101.0);
        assert_eq!(validate(&r), Err(Rejection::ScoreOutOfRange(101.0)));
        r.score = Some(f64::NAN);
        assert!(matches!(validate(&r), Err(Rejection::ScoreOutOfRange(_))));
        r.score = None;
        assert_eq!(validate(&r), Err(Rejection::MissingField("MIA_Score_IA")));
        r.score = Some(0.0);
        r.category = " ".into();
        assert_eq!(validate(&r), Err(Rejection::MissingField("MIA_Rubro")));
    }

    #[test]
    fn score_range_applies_to_the_integer_part() {
        let mut r = row("https://a.test/");
        for ok in [100.5, -0.5, 0.0, 100.0] {
            r.score = Some(ok);
            assert!(validate(&r).is_ok(), "{ok} should pass");
        }
        for bad in [-1.0, -1.5, 101.0, 150.0] {
            r.score = Some(bad);
            assert_eq!(validate(&r), Err(Rejection::ScoreOutOfRange(bad)));
        }
    }

    #[test]
    fn scores_render_without_trailing_zero() {
        assert_eq!(format_score(80.0), "80");
        assert_eq!(format_score(65.5), "65.5");
    }
}
