//! Content-addressed, TTL-bound store of previous classifications.
//!
//! Keys depend only on the normalized text, so the same tender published by
//! two portals costs one AI call. Process-local; nothing survives a restart.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

use crate::analyze::response::Analysis;

/// SHA-256 of the lowercased, trimmed text, as 64 hex chars.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_text(text: &str) -> Self {
        let normalized = text.trim().to_lowercase();
        let digest = Sha256::digest(normalized.as_bytes());
        let mut hex = String::with_capacity(64);
        for b in digest.iter() {
            hex.push_str(&format!("{b:02x}"));
        }
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub analysis: Analysis,
    pub created_at: DateTime<Utc>,
    pub tokens: u64,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.created_at) > ttl
    }
}

#[derive(Debug)]
pub struct AnalysisCache {
    entries: HashMap<CacheKey, CacheEntry>,
    ttl: Duration,
}

impl AnalysisCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<Analysis> {
        self.get_at(key, Utc::now())
    }

    /// Lookup as of `now`. An expired entry is evicted and reported absent.
    pub fn get_at(&mut self, key: &CacheKey, now: DateTime<Utc>) -> Option<Analysis> {
        let expired = self.entries.get(key)?.is_expired(self.ttl, now);
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|e| e.analysis.clone())
    }

    pub fn put(&mut self, key: CacheKey, analysis: Analysis, tokens: u64) {
        self.put_at(key, analysis, tokens, Utc::now());
    }

    /// Insert a fresh entry; an existing one for the same key is replaced, not updated.
    pub fn put_at(&mut self, key: CacheKey, analysis: Analysis, tokens: u64, now: DateTime<Utc>) {
        let entry = CacheEntry {
            key: key.clone(),
            analysis,
            created_at: now,
            tokens,
        };
        self.entries.insert(key, entry);
    }

    pub fn entry(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
