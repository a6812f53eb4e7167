// src/dedup.rs
//! News deduplication cache.
//!
//! A news provider returns a rolling window of recent items, so the same
//! article shows up on many consecutive polls. We remember the *first* time a
//! `(headline, url)` fingerprint was seen and forget it once it is older than
//! the TTL. No provider cursor is needed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default retention for seen news: 48h.
pub const DEFAULT_SEEN_NEWS_TTL_SECS: i64 = 48 * 3600;

/// Stable short identity of a news item (16 hex chars of SHA-256).
///
/// Headline and url are trimmed and joined with a newline so that
/// `("a b", "c")` and `("a", "b c")` never collide.
pub fn fingerprint(headline: &str, url: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(headline.trim().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.trim().as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// `fingerprint -> first-seen unix seconds`, persisted as part of the state blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeenNews(BTreeMap<String, i64>);

impl SeenNews {
    pub fn seen(&self, fp: &str) -> bool {
        self.0.contains_key(fp)
    }

    /// Record the first sighting. An existing entry is never moved forward,
    /// so the TTL always counts from the first poll that returned the item.
    pub fn record(&mut self, fp: &str, now: i64) {
        self.0.entry(fp.to_string()).or_insert(now);
    }

    /// Drop entries with `now - first_seen >= ttl`. Returns how many were removed.
    pub fn purge(&mut self, now: i64, ttl_secs: i64) -> usize {
        let before = self.0.len();
        self.0.retain(|_, first_seen| now.saturating_sub(*first_seen) < ttl_secs);
        before - self.0.len()
    }

    pub fn first_seen(&self, fp: &str) -> Option<i64> {
        self.0.get(fp).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_short() {
        let a = fingerprint("Apple reports record earnings", "https://example.test/a");
        let b = fingerprint("  Apple reports record earnings ", "https://example.test/a");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert_ne!(a, fingerprint("Apple reports record earnings", "https://example.test/b"));
    }

    #[test]
    fn fingerprint_separates_fields() {
        assert_ne!(fingerprint("a b", "c"), fingerprint("a", "b c"));
    }

    #[test]
    fn record_keeps_first_sighting() {
        let mut s = SeenNews::default();
        s.record("fp", 100);
        s.record("fp", 500);
        assert_eq!(s.first_seen("fp"), Some(100));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn purge_boundary_is_inclusive_of_ttl() {
        let ttl = 3600;
        let mut s = SeenNews::default();
        s.record("fp", 1_000);

        let mut kept = s.clone();
        assert_eq!(kept.purge(1_000 + ttl - 1, ttl), 0);
        assert!(kept.seen("fp"));

        assert_eq!(s.purge(1_000 + ttl, ttl), 1);
        assert!(!s.seen("fp"));
        assert!(s.is_empty());
    }
}
