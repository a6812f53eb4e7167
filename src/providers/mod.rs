// src/providers/mod.rs
//! Upstream collaborators: quote sources, news sources, and their shared types.

pub mod coingecko;
pub mod rss;
pub mod yahoo;

use anyhow::Result;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Latest quote for one symbol. `change_pct` is intraday for stocks and 24h for crypto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub change_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub headline: String,
    pub url: String,
    pub source: String,
    /// unix seconds, 0 when the feed did not say
    #[serde(default)]
    pub published_at: i64,
}

/// May return fewer quotes than asked for; a missing symbol means "no data".
#[async_trait::async_trait]
pub trait QuoteSource: Send + Sync {
    async fn get_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>>;
    fn name(&self) -> &'static str;
}

/// Rolling window of recent items, no ordering or cursor guarantees.
#[async_trait::async_trait]
pub trait NewsSource: Send + Sync {
    async fn get_recent_news(&self) -> Result<Vec<NewsItem>>;
    fn name(&self) -> &'static str;
}

/// Normalize feed text: decode entities, strip tags, unify quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("static regex"));
    out = re_tags.replace_all(&out, "").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("static regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // Headlines are short; anything longer is a scraped body.
    if out.chars().count() > 500 {
        out = out.chars().take(500).collect();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_strips_markup_and_ws() {
        let s = "  <b>Apple&nbsp;&nbsp;reports</b>   &ldquo;record&rdquo; earnings ";
        assert_eq!(normalize_text(s), r#"Apple reports "record" earnings"#);
    }

    #[test]
    fn normalize_text_caps_length() {
        let long = "x".repeat(2_000);
        assert_eq!(normalize_text(&long).chars().count(), 500);
    }
}
