// src/providers/rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use super::{normalize_text, NewsItem, NewsSource};
use crate::fetch::FetchClient;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    source: Option<ItemSource>,
}
/// `<source url="...">Name</source>`
#[derive(Debug, Deserialize)]
struct ItemSource {
    #[serde(rename = "$text", default)]
    name: Option<String>,
}

fn parse_rfc2822_to_unix(ts: &str) -> i64 {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .map(|dt| dt.unix_timestamp())
        .unwrap_or(0)
}

/// Some feeds ship HTML entities that are not valid XML.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

/// Parse one RSS 2.0 document. Items without a title or link are kept with
/// empty fields; the pipeline treats them as malformed and skips them.
pub fn parse_feed(xml: &str, feed_name: &str) -> Result<Vec<NewsItem>> {
    let rss: Rss = from_str(&scrub_html_entities_for_xml(xml)).context("parsing rss xml")?;
    Ok(rss
        .channel
        .item
        .into_iter()
        .map(|it| NewsItem {
            headline: normalize_text(it.title.as_deref().unwrap_or_default()),
            url: it.link.unwrap_or_default().trim().to_string(),
            source: it
                .source
                .and_then(|s| s.name)
                .map(|s| normalize_text(&s))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| feed_name.to_string()),
            published_at: it.pub_date.as_deref().map(parse_rfc2822_to_unix).unwrap_or(0),
        })
        .collect())
}

/// News from a list of RSS feeds. Any feed failing after retries fails the
/// whole fetch, so callers never mistake an outage for a quiet news day.
pub struct RssNews {
    client: FetchClient,
    feeds: Vec<String>,
}

impl RssNews {
    pub fn new(client: FetchClient, feeds: Vec<String>) -> Self {
        Self { client, feeds }
    }
}

#[async_trait]
impl NewsSource for RssNews {
    async fn get_recent_news(&self) -> Result<Vec<NewsItem>> {
        let mut out = Vec::new();
        for feed in &self.feeds {
            let body = self.client.get_text("rss", feed).await?;
            let items = parse_feed(&body, "rss").with_context(|| format!("feed {feed}"))?;
            tracing::debug!(target: "fetch", %feed, items = items.len(), "rss feed fetched");
            out.extend(items);
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Markets</title>
<item>
  <title>Apple reports &ldquo;record&rdquo; earnings</title>
  <link>https://example.test/apple</link>
  <pubDate>Sat, 06 Sep 2025 09:00:00 +0000</pubDate>
  <source url="https://example.test">Reuters</source>
</item>
<item>
  <title>Bitcoin slides</title>
  <link>https://example.test/btc</link>
</item>
</channel></rss>"#;

    #[test]
    fn parses_items_and_normalizes_titles() {
        let items = parse_feed(FEED, "rss").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].headline, r#"Apple reports "record" earnings"#);
        assert_eq!(items[0].url, "https://example.test/apple");
        assert_eq!(items[0].source, "Reuters");
        assert_eq!(items[0].published_at, 1_757_149_200);
        assert_eq!(items[1].source, "rss");
        assert_eq!(items[1].published_at, 0);
    }

    #[test]
    fn empty_channel_is_ok() {
        let xml = r#"<rss><channel><title>x</title></channel></rss>"#;
        assert!(parse_feed(xml, "rss").unwrap().is_empty());
    }
}
