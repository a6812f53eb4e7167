//! Shared test helpers: mock collaborators and a ready-made orchestrator.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use market_pulse_bot::providers::{NewsItem, NewsSource, Quote, QuoteSource};
use market_pulse_bot::{BotConfig, Collaborators, Notifier, Orchestrator};

#[derive(Default)]
pub struct MockQuotes {
    pub quotes: Mutex<Vec<Quote>>,
    pub fail: AtomicBool,
}

impl MockQuotes {
    pub fn set(&self, symbol: &str, price: f64, change_pct: f64) {
        let mut q = self.quotes.lock();
        q.retain(|x| x.symbol != symbol);
        q.push(Quote {
            symbol: symbol.to_string(),
            price,
            change_pct,
        });
    }
}

#[async_trait]
impl QuoteSource for MockQuotes {
    async fn get_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("quotes upstream down"));
        }
        Ok(self
            .quotes
            .lock()
            .iter()
            .filter(|q| symbols.contains(&q.symbol))
            .cloned()
            .collect())
    }
    fn name(&self) -> &'static str {
        "mock-quotes"
    }
}

#[derive(Default)]
pub struct MockNews {
    pub items: Mutex<Vec<NewsItem>>,
    pub fail: AtomicBool,
}

impl MockNews {
    pub fn push(&self, headline: &str, url: &str) {
        self.items.lock().push(news(headline, url));
    }
}

#[async_trait]
impl NewsSource for MockNews {
    async fn get_recent_news(&self) -> Result<Vec<NewsItem>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("news upstream down"));
        }
        Ok(self.items.lock().clone())
    }
    fn name(&self) -> &'static str {
        "mock-news"
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(&self, text: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("chat transport down"));
        }
        self.sent.lock().push(text.to_string());
        Ok(())
    }
    fn name(&self) -> &'static str {
        "recording"
    }
}

pub fn news(headline: &str, url: &str) -> NewsItem {
    NewsItem {
        headline: headline.to_string(),
        url: url.to_string(),
        source: "Reuters".to_string(),
        published_at: 0,
    }
}

pub struct Harness {
    pub orch: Orchestrator,
    pub stocks: Arc<MockQuotes>,
    pub crypto: Arc<MockQuotes>,
    pub news: Arc<MockNews>,
    pub notifier: Arc<RecordingNotifier>,
    pub dir: TempDir,
}

/// Default config with state in a temp dir and no partner watch list, so
/// only news-driven alerts fire unless a test opts in.
pub fn harness() -> Harness {
    harness_with(|_| {})
}

pub fn harness_with(tweak: impl FnOnce(&mut BotConfig)) -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = BotConfig {
        state_path: dir.path().join("state.json"),
        ..BotConfig::default()
    };
    config.universe.partners.clear();
    tweak(&mut config);

    let stocks = Arc::new(MockQuotes::default());
    let crypto = Arc::new(MockQuotes::default());
    let news = Arc::new(MockNews::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let deps = Collaborators {
        stocks: stocks.clone(),
        crypto: crypto.clone(),
        news: news.clone(),
        notifier: notifier.clone(),
    };
    Harness {
        orch: Orchestrator::new(config, deps),
        stocks,
        crypto,
        news,
        notifier,
        dir,
    }
}

pub fn cet() -> FixedOffset {
    FixedOffset::east_opt(3600).expect("offset")
}

/// 2025-09-06 at `h:m` local (UTC+1), as a UTC instant.
pub fn local(h: u32, m: u32) -> DateTime<Utc> {
    cet()
        .with_ymd_and_hms(2025, 9, 6, h, m, 0)
        .single()
        .expect("valid local time")
        .with_timezone(&Utc)
}
