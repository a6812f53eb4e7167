// src/orchestrator.rs
//! # Alert Orchestrator
//! One call per process run: load state, fetch quotes and news, push every
//! news item through the filter chain, probe partner moves, fire due
//! reports, then save state once.
//!
//! Filter chain per item (each stage short-circuits):
//! rumor → already seen → mention → *record fingerprint* → quote present →
//! significant → cooldown → emit + mark cooldown.
//!
//! Overlapping runs are not serialized: two invocations racing on the same
//! state file may both pass a cooldown check before either writes back.
//! With cooldowns in hours and polls in minutes this is an accepted risk.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use metrics::{counter, gauge};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::BotConfig;
use crate::cooldown::{alert_key, AlertKind};
use crate::dedup::fingerprint;
use crate::fetch::FetchClient;
use crate::notify::{DynNotifier, Notifier};
use crate::providers::coingecko::CoinGeckoQuotes;
use crate::providers::rss::RssNews;
use crate::providers::yahoo::YahooQuotes;
use crate::providers::{NewsItem, NewsSource, QuoteSource};
use crate::report::{self, QuoteBook, ReportSections};
use crate::rumor::is_rumor;
use crate::state::{PersistedState, StateStore};
use crate::telemetry::ensure_metrics_described;

/// Why a run was started. Scheduled runs honour the report windows and
/// run markers; manual runs send every report and leave markers alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMode {
    Scheduled,
    Manual,
}

impl TriggerMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scheduled" | "schedule" | "cron" => Some(TriggerMode::Scheduled),
            "manual" | "workflow_dispatch" => Some(TriggerMode::Manual),
            _ => None,
        }
    }

    /// `$TRIGGER_MODE` if it parses, else `$GITHUB_EVENT_NAME`, else scheduled.
    pub fn from_env() -> Self {
        std::env::var("TRIGGER_MODE")
            .ok()
            .and_then(|v| Self::parse(&v))
            .or_else(|| {
                std::env::var("GITHUB_EVENT_NAME")
                    .ok()
                    .filter(|v| v == "workflow_dispatch")
                    .map(|_| TriggerMode::Manual)
            })
            .unwrap_or(TriggerMode::Scheduled)
    }
}

/// The I/O adapters the engine talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub stocks: Arc<dyn QuoteSource>,
    pub crypto: Arc<dyn QuoteSource>,
    pub news: Arc<dyn NewsSource>,
    pub notifier: DynNotifier,
}

impl Collaborators {
    /// Real upstreams (Yahoo, CoinGecko, RSS) sharing one retrying client.
    pub fn from_config(config: &BotConfig, notifier: DynNotifier) -> Result<Self> {
        let client = FetchClient::new(config.fetch).context("building http client")?;
        Ok(Self {
            stocks: Arc::new(YahooQuotes::new(client.clone())),
            crypto: Arc::new(CoinGeckoQuotes::new(
                client.clone(),
                config.universe.crypto_provider_ids(),
            )),
            news: Arc::new(RssNews::new(client, config.news.feeds.clone())),
            notifier,
        })
    }
}

/// Reason a news item produced no alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Skip {
    Rumor,
    AlreadySeen,
    NoMention,
    NoQuote,
    NotSignificant,
    CoolingDown,
    Malformed,
}

impl Skip {
    pub fn as_str(self) -> &'static str {
        match self {
            Skip::Rumor => "rumor",
            Skip::AlreadySeen => "already_seen",
            Skip::NoMention => "no_mention",
            Skip::NoQuote => "no_quote",
            Skip::NotSignificant => "not_significant",
            Skip::CoolingDown => "cooling_down",
            Skip::Malformed => "malformed",
        }
    }
}

/// An alert that passed every gate and is ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub kind: AlertKind,
    pub key: String,
    pub symbol: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NewsDecision {
    Skip(Skip),
    Alert(Alert),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub news_items: usize,
    pub alerts_sent: Vec<String>,
    pub reports_sent: Vec<crate::schedule::ReportKind>,
    pub skipped: BTreeMap<Skip, usize>,
    pub send_failures: usize,
    pub purged_news: usize,
}

impl RunSummary {
    fn skip(&mut self, reason: Skip) {
        *self.skipped.entry(reason).or_default() += 1;
        counter!("news_skipped_total", "reason" => reason.as_str()).increment(1);
    }

    pub fn skipped(&self, reason: Skip) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }
}

pub struct Orchestrator {
    config: BotConfig,
    deps: Collaborators,
    store: StateStore,
}

impl Orchestrator {
    pub fn new(config: BotConfig, deps: Collaborators) -> Self {
        let store = StateStore::new(config.state_path.clone());
        Self {
            config,
            deps,
            store,
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Full run: load, process, housekeeping, save. State is saved even
    /// when the pipeline fails part-way, so dedup and cooldown marks made
    /// before the failure survive.
    pub async fn run(&self, mode: TriggerMode, now: DateTime<Utc>) -> Result<RunSummary> {
        ensure_metrics_described();
        let mut state = self.store.load().await;
        let ts = now.timestamp();

        let result = self.run_with_state(&mut state, mode, now).await;

        // Purge exactly once, after every dedup decision of this run.
        let purged = state.seen_news.purge(ts, self.config.seen_news_ttl_secs);
        if let Ok(local) = self.config.schedule.local_now(now) {
            state
                .last_run_marker
                .prune(local.date_naive(), self.config.schedule.marker_retention_days);
        }

        if let Err(e) = self.store.save(&state).await {
            counter!("state_save_errors_total").increment(1);
            tracing::error!(target: "state", error = ?e, "state save failed; dedup/cooldown marks of this run are lost");
        }
        gauge!("pipeline_last_run_ts").set(ts as f64);

        let mut summary = result?;
        summary.purged_news = purged;
        Ok(summary)
    }

    /// The pipeline against an already loaded state. No housekeeping, no save.
    pub async fn run_with_state(
        &self,
        state: &mut PersistedState,
        mode: TriggerMode,
        now: DateTime<Utc>,
    ) -> Result<RunSummary> {
        let local_now = self.config.schedule.local_now(now)?;
        let ts = now.timestamp();

        let (book, news) = self.fetch_inputs().await?;

        let mut summary = RunSummary {
            news_items: news.len(),
            ..RunSummary::default()
        };
        counter!("news_items_total").increment(news.len() as u64);

        self.process_news(state, &news, &book, ts, &mut summary).await;
        self.probe_partners(state, &book, ts, &mut summary).await;
        self.run_reports(state, mode, local_now, &book, &mut summary)
            .await;

        if mode == TriggerMode::Manual {
            let text = report::heartbeat_text(
                summary.alerts_sent.len(),
                summary.reports_sent.len(),
                summary.news_items,
            );
            if let Err(e) = self.deps.notifier.send_message(&text).await {
                summary.send_failures += 1;
                counter!("notify_errors_total").increment(1);
                tracing::warn!(target: "notify", error = %e, "heartbeat not delivered");
            }
        }

        tracing::info!(
            target: "pipeline",
            ?mode,
            news = summary.news_items,
            alerts = summary.alerts_sent.len(),
            reports = summary.reports_sent.len(),
            send_failures = summary.send_failures,
            "run finished"
        );
        Ok(summary)
    }

    async fn fetch_inputs(&self) -> Result<(QuoteBook, Vec<NewsItem>)> {
        let universe = &self.config.universe;
        let stocks = self
            .deps
            .stocks
            .get_quotes(&universe.stock_symbols())
            .await
            .with_context(|| format!("fetching stock quotes from {}", self.deps.stocks.name()))?;
        let crypto = self
            .deps
            .crypto
            .get_quotes(&universe.crypto_symbols())
            .await
            .with_context(|| format!("fetching crypto quotes from {}", self.deps.crypto.name()))?;
        let news = self
            .deps
            .news
            .get_recent_news()
            .await
            .with_context(|| format!("fetching news from {}", self.deps.news.name()))?;
        tracing::debug!(target: "pipeline", stocks = stocks.len(), crypto = crypto.len(), news = news.len(), "inputs fetched");
        Ok((QuoteBook::new(stocks.into_iter().chain(crypto)), news))
    }

    /// Decide what to do with one news item. Records the fingerprint as a
    /// side effect once the item is known to mention a tracked asset, so a
    /// "not significant right now" verdict is not re-evaluated next poll.
    /// Never marks cooldown; that happens only on actual emission.
    pub fn evaluate_news(
        &self,
        state: &mut PersistedState,
        item: &NewsItem,
        book: &QuoteBook,
        now: i64,
    ) -> Result<NewsDecision> {
        let headline = item.headline.trim();
        if headline.is_empty() {
            bail!("news item without headline (url {:?})", item.url);
        }
        if item.url.trim().is_empty() {
            bail!("news item without link (source {:?})", item.source);
        }
        if is_rumor(headline) {
            return Ok(NewsDecision::Skip(Skip::Rumor));
        }
        let fp = fingerprint(headline, &item.url);
        if state.seen_news.seen(&fp) {
            return Ok(NewsDecision::Skip(Skip::AlreadySeen));
        }
        let Some((class, asset)) = self.config.universe.find_mention(headline) else {
            return Ok(NewsDecision::Skip(Skip::NoMention));
        };
        state.seen_news.record(&fp, now);

        let Some(quote) = book.get(&asset.symbol) else {
            return Ok(NewsDecision::Skip(Skip::NoQuote));
        };
        if !self.config.thresholds.is_significant(class, quote.change_pct) {
            tracing::debug!(target: "pipeline", id = %fp, symbol = %asset.symbol, change = quote.change_pct, "mention not significant");
            return Ok(NewsDecision::Skip(Skip::NotSignificant));
        }
        let key = alert_key(AlertKind::News, &asset.symbol);
        if !state
            .last_alert
            .allowed(&key, now, self.config.cooldown_secs)
        {
            tracing::debug!(target: "pipeline", id = %fp, %key, "suppressed by cooldown");
            return Ok(NewsDecision::Skip(Skip::CoolingDown));
        }
        Ok(NewsDecision::Alert(Alert {
            kind: AlertKind::News,
            key,
            symbol: asset.symbol.clone(),
            text: report::news_alert_text(
                &asset.symbol,
                quote.change_pct,
                headline,
                &item.url,
                &item.source,
            ),
        }))
    }

    async fn process_news(
        &self,
        state: &mut PersistedState,
        news: &[NewsItem],
        book: &QuoteBook,
        now: i64,
        summary: &mut RunSummary,
    ) {
        for item in news {
            match self.evaluate_news(state, item, book, now) {
                Ok(NewsDecision::Skip(reason)) => summary.skip(reason),
                Ok(NewsDecision::Alert(alert)) => self.emit(state, alert, now, summary).await,
                Err(e) => {
                    tracing::warn!(target: "pipeline", error = %e, "skipping malformed news item");
                    summary.skip(Skip::Malformed);
                }
            }
        }
    }

    /// Price-move alerts for the partner watch list, keyed `partner:<SYM>`.
    async fn probe_partners(
        &self,
        state: &mut PersistedState,
        book: &QuoteBook,
        now: i64,
        summary: &mut RunSummary,
    ) {
        let universe = &self.config.universe;
        for symbol in &universe.partners {
            let (Some(class), Some(quote)) = (universe.class_of(symbol), book.get(symbol)) else {
                continue;
            };
            if !self.config.thresholds.is_significant(class, quote.change_pct) {
                continue;
            }
            let key = alert_key(AlertKind::Partner, symbol);
            if !state
                .last_alert
                .allowed(&key, now, self.config.cooldown_secs)
            {
                continue;
            }
            let alert = Alert {
                kind: AlertKind::Partner,
                key,
                symbol: symbol.clone(),
                text: report::partner_alert_text(symbol, quote),
            };
            self.emit(state, alert, now, summary).await;
        }
    }

    async fn emit(&self, state: &mut PersistedState, alert: Alert, now: i64, summary: &mut RunSummary) {
        match self.deps.notifier.send_message(&alert.text).await {
            Ok(()) => {
                state.last_alert.mark(&alert.key, now);
                counter!("alerts_emitted_total", "kind" => alert.kind.as_str()).increment(1);
                tracing::info!(target: "pipeline", key = %alert.key, "alert sent");
                summary.alerts_sent.push(alert.key);
            }
            Err(e) => {
                summary.send_failures += 1;
                counter!("notify_errors_total").increment(1);
                tracing::warn!(target: "notify", key = %alert.key, error = %e, "alert not delivered, cooldown left unmarked");
            }
        }
    }

    async fn run_reports(
        &self,
        state: &mut PersistedState,
        mode: TriggerMode,
        local_now: DateTime<FixedOffset>,
        book: &QuoteBook,
        summary: &mut RunSummary,
    ) {
        let sched = &self.config.schedule;
        let universe = &self.config.universe;
        let stocks = universe.stock_symbols();
        let crypto = universe.crypto_symbols();
        let sections = ReportSections {
            stocks: &stocks,
            crypto: &crypto,
            partners: &universe.partners,
        };

        for r in &sched.reports {
            let due = match mode {
                TriggerMode::Manual => true,
                TriggerMode::Scheduled => {
                    state
                        .last_run_marker
                        .should_run(r, local_now, sched.window_minutes)
                }
            };
            if !due {
                continue;
            }
            let text = report::report_text(r.kind, local_now, &sections, book);
            match self.deps.notifier.send_message(&text).await {
                Ok(()) => {
                    if mode == TriggerMode::Scheduled {
                        state.last_run_marker.mark_ran(r.kind, local_now.date_naive());
                    }
                    counter!("reports_sent_total", "kind" => r.kind.as_str()).increment(1);
                    tracing::info!(target: "schedule", kind = %r.kind, ?mode, "report sent");
                    summary.reports_sent.push(r.kind);
                }
                Err(e) => {
                    summary.send_failures += 1;
                    counter!("notify_errors_total").increment(1);
                    tracing::warn!(target: "schedule", kind = %r.kind, error = %e, "report not delivered, will retry inside the window");
                }
            }
        }
    }
}

/// Best-effort diagnostic for a failed run: one message through the sink.
pub async fn report_failure(notifier: &dyn Notifier, err: &anyhow::Error) {
    let text = report::failure_text(err);
    if let Err(e) = notifier.send_message(&text).await {
        tracing::error!(target: "notify", error = %e, "could not deliver failure notice");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_mode_parses_known_values() {
        assert_eq!(TriggerMode::parse("Manual"), Some(TriggerMode::Manual));
        assert_eq!(
            TriggerMode::parse("workflow_dispatch"),
            Some(TriggerMode::Manual)
        );
        assert_eq!(TriggerMode::parse("cron"), Some(TriggerMode::Scheduled));
        assert_eq!(TriggerMode::parse("whatever"), None);
    }

    #[serial_test::serial]
    #[test]
    fn trigger_mode_from_env_falls_back() {
        std::env::remove_var("TRIGGER_MODE");
        std::env::remove_var("GITHUB_EVENT_NAME");
        assert_eq!(TriggerMode::from_env(), TriggerMode::Scheduled);

        std::env::set_var("GITHUB_EVENT_NAME", "workflow_dispatch");
        assert_eq!(TriggerMode::from_env(), TriggerMode::Manual);

        std::env::set_var("TRIGGER_MODE", "scheduled");
        assert_eq!(TriggerMode::from_env(), TriggerMode::Scheduled);

        std::env::remove_var("TRIGGER_MODE");
        std::env::remove_var("GITHUB_EVENT_NAME");
    }
}
