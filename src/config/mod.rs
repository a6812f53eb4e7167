// src/config/mod.rs
//! Static bot configuration: TOML file with per-field defaults, secrets from env.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cooldown::DEFAULT_COOLDOWN_SECS;
use crate::dedup::DEFAULT_SEEN_NEWS_TTL_SECS;
use crate::fetch::RetryPolicy;
use crate::schedule::ScheduleConfig;
use crate::significance::{AssetClass, SignificancePolicy};
use crate::state::DEFAULT_STATE_PATH;

pub const ENV_CONFIG_PATH: &str = "BOT_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/bot.toml";

/// One tracked instrument. `aliases` are the names a headline may use
/// ("Apple" for AAPL); `provider_id` is the upstream id when it differs
/// from the symbol (CoinGecko's `bitcoin`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedAsset {
    pub symbol: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub provider_id: Option<String>,
}

impl TrackedAsset {
    pub fn new(symbol: &str, aliases: &[&str]) -> Self {
        Self {
            symbol: symbol.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            provider_id: None,
        }
    }

    pub fn with_provider_id(mut self, id: &str) -> Self {
        self.provider_id = Some(id.to_string());
        self
    }

    /// Lowercased terms checked against a headline: the symbol plus aliases.
    pub fn match_terms(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(&self.symbol)
            .chain(self.aliases.iter())
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
    }
}

fn default_stocks() -> Vec<TrackedAsset> {
    vec![
        TrackedAsset::new("AAPL", &["Apple"]),
        TrackedAsset::new("MSFT", &["Microsoft"]),
        TrackedAsset::new("NVDA", &["Nvidia"]),
        TrackedAsset::new("TSLA", &["Tesla"]),
        TrackedAsset::new("AMZN", &["Amazon"]),
    ]
}

fn default_crypto() -> Vec<TrackedAsset> {
    vec![
        TrackedAsset::new("BTC", &["Bitcoin"]).with_provider_id("bitcoin"),
        TrackedAsset::new("ETH", &["Ethereum", "Ether"]).with_provider_id("ethereum"),
        TrackedAsset::new("SOL", &["Solana"]).with_provider_id("solana"),
        TrackedAsset::new("XRP", &["Ripple"]).with_provider_id("ripple"),
    ]
}

fn default_partners() -> Vec<String> {
    vec!["SOL".to_string(), "XRP".to_string()]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Universe {
    #[serde(default = "default_stocks")]
    pub stocks: Vec<TrackedAsset>,
    #[serde(default = "default_crypto")]
    pub crypto: Vec<TrackedAsset>,
    /// Symbols (from either list) watched for price-move alerts and the partner report.
    #[serde(default = "default_partners")]
    pub partners: Vec<String>,
}

impl Default for Universe {
    fn default() -> Self {
        Self {
            stocks: default_stocks(),
            crypto: default_crypto(),
            partners: default_partners(),
        }
    }
}

impl Universe {
    pub fn stock_symbols(&self) -> Vec<String> {
        self.stocks.iter().map(|a| a.symbol.clone()).collect()
    }

    pub fn crypto_symbols(&self) -> Vec<String> {
        self.crypto.iter().map(|a| a.symbol.clone()).collect()
    }

    /// `symbol -> CoinGecko id`, falling back to the lowercased symbol.
    pub fn crypto_provider_ids(&self) -> HashMap<String, String> {
        self.crypto
            .iter()
            .map(|a| {
                let id = a
                    .provider_id
                    .clone()
                    .unwrap_or_else(|| a.symbol.to_lowercase());
                (a.symbol.clone(), id)
            })
            .collect()
    }

    pub fn class_of(&self, symbol: &str) -> Option<AssetClass> {
        if self.stocks.iter().any(|a| a.symbol == symbol) {
            Some(AssetClass::Stock)
        } else if self.crypto.iter().any(|a| a.symbol == symbol) {
            Some(AssetClass::Crypto)
        } else {
            None
        }
    }

    /// First tracked asset mentioned in `text`. Stocks are checked before
    /// crypto, each in configured order. Plain substring match: a short
    /// ticker can hit inside an unrelated word.
    pub fn find_mention(&self, text: &str) -> Option<(AssetClass, &TrackedAsset)> {
        let lower = text.to_lowercase();
        let hit = |a: &&TrackedAsset| a.match_terms().any(|t| lower.contains(&t));
        if let Some(a) = self.stocks.iter().find(hit) {
            return Some((AssetClass::Stock, a));
        }
        self.crypto
            .iter()
            .find(hit)
            .map(|a| (AssetClass::Crypto, a))
    }
}

fn default_feeds() -> Vec<String> {
    vec![
        "https://news.google.com/rss/search?q=stocks+OR+crypto&hl=en-US&gl=US&ceid=US:en"
            .to_string(),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsConfig {
    #[serde(default = "default_feeds")]
    pub feeds: Vec<String>,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            feeds: default_feeds(),
        }
    }
}

fn default_state_path() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_PATH)
}
fn default_cooldown_secs() -> i64 {
    DEFAULT_COOLDOWN_SECS
}
fn default_seen_news_ttl_secs() -> i64 {
    DEFAULT_SEEN_NEWS_TTL_SECS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: i64,
    #[serde(default = "default_seen_news_ttl_secs")]
    pub seen_news_ttl_secs: i64,
    #[serde(default)]
    pub thresholds: SignificancePolicy,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub universe: Universe,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub fetch: RetryPolicy,
    /// When set, Prometheus text exposition is written here after each run.
    #[serde(default)]
    pub metrics_textfile: Option<PathBuf>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            cooldown_secs: default_cooldown_secs(),
            seen_news_ttl_secs: default_seen_news_ttl_secs(),
            thresholds: SignificancePolicy::default(),
            schedule: ScheduleConfig::default(),
            universe: Universe::default(),
            news: NewsConfig::default(),
            fetch: RetryPolicy::default(),
            metrics_textfile: None,
        }
    }
}

impl BotConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: BotConfig = toml::from_str(s).context("parsing bot config toml")?;
        cfg.sanitized()
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading bot config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load config using env var + fallbacks:
    /// 1) $BOT_CONFIG_PATH (must exist)
    /// 2) config/bot.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from(&pb);
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from(&default_p);
        }
        Self::default().sanitized()
    }

    /// Clamp tunables into valid ranges; reject what cannot be repaired.
    pub fn sanitized(mut self) -> Result<Self> {
        self.cooldown_secs = self.cooldown_secs.max(0);
        if self.seen_news_ttl_secs <= 0 {
            self.seen_news_ttl_secs = default_seen_news_ttl_secs();
        }
        self.thresholds.stocks = self.thresholds.stocks.sanitized();
        self.thresholds.crypto = self.thresholds.crypto.sanitized();
        self.schedule.window_minutes = self.schedule.window_minutes.clamp(1, 60);
        self.fetch = self.fetch.sanitized();

        self.schedule.offset()?;
        if let Some(r) = self.schedule.reports.iter().find(|r| r.hour >= 24) {
            bail!("report {} scheduled at invalid hour {}", r.kind, r.hour);
        }
        for a in self.universe.stocks.iter_mut().chain(self.universe.crypto.iter_mut()) {
            a.symbol = a.symbol.trim().to_ascii_uppercase();
        }
        for p in self.universe.partners.iter_mut() {
            *p = p.trim().to_ascii_uppercase();
        }
        if let Some(p) = self
            .universe
            .partners
            .iter()
            .find(|p| self.universe.class_of(p).is_none())
        {
            bail!("partner {p} is not in the stock or crypto universe");
        }
        Ok(self)
    }
}
