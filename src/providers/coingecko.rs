// src/providers/coingecko.rs
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

use super::{Quote, QuoteSource};
use crate::fetch::FetchClient;

const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3/simple/price";

/// Crypto quotes from CoinGecko's `simple/price` with the 24h change.
/// CoinGecko keys coins by id (`bitcoin`), so the source carries a
/// `symbol -> id` map built from the tracked universe.
pub struct CoinGeckoQuotes {
    client: FetchClient,
    base_url: String,
    ids: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct CoinPrice {
    usd: Option<f64>,
    usd_24h_change: Option<f64>,
}

impl CoinGeckoQuotes {
    pub fn new(client: FetchClient, ids: HashMap<String, String>) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            ids,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn to_quotes(&self, symbols: &[String], body: HashMap<String, CoinPrice>) -> Vec<Quote> {
        symbols
            .iter()
            .filter_map(|sym| {
                let id = self.ids.get(sym)?;
                let p = body.get(id)?;
                Some(Quote {
                    symbol: sym.clone(),
                    price: p.usd?,
                    change_pct: p.usd_24h_change?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl QuoteSource for CoinGeckoQuotes {
    async fn get_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>> {
        let ids: Vec<&str> = symbols
            .iter()
            .filter_map(|s| self.ids.get(s).map(String::as_str))
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!(
            "{}?ids={}&vs_currencies=usd&include_24hr_change=true",
            self.base_url,
            ids.join(",")
        );
        let body: HashMap<String, CoinPrice> = self.client.get_json("coingecko", &url).await?;
        Ok(self.to_quotes(symbols, body))
    }

    fn name(&self) -> &'static str {
        "coingecko"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::RetryPolicy;

    #[test]
    fn maps_ids_back_to_symbols_and_skips_gaps() {
        let ids = HashMap::from([
            ("BTC".to_string(), "bitcoin".to_string()),
            ("SOL".to_string(), "solana".to_string()),
        ]);
        let src = CoinGeckoQuotes::new(FetchClient::new(RetryPolicy::default()).unwrap(), ids);
        let raw = r#"{"bitcoin":{"usd":65000.0,"usd_24h_change":-3.5},"solana":{"usd":150.0}}"#;
        let body: HashMap<String, CoinPrice> = serde_json::from_str(raw).unwrap();
        let quotes = src.to_quotes(&["BTC".into(), "SOL".into(), "ETH".into()], body);
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].symbol, "BTC");
        assert_eq!(quotes[0].change_pct, -3.5);
    }
}
