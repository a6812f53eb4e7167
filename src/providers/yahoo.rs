// src/providers/yahoo.rs
use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::{Quote, QuoteSource};
use crate::fetch::{FetchClient, FetchError};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Stock quotes from Yahoo's v8 chart API (no auth). The move is measured
/// against the previous close.
pub struct YahooQuotes {
    client: FetchClient,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: String,
    #[serde(default)]
    regular_market_price: Option<f64>,
    #[serde(default)]
    chart_previous_close: Option<f64>,
    #[serde(default)]
    previous_close: Option<f64>,
}

impl YahooQuotes {
    pub fn new(client: FetchClient) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn parse_chart(body: ChartResponse) -> Option<Quote> {
        let meta = body.chart.result?.into_iter().next()?.meta;
        let price = meta.regular_market_price?;
        let prev = meta.chart_previous_close.or(meta.previous_close)?;
        if prev <= 0.0 {
            return None;
        }
        Some(Quote {
            symbol: meta.symbol,
            price,
            change_pct: (price - prev) / prev * 100.0,
        })
    }
}

#[async_trait]
impl QuoteSource for YahooQuotes {
    async fn get_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>> {
        let mut out = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let url = format!("{}/{symbol}?range=1d&interval=1d", self.base_url);
            // Rate limits, 5xx and transport failures are hard. An unknown or
            // delisted symbol (404, `chart.error`) or a payload without a price
            // is just "no data" for that symbol.
            let body: ChartResponse = match self.client.get_json("yahoo", &url).await {
                Ok(b) => b,
                Err(e @ FetchError::Decode { .. }) => {
                    tracing::warn!(target: "fetch", %symbol, error = %e, "yahoo payload unreadable, skipping symbol");
                    continue;
                }
                Err(e) if e.status() == Some(StatusCode::NOT_FOUND) => {
                    tracing::warn!(target: "fetch", %symbol, error = %e, "yahoo does not know symbol, skipping");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if let Some(err) = &body.chart.error {
                tracing::warn!(target: "fetch", %symbol, error = %err, "yahoo chart error, skipping symbol");
                continue;
            }
            match Self::parse_chart(body) {
                Some(q) => out.push(Quote {
                    symbol: symbol.clone(),
                    ..q
                }),
                None => tracing::debug!(target: "fetch", %symbol, "no yahoo quote"),
            }
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "yahoo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_payload_gives_intraday_change() {
        let raw = r#"{"chart":{"result":[{"meta":{"symbol":"AAPL","regularMarketPrice":214.0,"chartPreviousClose":200.0}}],"error":null}}"#;
        let body: ChartResponse = serde_json::from_str(raw).unwrap();
        let q = YahooQuotes::parse_chart(body).unwrap();
        assert_eq!(q.symbol, "AAPL");
        assert!((q.change_pct - 7.0).abs() < 1e-9);
    }

    #[test]
    fn missing_price_is_no_data() {
        let raw = r#"{"chart":{"result":[{"meta":{"symbol":"AAPL","chartPreviousClose":200.0}}],"error":null}}"#;
        let body: ChartResponse = serde_json::from_str(raw).unwrap();
        assert!(YahooQuotes::parse_chart(body).is_none());
    }
}
