// src/report.rs
//! Human-readable message text for alerts, reports and diagnostics.

use chrono::{DateTime, FixedOffset};
use std::collections::HashMap;
use std::fmt::Write as _;

use crate::providers::Quote;
use crate::schedule::ReportKind;

/// Quotes of one run, keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct QuoteBook {
    quotes: HashMap<String, Quote>,
}

impl QuoteBook {
    pub fn new(quotes: impl IntoIterator<Item = Quote>) -> Self {
        Self {
            quotes: quotes.into_iter().map(|q| (q.symbol.clone(), q)).collect(),
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&Quote> {
        self.quotes.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

fn arrow(change_pct: f64) -> &'static str {
    if change_pct >= 0.0 {
        "📈"
    } else {
        "📉"
    }
}

pub fn quote_line(symbol: &str, book: &QuoteBook) -> String {
    match book.get(symbol) {
        Some(q) => format!("{symbol}: {:.2} USD ({:+.2}%)", q.price, q.change_pct),
        None => format!("{symbol}: n/a"),
    }
}

pub fn news_alert_text(symbol: &str, change_pct: f64, headline: &str, url: &str, source: &str) -> String {
    format!(
        "{} {symbol} {change_pct:+.2}%\n{headline}\n{source}: {url}",
        arrow(change_pct)
    )
}

pub fn partner_alert_text(symbol: &str, quote: &Quote) -> String {
    format!(
        "{} Partner-Bewegung {symbol}: {:+.2}% ({:.2} USD)",
        arrow(quote.change_pct),
        quote.change_pct,
        quote.price
    )
}

/// Symbols a report lists, in order.
pub struct ReportSections<'a> {
    pub stocks: &'a [String],
    pub crypto: &'a [String],
    pub partners: &'a [String],
}

fn section(out: &mut String, title: &str, symbols: &[String], book: &QuoteBook) {
    if symbols.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{title}");
    for s in symbols {
        let _ = writeln!(out, "• {}", quote_line(s, book));
    }
}

pub fn report_text(
    kind: ReportKind,
    local_now: DateTime<FixedOffset>,
    sections: &ReportSections<'_>,
    book: &QuoteBook,
) -> String {
    let header = match kind {
        ReportKind::Midday => "🕛 Markt-Mittagsupdate",
        ReportKind::Partner => "🧠 Geschäftspartner-Update",
        ReportKind::Close => "🕕 Tagesabschluss",
    };
    let mut out = format!("{header} ({})\n", local_now.format("%d.%m.%Y %H:%M"));
    match kind {
        ReportKind::Midday | ReportKind::Close => {
            section(&mut out, "Aktien", sections.stocks, book);
            section(&mut out, "Krypto", sections.crypto, book);
        }
        ReportKind::Partner => section(&mut out, "Partner", sections.partners, book),
    }
    out.trim_end().to_string()
}

pub fn heartbeat_text(alerts: usize, reports: usize, news: usize) -> String {
    format!("🤖 Bot-Heartbeat (alles läuft)\nNews geprüft: {news} · Alerts: {alerts} · Reports: {reports}")
}

pub fn failure_text(err: &anyhow::Error) -> String {
    format!("⚠️ Bot-Fehler: {err:#}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn book() -> QuoteBook {
        QuoteBook::new([Quote {
            symbol: "AAPL".into(),
            price: 214.0,
            change_pct: 7.0,
        }])
    }

    #[test]
    fn missing_quote_renders_na() {
        assert_eq!(quote_line("MSFT", &book()), "MSFT: n/a");
        assert_eq!(quote_line("AAPL", &book()), "AAPL: 214.00 USD (+7.00%)");
    }

    #[test]
    fn partner_report_lists_only_partners() {
        let now = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2025, 9, 6, 15, 2, 0)
            .unwrap();
        let stocks = vec!["AAPL".to_string()];
        let partners = vec!["SOL".to_string()];
        let text = report_text(
            ReportKind::Partner,
            now,
            &ReportSections {
                stocks: &stocks,
                crypto: &[],
                partners: &partners,
            },
            &book(),
        );
        assert!(text.starts_with("🧠 Geschäftspartner-Update (06.09.2025 15:02)"));
        assert!(text.contains("SOL: n/a"));
        assert!(!text.contains("AAPL"));
    }

    #[test]
    fn alert_text_carries_sign_and_link() {
        let t = news_alert_text("AAPL", 7.0, "Apple reports record earnings", "https://x.test/a", "Reuters");
        assert!(t.starts_with("📈 AAPL +7.00%"));
        assert!(t.ends_with("Reuters: https://x.test/a"));
    }
}
