// src/cooldown.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default per-key cooldown: 4h.
pub const DEFAULT_COOLDOWN_SECS: i64 = 4 * 3600;

/// What kind of alert a key belongs to. The prefix keeps news-driven and
/// price-driven alerts for the same symbol on separate cooldowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    News,
    Partner,
}

impl AlertKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::News => "news",
            AlertKind::Partner => "partner",
        }
    }
}

/// The only way alert keys are built, e.g. `news:AAPL`.
pub fn alert_key(kind: AlertKind, symbol: &str) -> String {
    format!("{}:{}", kind.as_str(), symbol.trim().to_ascii_uppercase())
}

/// Simple cooldown gate to prevent notification spam.
/// - First alert for a key always allowed.
/// - Inside cooldown, alerts are suppressed.
/// - State is updated explicitly via `mark` after a successful send.
///
/// Keys are never removed; the key space is the tracked asset universe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LastAlerts(BTreeMap<String, i64>);

impl LastAlerts {
    /// Check if we may alert for `key` at `now`. Does NOT mutate state.
    pub fn allowed(&self, key: &str, now: i64, cooldown_secs: i64) -> bool {
        match self.0.get(key) {
            None => true,
            Some(last) => now.saturating_sub(*last) >= cooldown_secs,
        }
    }

    /// Record that an alert was sent for `key` at `now`, overwriting the previous time.
    pub fn mark(&mut self, key: &str, now: i64) {
        self.0.insert(key.to_string(), now);
    }

    pub fn last(&self, key: &str) -> Option<i64> {
        self.0.get(key).copied()
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

    const T0: i64 = 1_757_149_200; // 2025-09-06 09:00 UTC

    #[test]
    fn keys_are_canonical() {
        assert_eq!(alert_key(AlertKind::News, "aapl"), "news:AAPL");
        assert_eq!(alert_key(AlertKind::Partner, " SOL "), "partner:SOL");
        assert_eq!(
            alert_key(AlertKind::News, "AAPL"),
            alert_key(AlertKind::News, "aapl")
        );
    }

    #[test]
    fn first_alert_passes() {
        let gate = LastAlerts::default();
        assert!(gate.allowed("news:AAPL", T0, 10_800));
    }

    #[test]
    fn cooldown_is_monotonic_around_the_boundary() {
        let cooldown = 10_800;
        let mut gate = LastAlerts::default();
        gate.mark("news:AAPL", T0);

        for dt in [0, 1, 120, cooldown - 1] {
            assert!(!gate.allowed("news:AAPL", T0 + dt, cooldown), "dt={dt}");
        }
        for dt in [cooldown, cooldown + 1, 10 * cooldown] {
            assert!(gate.allowed("news:AAPL", T0 + dt, cooldown), "dt={dt}");
        }
    }

    #[test]
    fn mark_overwrites_and_keys_are_independent() {
        let mut gate = LastAlerts::default();
        gate.mark("news:AAPL", T0);
        gate.mark("news:AAPL", T0 + 50);
        assert_eq!(gate.last("news:AAPL"), Some(T0 + 50));
        assert!(gate.allowed("partner:AAPL", T0 + 60, 10_800));
        assert_eq!(gate.len(), 1);
    }
}
