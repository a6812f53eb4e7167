// src/significance.rs
//! Significance classifier: a per-asset-class threshold table.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Stock,
    Crypto,
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetClass::Stock => f.write_str("stock"),
            AssetClass::Crypto => f.write_str("crypto"),
        }
    }
}

/// Percent bounds, both given as positive magnitudes. A move is significant
/// when `move >= up_pct` or `move <= -down_pct` (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub up_pct: f64,
    pub down_pct: f64,
}

impl Thresholds {
    pub const fn symmetric(pct: f64) -> Self {
        Self {
            up_pct: pct,
            down_pct: pct,
        }
    }

    pub fn is_significant(&self, percent_move: f64) -> bool {
        if !percent_move.is_finite() {
            return false;
        }
        percent_move >= self.up_pct || percent_move <= -self.down_pct
    }

    /// Config may carry signed values; keep magnitudes only.
    pub fn sanitized(self) -> Self {
        Self {
            up_pct: self.up_pct.abs(),
            down_pct: self.down_pct.abs(),
        }
    }
}

fn default_stock_thresholds() -> Thresholds {
    Thresholds::symmetric(7.0)
}
fn default_crypto_thresholds() -> Thresholds {
    Thresholds::symmetric(10.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignificancePolicy {
    #[serde(default = "default_stock_thresholds")]
    pub stocks: Thresholds,
    #[serde(default = "default_crypto_thresholds")]
    pub crypto: Thresholds,
}

impl Default for SignificancePolicy {
    fn default() -> Self {
        Self {
            stocks: default_stock_thresholds(),
            crypto: default_crypto_thresholds(),
        }
    }
}

impl SignificancePolicy {
    pub fn thresholds(&self, class: AssetClass) -> Thresholds {
        match class {
            AssetClass::Stock => self.stocks,
            AssetClass::Crypto => self.crypto,
        }
    }

    pub fn is_significant(&self, class: AssetClass, percent_move: f64) -> bool {
        self.thresholds(class).is_significant(percent_move)
    }
}
