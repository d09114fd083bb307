//! Market data module for the screener.
//!
//! Provides the daily-bar store and the static stock universe metadata.
//! Bars are append-only and owned by the store; everything derived from
//! them (indicator snapshots) lives in the `indicators` module.

mod cache;
mod provider;
pub mod local_storage;

pub use cache::SnapshotCache;
pub use provider::{BarProvider, DatasetVersion, ProviderError};
pub use local_storage::{LocalStorage, LocalStorageConfig, SavedScreener};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// Core Data Types
// ============================================================================

/// A single daily OHLCV bar.
///
/// Unique per (symbol, date), ordered by date ascending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    /// Symbol/ticker
    pub symbol: String,
    /// Trading date
    pub date: NaiveDate,
    /// Open price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Close price
    pub close: f64,
    /// Volume
    pub volume: f64,
}

impl Bar {
    /// Check if this is a bullish bar
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Check if this is a bearish bar
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Get the full range (high - low)
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Get the midpoint of the bar's range
    pub fn midpoint(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    /// True range against the previous close.
    ///
    /// Falls back to the plain high-low range when there is no previous bar.
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        match prev_close {
            Some(pc) => (self.high - self.low)
                .max((self.high - pc).abs())
                .max((self.low - pc).abs()),
            None => self.range(),
        }
    }
}

// ============================================================================
// Stock Metadata
// ============================================================================

/// Static metadata for one stock in the universe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMeta {
    /// Symbol/ticker (e.g., "RELIANCE")
    pub symbol: String,
    /// Company name
    pub name: String,
    /// Sector classification
    #[serde(default)]
    pub sector: Option<String>,
    /// Industry classification (finer than sector)
    #[serde(default)]
    pub industry: Option<String>,
    /// Whether futures & options are traded on this stock
    #[serde(default)]
    pub is_fno: bool,
    /// Market capitalization, when known
    #[serde(default)]
    pub market_cap: Option<f64>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn make_bar(open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            symbol: "TEST".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open,
            high,
            low,
            close,
            volume: 1_000_000.0,
        }
    }

    #[test]
    fn test_bar_helpers() {
        let bar = make_bar(10.0, 12.0, 9.5, 11.0);
        assert!(bar.is_bullish());
        assert!(!bar.is_bearish());
        assert!((bar.range() - 2.5).abs() < 1e-9);
        assert!((bar.midpoint() - 10.75).abs() < 1e-9);
    }

    #[test]
    fn test_true_range_without_prev_close() {
        let bar = make_bar(10.0, 12.0, 9.5, 11.0);
        assert!((bar.true_range(None) - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_true_range_gap_up() {
        // Gap above yesterday's close: |high - prev_close| dominates
        let bar = make_bar(15.0, 16.0, 14.5, 15.5);
        assert!((bar.true_range(Some(10.0)) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_true_range_gap_down() {
        // Gap below yesterday's close: |low - prev_close| dominates
        let bar = make_bar(8.0, 8.5, 7.0, 8.0);
        assert!((bar.true_range(Some(12.0)) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_stock_meta_optional_fields() {
        let json = r#"{"symbol": "INFY", "name": "Infosys"}"#;
        let meta: StockMeta = serde_json::from_str(json).unwrap();
        assert_eq!(meta.symbol, "INFY");
        assert!(meta.sector.is_none());
        assert!(!meta.is_fno);
    }
}
