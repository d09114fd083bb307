//! Bar provider abstraction.
//!
//! Defines the `BarProvider` trait the screening engine reads through,
//! keeping the engine independent of where bars actually live (SQLite in
//! production, in-memory fixtures in tests).

use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt;

use super::{Bar, StockMeta};

// ============================================================================
// Dataset Version
// ============================================================================

/// Version stamp of the underlying bar dataset.
///
/// Moves whenever bars are appended, so caches keyed by it are invalidated
/// on refresh. Two stores with the same version hold identical bars for
/// screening purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetVersion {
    /// Most recent bar date across the universe
    pub latest_date: Option<NaiveDate>,
    /// Total number of bars stored
    pub bar_count: u64,
}

impl DatasetVersion {
    /// Cache key representation.
    pub fn key(&self) -> String {
        match self.latest_date {
            Some(date) => format!("{}:{}", date, self.bar_count),
            None => format!("empty:{}", self.bar_count),
        }
    }
}

// ============================================================================
// Provider Error
// ============================================================================

/// Errors from a bar provider.
#[derive(Debug, Clone)]
pub enum ProviderError {
    /// Underlying storage failed
    Storage(String),
    /// No data for the requested symbol
    DataNotAvailable(String),
    /// Internal provider error
    Internal(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(msg) => write!(f, "Storage error: {}", msg),
            Self::DataNotAvailable(msg) => write!(f, "Data not available: {}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

// ============================================================================
// Bar Provider Trait
// ============================================================================

/// Trait for daily-bar data sources.
///
/// Bars are returned ordered by date ascending, one per trading day.
#[async_trait]
pub trait BarProvider: Send + Sync {
    /// Provider name for logging (e.g., "sqlite")
    fn name(&self) -> &'static str;

    /// List all stocks in the universe.
    async fn list_stocks(&self) -> Result<Vec<StockMeta>, ProviderError>;

    /// Get metadata for a single stock, if present.
    async fn get_stock(&self, symbol: &str) -> Result<Option<StockMeta>, ProviderError>;

    /// Get the full daily-bar history for a symbol, oldest first.
    async fn get_bars(&self, symbol: &str) -> Result<Vec<Bar>, ProviderError>;

    /// Current version of the dataset.
    async fn dataset_version(&self) -> Result<DatasetVersion, ProviderError>;
}
