//! Local market data storage using SQLite.
//!
//! Provides persistent storage for:
//! - Daily OHLCV bars
//! - Stock universe metadata
//! - Saved screener definitions
//!
//! Bars are append-only; the dataset version (latest date + bar count)
//! moves on every append, which is what invalidates snapshot caches.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::provider::{BarProvider, DatasetVersion, ProviderError};
use super::{Bar, StockMeta};

// ============================================================================
// Database Schema
// ============================================================================

const CREATE_TABLES_SQL: &str = r#"
-- Daily bar data
CREATE TABLE IF NOT EXISTS bars (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol TEXT NOT NULL,
    date TEXT NOT NULL,
    open REAL NOT NULL,
    high REAL NOT NULL,
    low REAL NOT NULL,
    close REAL NOT NULL,
    volume REAL NOT NULL,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(symbol, date)
);

CREATE INDEX IF NOT EXISTS idx_bars_symbol_date
ON bars(symbol, date);

-- Stock universe metadata
CREATE TABLE IF NOT EXISTS stocks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    sector TEXT,
    industry TEXT,
    is_fno INTEGER DEFAULT 0,
    market_cap REAL,
    updated_at TEXT DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_stocks_name
ON stocks(name);

-- Saved screener definitions
CREATE TABLE IF NOT EXISTS screeners (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    conditions TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for local storage
#[derive(Debug, Clone)]
pub struct LocalStorageConfig {
    /// Path to the SQLite database
    pub db_path: PathBuf,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            db_path: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".tickscan")
                .join("market.db"),
        }
    }
}

// ============================================================================
// Saved Screener
// ============================================================================

/// A saved screener definition.
///
/// `conditions` is kept as raw JSON here; the screener module owns the
/// typed representation.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SavedScreener {
    pub id: i64,
    pub name: String,
    pub conditions: serde_json::Value,
    pub created_at: String,
    pub updated_at: String,
}

// ============================================================================
// Local Storage
// ============================================================================

/// Local SQLite storage for market data.
pub struct LocalStorage {
    /// SQLite connection wrapped in Mutex for thread safety
    /// Note: rusqlite::Connection is Send but not Sync, and Mutex<T>
    /// is Sync when T: Send
    db: Arc<Mutex<Connection>>,
    config: LocalStorageConfig,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    pub fn new(config: LocalStorageConfig) -> Result<Self> {
        // Ensure directory exists
        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&config.db_path)
            .context("Failed to open market database")?;

        // WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .context("Failed to set database pragmas")?;

        conn.execute_batch(CREATE_TABLES_SQL)
            .context("Failed to create database tables")?;

        info!(db_path = %config.db_path.display(), "Initialized local storage");

        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            config,
        })
    }

    /// Create with default configuration
    pub fn with_defaults() -> Result<Self> {
        Self::new(LocalStorageConfig::default())
    }

    /// Create an in-memory instance (tests, ephemeral runs)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        conn.execute_batch(CREATE_TABLES_SQL)
            .context("Failed to create database tables")?;

        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            config: LocalStorageConfig {
                db_path: PathBuf::from(":memory:"),
            },
        })
    }

    /// Get the database path
    pub fn db_path(&self) -> &PathBuf {
        &self.config.db_path
    }

    // ========================================================================
    // Stock Metadata Operations
    // ========================================================================

    /// Upsert stock metadata for the universe.
    pub async fn save_stocks(&self, stocks: &[StockMeta]) -> Result<usize> {
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;

        let mut saved = 0;
        for stock in stocks {
            tx.execute(
                "INSERT INTO stocks (symbol, name, sector, industry, is_fno, market_cap)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(symbol) DO UPDATE SET
                    name = excluded.name,
                    sector = excluded.sector,
                    industry = excluded.industry,
                    is_fno = excluded.is_fno,
                    market_cap = excluded.market_cap,
                    updated_at = CURRENT_TIMESTAMP",
                params![
                    stock.symbol,
                    stock.name,
                    stock.sector,
                    stock.industry,
                    stock.is_fno as i64,
                    stock.market_cap,
                ],
            )?;
            saved += 1;
        }

        tx.commit()?;
        Ok(saved)
    }

    /// Get all stocks in the universe, ordered by symbol.
    pub async fn get_all_stocks(&self) -> Result<Vec<StockMeta>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT symbol, name, sector, industry, is_fno, market_cap
             FROM stocks ORDER BY symbol",
        )?;

        let stocks = stmt
            .query_map([], row_to_stock)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(stocks)
    }

    /// Get metadata for one stock.
    pub async fn get_stock_meta(&self, symbol: &str) -> Result<Option<StockMeta>> {
        let db = self.db.lock().await;
        let meta = db
            .query_row(
                "SELECT symbol, name, sector, industry, is_fno, market_cap
                 FROM stocks WHERE symbol = ?1",
                params![symbol],
                row_to_stock,
            )
            .optional()?;
        Ok(meta)
    }

    /// Paginated universe listing with optional substring search over
    /// symbol and name. Returns (page of stocks, total matching).
    pub async fn search_stocks(
        &self,
        query: &str,
        page: usize,
        per_page: usize,
    ) -> Result<(Vec<StockMeta>, usize)> {
        let db = self.db.lock().await;
        let pattern = format!("%{}%", query);
        let offset = page.saturating_sub(1) * per_page;

        let total: i64 = db.query_row(
            "SELECT COUNT(*) FROM stocks WHERE symbol LIKE ?1 OR name LIKE ?1",
            params![pattern],
            |row| row.get(0),
        )?;

        let mut stmt = db.prepare(
            "SELECT symbol, name, sector, industry, is_fno, market_cap
             FROM stocks WHERE symbol LIKE ?1 OR name LIKE ?1
             ORDER BY symbol LIMIT ?2 OFFSET ?3",
        )?;

        let stocks = stmt
            .query_map(params![pattern, per_page as i64, offset as i64], row_to_stock)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok((stocks, total as usize))
    }

    // ========================================================================
    // Bar Data Operations
    // ========================================================================

    /// Append bars. Existing (symbol, date) rows are left untouched.
    pub async fn save_bars(&self, bars: &[Bar]) -> Result<usize> {
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;

        let mut saved = 0;
        for bar in bars {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO bars (symbol, date, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    bar.symbol,
                    bar.date.to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume,
                ],
            )?;
            saved += inserted;
        }

        tx.commit()?;
        Ok(saved)
    }

    /// Full bar history for a symbol, oldest first.
    pub async fn get_bar_history(&self, symbol: &str) -> Result<Vec<Bar>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT symbol, date, open, high, low, close, volume
             FROM bars WHERE symbol = ?1 ORDER BY date",
        )?;

        let bars = stmt
            .query_map(params![symbol], row_to_bar)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(bars)
    }

    /// The most recent `limit` bars for a symbol, oldest first.
    pub async fn get_recent_bars(&self, symbol: &str, limit: usize) -> Result<Vec<Bar>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT symbol, date, open, high, low, close, volume
             FROM bars WHERE symbol = ?1 ORDER BY date DESC LIMIT ?2",
        )?;

        let mut bars = stmt
            .query_map(params![symbol, limit as i64], row_to_bar)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        bars.reverse();
        Ok(bars)
    }

    /// Current dataset version: latest bar date + total bar count.
    pub async fn current_version(&self) -> Result<DatasetVersion> {
        let db = self.db.lock().await;
        let (latest, count): (Option<String>, i64) = db.query_row(
            "SELECT MAX(date), COUNT(*) FROM bars",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let latest_date = match latest {
            Some(s) => Some(
                s.parse::<NaiveDate>()
                    .with_context(|| format!("Invalid date in bar store: {}", s))?,
            ),
            None => None,
        };

        Ok(DatasetVersion {
            latest_date,
            bar_count: count as u64,
        })
    }

    // ========================================================================
    // Saved Screener Operations
    // ========================================================================

    /// Save a screener definition; returns its id.
    pub async fn save_screener(&self, name: &str, conditions: &serde_json::Value) -> Result<i64> {
        let db = self.db.lock().await;
        let now = Utc::now().to_rfc3339();

        db.execute(
            "INSERT INTO screeners (name, conditions, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![name, conditions.to_string(), now],
        )?;

        Ok(db.last_insert_rowid())
    }

    /// List saved screeners, newest first.
    pub async fn list_screeners(&self) -> Result<Vec<SavedScreener>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT id, name, conditions, created_at, updated_at
             FROM screeners ORDER BY id DESC",
        )?;

        let screeners = stmt
            .query_map([], row_to_screener)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(screeners)
    }

    /// Get one saved screener by id.
    pub async fn get_screener(&self, id: i64) -> Result<Option<SavedScreener>> {
        let db = self.db.lock().await;
        let screener = db
            .query_row(
                "SELECT id, name, conditions, created_at, updated_at
                 FROM screeners WHERE id = ?1",
                params![id],
                row_to_screener,
            )
            .optional()?;
        Ok(screener)
    }
}

// ============================================================================
// Row Mappers
// ============================================================================

fn row_to_stock(row: &rusqlite::Row<'_>) -> rusqlite::Result<StockMeta> {
    Ok(StockMeta {
        symbol: row.get(0)?,
        name: row.get(1)?,
        sector: row.get(2)?,
        industry: row.get(3)?,
        is_fno: row.get::<_, i64>(4)? != 0,
        market_cap: row.get(5)?,
    })
}

fn row_to_bar(row: &rusqlite::Row<'_>) -> rusqlite::Result<Bar> {
    let date: String = row.get(1)?;
    let date = date.parse::<NaiveDate>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })?;

    Ok(Bar {
        symbol: row.get(0)?,
        date,
        open: row.get(2)?,
        high: row.get(3)?,
        low: row.get(4)?,
        close: row.get(5)?,
        volume: row.get(6)?,
    })
}

fn row_to_screener(row: &rusqlite::Row<'_>) -> rusqlite::Result<SavedScreener> {
    let conditions: String = row.get(2)?;
    let conditions = serde_json::from_str(&conditions).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })?;

    Ok(SavedScreener {
        id: row.get(0)?,
        name: row.get(1)?,
        conditions,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

// ============================================================================
// BarProvider Implementation
// ============================================================================

#[async_trait]
impl BarProvider for LocalStorage {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn list_stocks(&self) -> Result<Vec<StockMeta>, ProviderError> {
        self.get_all_stocks()
            .await
            .map_err(|e| ProviderError::Storage(e.to_string()))
    }

    async fn get_stock(&self, symbol: &str) -> Result<Option<StockMeta>, ProviderError> {
        self.get_stock_meta(symbol)
            .await
            .map_err(|e| ProviderError::Storage(e.to_string()))
    }

    async fn get_bars(&self, symbol: &str) -> Result<Vec<Bar>, ProviderError> {
        self.get_bar_history(symbol)
            .await
            .map_err(|e| ProviderError::Storage(e.to_string()))
    }

    async fn dataset_version(&self) -> Result<DatasetVersion, ProviderError> {
        self.current_version()
            .await
            .map_err(|e| ProviderError::Storage(e.to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================
