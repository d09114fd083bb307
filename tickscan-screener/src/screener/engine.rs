//! Screener engine.
//!
//! The orchestrator for universe-wide screening runs: validates the
//! condition set once, fans out per-symbol evaluation on a bounded worker
//! pool, AND-reduces conditions with short-circuiting, and collects the
//! matches. Per-symbol failures are isolated; validation failures abort
//! the whole run before any symbol is touched.

use std::sync::Arc;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::data::{BarProvider, SnapshotCache, StockMeta};
use crate::indicators::{IndicatorEngine, IndicatorSnapshot, LatestSnapshots};

use super::condition::{compile, needs_previous, CompiledCondition, Condition, ScreenerError};
use super::evaluator::evaluate;

// ============================================================================
// Run Results
// ============================================================================

/// One matching symbol with its latest snapshot's published fields.
#[derive(Debug, Clone, Serialize)]
pub struct ScreenerMatch {
    pub symbol: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(flatten)]
    pub indicators: IndicatorSnapshot,
}

/// Outcome of a screening run.
#[derive(Debug, Clone)]
pub struct ScreenerRun {
    /// Snapshot date of the run (the dataset's latest bar date)
    pub date: Option<NaiveDate>,
    /// Matching symbols, in no particular order
    pub results: Vec<ScreenerMatch>,
    /// Number of symbols evaluated
    pub scanned: usize,
    /// Number of symbols excluded by compute failures
    pub failed: usize,
}

/// Errors from a screening run.
#[derive(Debug, Error)]
pub enum RunError {
    /// The condition set failed validation (request-level, maps to 400)
    #[error(transparent)]
    Validation(#[from] ScreenerError),

    /// The run itself could not proceed (storage down, etc.)
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

// ============================================================================
// Screener Engine
// ============================================================================

/// The screening orchestrator.
pub struct ScreenerEngine {
    provider: Arc<dyn BarProvider>,
    cache: Option<Arc<SnapshotCache>>,
    workers: usize,
}

impl ScreenerEngine {
    /// Create a new engine over a bar provider.
    ///
    /// `workers` bounds concurrent per-symbol tasks and defaults to the
    /// available CPU parallelism. `snapshot_cache` enables reuse of
    /// computed snapshots across runs on the same dataset version.
    pub fn new(
        provider: Arc<dyn BarProvider>,
        workers: Option<usize>,
        snapshot_cache: bool,
    ) -> Self {
        let workers = workers.unwrap_or_else(num_cpus::get).max(1);
        Self {
            provider,
            cache: snapshot_cache.then(|| Arc::new(SnapshotCache::new())),
            workers,
        }
    }

    /// Run a screener over the whole universe.
    pub async fn run(&self, conditions: &[Condition]) -> Result<ScreenerRun, RunError> {
        // Validate once per run, before any symbol work
        let compiled: Arc<[CompiledCondition]> = compile(conditions)?.into();
        let needs_prev = needs_previous(&compiled);

        let version = self
            .provider
            .dataset_version()
            .await
            .map_err(|e| anyhow::anyhow!(e).context("Failed to read dataset version"))?;
        let version_key = version.key();

        if let Some(cache) = &self.cache {
            cache.purge_stale(&version_key);
        }

        let stocks = self
            .provider
            .list_stocks()
            .await
            .map_err(|e| anyhow::anyhow!(e).context("Failed to list universe"))?;
        let scanned = stocks.len();

        debug!(
            universe = scanned,
            conditions = compiled.len(),
            workers = self.workers,
            version = %version_key,
            "Starting screener run"
        );

        let outcomes: Vec<SymbolOutcome> = stream::iter(stocks)
            .map(|stock| {
                let provider = Arc::clone(&self.provider);
                let cache = self.cache.clone();
                let compiled = Arc::clone(&compiled);
                let version_key = version_key.clone();
                async move {
                    evaluate_symbol(provider, cache, &compiled, needs_prev, &version_key, stock)
                        .await
                }
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        let mut results = Vec::new();
        let mut failed = 0;
        for outcome in outcomes {
            match outcome {
                SymbolOutcome::Matched(matched) => results.push(*matched),
                SymbolOutcome::NoMatch => {}
                SymbolOutcome::Failed => failed += 1,
            }
        }

        info!(
            scanned,
            matched = results.len(),
            failed,
            "Screener run complete"
        );

        Ok(ScreenerRun {
            date: version.latest_date,
            results,
            scanned,
            failed,
        })
    }

    /// Latest snapshots for one symbol, via the cache when enabled.
    ///
    /// Also used by the stock-detail endpoint, so it lives on the engine
    /// rather than inside the run loop.
    pub async fn latest_snapshots(&self, symbol: &str) -> Option<LatestSnapshots> {
        let version_key = self.provider.dataset_version().await.ok()?.key();
        fetch_snapshots(&self.provider, self.cache.as_deref(), symbol, &version_key).await
    }
}

// ============================================================================
// Per-Symbol Evaluation
// ============================================================================

enum SymbolOutcome {
    Matched(Box<ScreenerMatch>),
    NoMatch,
    Failed,
}

async fn evaluate_symbol(
    provider: Arc<dyn BarProvider>,
    cache: Option<Arc<SnapshotCache>>,
    conditions: &[CompiledCondition],
    needs_prev: bool,
    version_key: &str,
    stock: StockMeta,
) -> SymbolOutcome {
    let snapshots =
        match try_fetch_snapshots(&provider, cache.as_deref(), &stock.symbol, version_key).await {
            Ok(Some(snapshots)) => snapshots,
            // No bars at all: nothing to evaluate
            Ok(None) => return SymbolOutcome::NoMatch,
            Err(error) => {
                warn!(symbol = %stock.symbol, %error, "Excluding symbol after compute failure");
                return SymbolOutcome::Failed;
            }
        };

    // Crossover screeners need two bars of history
    if needs_prev && snapshots.previous.is_none() {
        return SymbolOutcome::NoMatch;
    }

    let current = &snapshots.current;
    let previous = snapshots.previous.as_ref();
    let all_pass = conditions
        .iter()
        .all(|condition| evaluate(condition, current, previous));

    if all_pass {
        SymbolOutcome::Matched(Box::new(ScreenerMatch {
            symbol: stock.symbol,
            name: stock.name,
            sector: stock.sector,
            indicators: snapshots.current,
        }))
    } else {
        SymbolOutcome::NoMatch
    }
}

async fn try_fetch_snapshots(
    provider: &Arc<dyn BarProvider>,
    cache: Option<&SnapshotCache>,
    symbol: &str,
    version_key: &str,
) -> Result<Option<LatestSnapshots>, anyhow::Error> {
    if let Some(cache) = cache {
        if let Some(hit) = cache.get(symbol, version_key) {
            return Ok(Some(hit));
        }
    }

    let bars = provider.get_bars(symbol).await.map_err(anyhow::Error::from)?;
    let Some(snapshots) = IndicatorEngine::new().compute_latest(&bars) else {
        return Ok(None);
    };

    if let Some(cache) = cache {
        cache.put(symbol, version_key, snapshots.clone());
    }
    Ok(Some(snapshots))
}

async fn fetch_snapshots(
    provider: &Arc<dyn BarProvider>,
    cache: Option<&SnapshotCache>,
    symbol: &str,
    version_key: &str,
) -> Option<LatestSnapshots> {
    try_fetch_snapshots(provider, cache, symbol, version_key)
        .await
        .ok()
        .flatten()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Bar, DatasetVersion, LocalStorage, ProviderError};
    use crate::screener::condition::ConditionValue;
    use async_trait::async_trait;
    use std::collections::HashSet;

    fn condition(field: &str, op: &str, value: ConditionValue) -> Condition {
        Condition {
            field: field.to_string(),
            op: op.to_string(),
            value,
        }
    }

    fn make_bars(symbol: &str, closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                symbol: symbol.to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Days::new(i as u64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000_000.0,
            })
            .collect()
    }

    async fn seed(storage: &LocalStorage, symbol: &str, closes: &[f64]) {
        storage
            .save_stocks(&[StockMeta {
                symbol: symbol.to_string(),
                name: format!("{} Ltd", symbol),
                sector: Some("Test".to_string()),
                industry: None,
                is_fno: false,
                market_cap: None,
            }])
            .await
            .unwrap();
        storage.save_bars(&make_bars(symbol, closes)).await.unwrap();
    }

    fn engine_over(storage: LocalStorage) -> ScreenerEngine {
        ScreenerEngine::new(Arc::new(storage), Some(4), true)
    }

    fn symbols(run: &ScreenerRun) -> HashSet<String> {
        run.results.iter().map(|m| m.symbol.clone()).collect()
    }

    fn rising(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    fn falling(n: usize) -> Vec<f64> {
        (0..n).map(|i| 200.0 - 2.0 * i as f64).collect()
    }

    #[tokio::test]
    async fn test_oversold_scenario_matches_only_the_oversold_symbol() {
        let storage = LocalStorage::in_memory().unwrap();
        seed(&storage, "FALL", &falling(30)).await;
        seed(&storage, "RISE", &rising(30)).await;

        let engine = engine_over(storage);
        let run = engine
            .run(&[condition("rsi14", "<", ConditionValue::Number(30.0))])
            .await
            .unwrap();

        assert_eq!(symbols(&run), HashSet::from(["FALL".to_string()]));
        assert_eq!(run.scanned, 2);
        assert_eq!(run.failed, 0);
        let matched = &run.results[0];
        assert!(matched.indicators.rsi14.unwrap() < 30.0);
        assert_eq!(matched.name, "FALL Ltd");
    }

    #[tokio::test]
    async fn test_close_above_ema20_scenario() {
        let storage = LocalStorage::in_memory().unwrap();
        // JUMP closes well above its 20-bar average on the last bar
        let mut jump = vec![100.0; 25];
        jump.push(130.0);
        seed(&storage, "JUMP", &jump).await;
        // FLAT closes exactly on its average: `>` must not match
        seed(&storage, "FLAT", &vec![100.0; 26]).await;

        let engine = engine_over(storage);
        let run = engine
            .run(&[condition(
                "close",
                ">",
                ConditionValue::Field("ema20".to_string()),
            )])
            .await
            .unwrap();

        assert_eq!(symbols(&run), HashSet::from(["JUMP".to_string()]));
    }

    #[tokio::test]
    async fn test_supertrend_flip_preset() {
        let storage = LocalStorage::in_memory().unwrap();
        // FLIP: flat, crash below the band, then a rally that flips the
        // trend up on the final bar
        let mut flip = vec![100.0; 14];
        flip.extend_from_slice(&[80.0, 80.0, 130.0]);
        seed(&storage, "FLIP", &flip).await;
        // STEADY: never leaves the up trend
        seed(&storage, "STEADY", &vec![100.0; 17]).await;

        let engine = engine_over(storage);
        let run = engine
            .run(&[
                condition("supertrend_dir", "=", ConditionValue::Number(1.0)),
                condition("prev_supertrend_dir", "=", ConditionValue::Number(-1.0)),
            ])
            .await
            .unwrap();

        assert_eq!(symbols(&run), HashSet::from(["FLIP".to_string()]));
    }

    #[tokio::test]
    async fn test_and_semantics_equal_intersection() {
        let storage = LocalStorage::in_memory().unwrap();
        seed(&storage, "HI-UP", &rising(20)).await; // close 119, rising
        seed(&storage, "HI-DOWN", &falling(20)).await; // close 162, falling
        seed(&storage, "LO-UP", &[40.0, 41.0, 42.0]).await; // close 42, rising
        seed(&storage, "LO-DOWN", &[60.0, 55.0, 50.0]).await; // close 50, falling

        let engine = engine_over(storage);
        let a = condition("close", ">", ConditionValue::Number(100.0));
        let b = condition("change_pct", ">", ConditionValue::Number(0.0));

        let run_a = engine.run(std::slice::from_ref(&a)).await.unwrap();
        let run_b = engine.run(std::slice::from_ref(&b)).await.unwrap();
        let run_ab = engine.run(&[a, b]).await.unwrap();

        let intersection: HashSet<String> = symbols(&run_a)
            .intersection(&symbols(&run_b))
            .cloned()
            .collect();
        assert_eq!(symbols(&run_ab), intersection);
        assert_eq!(symbols(&run_ab), HashSet::from(["HI-UP".to_string()]));
    }

    #[tokio::test]
    async fn test_idempotent_reruns() {
        let storage = LocalStorage::in_memory().unwrap();
        seed(&storage, "FALL", &falling(30)).await;
        seed(&storage, "RISE", &rising(30)).await;
        seed(&storage, "FLAT", &vec![100.0; 30]).await;

        let engine = engine_over(storage);
        let conditions = [condition("rsi14", ">", ConditionValue::Number(50.0))];

        // Second run hits the snapshot cache; results must be identical
        let first = engine.run(&conditions).await.unwrap();
        let second = engine.run(&conditions).await.unwrap();

        assert_eq!(symbols(&first), symbols(&second));
        assert_eq!(first.date, second.date);
    }

    #[tokio::test]
    async fn test_validation_aborts_whole_run() {
        let storage = LocalStorage::in_memory().unwrap();
        seed(&storage, "GOOD", &rising(30)).await;

        let engine = engine_over(storage);
        let err = engine
            .run(&[
                condition("rsi14", "<", ConditionValue::Number(30.0)),
                condition("not_a_field", ">", ConditionValue::Number(1.0)),
            ])
            .await
            .unwrap_err();

        match err {
            RunError::Validation(ScreenerError::UnknownField(name)) => {
                assert_eq!(name, "not_a_field");
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        let err = engine.run(&[]).await.unwrap_err();
        assert!(matches!(
            err,
            RunError::Validation(ScreenerError::EmptyConditionSet)
        ));
    }

    #[tokio::test]
    async fn test_single_bar_symbol_and_crossovers() {
        let storage = LocalStorage::in_memory().unwrap();
        seed(&storage, "ONEBAR", &[100.0]).await;

        let engine = engine_over(storage);

        // Comparison conditions evaluate with previous = none
        let run = engine
            .run(&[condition("close", ">", ConditionValue::Number(50.0))])
            .await
            .unwrap();
        assert_eq!(symbols(&run), HashSet::from(["ONEBAR".to_string()]));

        // Any crossover condition excludes it, without error
        let run = engine
            .run(&[condition(
                "close",
                "crossed_above",
                ConditionValue::Field("high_52w".to_string()),
            )])
            .await
            .unwrap();
        assert!(run.results.is_empty());
        assert_eq!(run.failed, 0);
    }

    #[tokio::test]
    async fn test_run_date_is_latest_bar_date() {
        let storage = LocalStorage::in_memory().unwrap();
        seed(&storage, "ACME", &rising(5)).await;

        let engine = engine_over(storage);
        let run = engine
            .run(&[condition("close", ">", ConditionValue::Number(0.0))])
            .await
            .unwrap();

        assert_eq!(run.date, NaiveDate::from_ymd_opt(2024, 1, 5));
    }

    // A provider that fails for one symbol, to prove isolation
    struct FlakyProvider {
        inner: LocalStorage,
    }

    #[async_trait]
    impl BarProvider for FlakyProvider {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn list_stocks(&self) -> Result<Vec<StockMeta>, ProviderError> {
            self.inner.list_stocks().await
        }

        async fn get_stock(&self, symbol: &str) -> Result<Option<StockMeta>, ProviderError> {
            self.inner.get_stock(symbol).await
        }

        async fn get_bars(&self, symbol: &str) -> Result<Vec<Bar>, ProviderError> {
            if symbol == "BAD" {
                return Err(ProviderError::Storage("corrupt bar data".to_string()));
            }
            self.inner.get_bars(symbol).await
        }

        async fn dataset_version(&self) -> Result<DatasetVersion, ProviderError> {
            self.inner.dataset_version().await
        }
    }

    #[tokio::test]
    async fn test_symbol_failure_is_isolated() {
        let storage = LocalStorage::in_memory().unwrap();
        seed(&storage, "GOOD", &rising(30)).await;
        seed(&storage, "BAD", &rising(30)).await;

        let engine = ScreenerEngine::new(
            Arc::new(FlakyProvider { inner: storage }),
            Some(2),
            false,
        );
        let run = engine
            .run(&[condition("close", ">", ConditionValue::Number(0.0))])
            .await
            .unwrap();

        assert_eq!(symbols(&run), HashSet::from(["GOOD".to_string()]));
        assert_eq!(run.failed, 1);
        assert_eq!(run.scanned, 2);
    }
}
