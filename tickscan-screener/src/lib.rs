//! Tickscan Screener Library
//!
//! This library provides the technical-analysis screening service: a
//! universe of daily bars, an indicator computation pipeline, and a
//! condition-evaluation engine behind a small HTTP API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                  tickscan-screener (Rust Service)                   │
//! │                            :8091                                    │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐     │
//! │  │  Bar Store      │  │  Indicator      │  │  Screener       │     │
//! │  │  (SQLite)       │  │  Engine         │  │  Engine         │     │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! ## Snapshots
//! Each symbol's bar history is turned into one snapshot per bar: OHLCV
//! plus every derived indicator in the field registry. Insufficient
//! history is an explicit null, never a silent zero.
//!
//! ## Conditions
//! A screener is an AND of conditions like `rsi14 < 30` or
//! `close > ema20`. Crossover operators compare the latest two bars.
//!
//! ## Runs
//! The orchestrator validates once, fans out per symbol on a bounded
//! worker pool, and collects matches. Per-symbol failures are logged and
//! excluded, never fatal.

#![warn(clippy::all)]

pub mod data;
pub mod indicators;
pub mod routes;
pub mod screener;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use tickscan_common::config::Config;

use crate::data::{BarProvider, LocalStorage, LocalStorageConfig};
use crate::screener::ScreenerEngine;

const MAX_REQUEST_BYTES: usize = 256 * 1024;
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Screener service state
pub struct ScreenerState {
    /// Configuration
    pub config: Config,
    /// Bar and screener storage
    pub storage: Arc<LocalStorage>,
    /// Screening engine
    pub engine: ScreenerEngine,
}

impl ScreenerState {
    /// Create state backed by the configured SQLite database
    pub fn new(config: Config) -> Result<Self> {
        let storage = Arc::new(LocalStorage::new(LocalStorageConfig {
            db_path: config.db_path(),
        })?);
        Ok(Self::with_storage(config, storage))
    }

    /// Create state over an existing storage instance (tests use this
    /// with an in-memory database)
    pub fn with_storage(config: Config, storage: Arc<LocalStorage>) -> Self {
        let provider: Arc<dyn BarProvider> = Arc::clone(&storage) as Arc<dyn BarProvider>;
        let engine = ScreenerEngine::new(
            provider,
            config.screener.workers,
            config.screener.snapshot_cache,
        );

        Self {
            config,
            storage,
            engine,
        }
    }
}

/// Build the HTTP router over the given state
pub fn build_router(state: Arc<ScreenerState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/screener/run", post(routes::run_screener))
        .route(
            "/api/screeners",
            post(routes::save_screener).get(routes::list_screeners),
        )
        .route("/api/screeners/:id", get(routes::get_screener))
        .route("/api/stocks", get(routes::list_stocks))
        .route("/api/stocks/:symbol", get(routes::get_stock))
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BYTES))
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .with_state(state)
}

/// Main screener service
pub struct ScreenerService {
    state: Arc<ScreenerState>,
}

impl ScreenerService {
    /// Create a new screener service
    pub fn new(config: Config) -> Result<Self> {
        let state = Arc::new(ScreenerState::new(config)?);
        Ok(Self { state })
    }

    /// Start the HTTP server
    pub async fn start(self) -> Result<()> {
        let host = self.state.config.network.bind.clone();
        let port = self.state.config.screener.port;

        let app = build_router(self.state.clone());

        let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
        tracing::info!(address = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
