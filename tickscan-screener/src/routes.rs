//! HTTP routes for the screener service.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use tickscan_common::Error as ApiError;

use crate::data::SavedScreener;
use crate::screener::{compile, Condition, RunError, ScreenerMatch};
use crate::ScreenerState;

const STOCKS_PER_PAGE: usize = 50;
const DETAIL_RECENT_BARS: usize = 60;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
}

#[derive(Debug, Deserialize)]
pub struct RunScreenerRequest {
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Serialize)]
pub struct ScreenerResponse {
    pub count: usize,
    pub date: String,
    pub results: Vec<ScreenerMatch>,
}

#[derive(Debug, Deserialize)]
pub struct SaveScreenerRequest {
    pub name: String,
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Serialize)]
pub struct SaveScreenerResponse {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct StocksQuery {
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StocksResponse {
    pub stocks: Vec<crate::data::StockMeta>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct RecentBar {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Serialize)]
pub struct StockDetailResponse {
    #[serde(flatten)]
    pub meta: crate::data::StockMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_indicators: Option<ScreenerMatch>,
    pub recent_data: Vec<RecentBar>,
}

// ============================================================================
// Error Mapping
// ============================================================================

type ErrorResponse = (StatusCode, Json<Value>);

fn error_response(err: ApiError) -> ErrorResponse {
    let status = StatusCode::from_u16(err.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "error": err.to_string() })))
}

fn internal(context: &str, err: impl std::fmt::Display) -> ErrorResponse {
    tracing::error!(error = %err, "{}", context);
    error_response(ApiError::Internal(context.to_string()))
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: "tickscan-screener".to_string(),
    })
}

/// Run a screener over the universe
pub async fn run_screener(
    State(state): State<Arc<ScreenerState>>,
    Json(request): Json<RunScreenerRequest>,
) -> Result<Json<ScreenerResponse>, ErrorResponse> {
    let run = state.engine.run(&request.conditions).await.map_err(|e| match e {
        RunError::Validation(err) => error_response(ApiError::InvalidInput(err.to_string())),
        RunError::Internal(err) => internal("Screener run failed", err),
    })?;

    Ok(Json(ScreenerResponse {
        count: run.results.len(),
        date: run.date.map(|d| d.to_string()).unwrap_or_default(),
        results: run.results,
    }))
}

/// Save a screener definition
pub async fn save_screener(
    State(state): State<Arc<ScreenerState>>,
    Json(request): Json<SaveScreenerRequest>,
) -> Result<Json<SaveScreenerResponse>, ErrorResponse> {
    if request.name.trim().is_empty() {
        return Err(error_response(ApiError::InvalidInput(
            "Screener name must not be empty".to_string(),
        )));
    }

    // Reject definitions the engine would refuse to run
    compile(&request.conditions)
        .map_err(|e| error_response(ApiError::InvalidInput(e.to_string())))?;

    let conditions = serde_json::to_value(&request.conditions)
        .map_err(|e| internal("Failed to encode conditions", e))?;
    let id = state
        .storage
        .save_screener(request.name.trim(), &conditions)
        .await
        .map_err(|e| internal("Failed to save screener", e))?;

    Ok(Json(SaveScreenerResponse { id }))
}

/// List saved screeners
pub async fn list_screeners(
    State(state): State<Arc<ScreenerState>>,
) -> Result<Json<Vec<SavedScreener>>, ErrorResponse> {
    let screeners = state
        .storage
        .list_screeners()
        .await
        .map_err(|e| internal("Failed to list screeners", e))?;
    Ok(Json(screeners))
}

/// Get one saved screener
pub async fn get_screener(
    State(state): State<Arc<ScreenerState>>,
    Path(id): Path<i64>,
) -> Result<Json<SavedScreener>, ErrorResponse> {
    let screener = state
        .storage
        .get_screener(id)
        .await
        .map_err(|e| internal("Failed to load screener", e))?
        .ok_or_else(|| error_response(ApiError::NotFound(format!("Screener {}", id))))?;
    Ok(Json(screener))
}

/// Paginated universe listing with optional search
pub async fn list_stocks(
    State(state): State<Arc<ScreenerState>>,
    Query(query): Query<StocksQuery>,
) -> Result<Json<StocksResponse>, ErrorResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let q = query.q.unwrap_or_default();

    let (stocks, total) = state
        .storage
        .search_stocks(&q, page, STOCKS_PER_PAGE)
        .await
        .map_err(|e| internal("Failed to list stocks", e))?;

    Ok(Json(StocksResponse { stocks, total }))
}

/// Stock detail: metadata, latest indicators, recent bars
pub async fn get_stock(
    State(state): State<Arc<ScreenerState>>,
    Path(symbol): Path<String>,
) -> Result<Json<StockDetailResponse>, ErrorResponse> {
    let meta = state
        .storage
        .get_stock_meta(&symbol)
        .await
        .map_err(|e| internal("Failed to load stock", e))?
        .ok_or_else(|| error_response(ApiError::NotFound(format!("Stock {}", symbol))))?;

    let latest_indicators = state
        .engine
        .latest_snapshots(&symbol)
        .await
        .map(|snapshots| ScreenerMatch {
            symbol: meta.symbol.clone(),
            name: meta.name.clone(),
            sector: meta.sector.clone(),
            indicators: snapshots.current,
        });

    let recent_data = state
        .storage
        .get_recent_bars(&symbol, DETAIL_RECENT_BARS)
        .await
        .map_err(|e| internal("Failed to load bars", e))?
        .into_iter()
        .map(|bar| RecentBar {
            date: bar.date.to_string(),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        })
        .collect();

    Ok(Json(StockDetailResponse {
        meta,
        latest_indicators,
        recent_data,
    }))
}
