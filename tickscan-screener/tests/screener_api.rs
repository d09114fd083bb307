//! End-to-end API tests.
//!
//! Drives the full router over an in-memory bar store: screener runs,
//! saved screeners, universe listing, and stock detail.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use tickscan_common::config::Config;
use tickscan_screener::data::{Bar, LocalStorage, StockMeta};
use tickscan_screener::{build_router, ScreenerState};

// ============================================================================
// Fixtures
// ============================================================================

fn make_bars(symbol: &str, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            symbol: symbol.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000_000.0,
        })
        .collect()
}

async fn test_router() -> Router {
    let storage = LocalStorage::in_memory().unwrap();

    let universe = [
        ("ALPHA", "Alpha Industries", Some("Energy")),
        ("BETA", "Beta Labs", Some("Pharma")),
        ("GAMMA", "Gamma Traders", None),
    ];
    let stocks: Vec<StockMeta> = universe
        .iter()
        .map(|(symbol, name, sector)| StockMeta {
            symbol: symbol.to_string(),
            name: name.to_string(),
            sector: sector.map(String::from),
            industry: None,
            is_fno: false,
            market_cap: None,
        })
        .collect();
    storage.save_stocks(&stocks).await.unwrap();

    // ALPHA rises for 30 days, BETA falls, GAMMA has a single bar
    let rising: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
    let falling: Vec<f64> = (0..30).map(|i| 200.0 - 2.0 * i as f64).collect();
    storage.save_bars(&make_bars("ALPHA", &rising)).await.unwrap();
    storage.save_bars(&make_bars("BETA", &falling)).await.unwrap();
    storage.save_bars(&make_bars("GAMMA", &[50.0])).await.unwrap();

    let state = ScreenerState::with_storage(Config::default(), Arc::new(storage));
    build_router(Arc::new(state))
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health() {
    let router = test_router().await;
    let (status, body) = send(&router, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "tickscan-screener");
}

// ============================================================================
// Screener Runs
// ============================================================================

#[tokio::test]
async fn test_run_screener_oversold() {
    let router = test_router().await;
    let (status, body) = send(
        &router,
        post(
            "/api/screener/run",
            json!({"conditions": [{"field": "rsi14", "op": "<", "value": 30}]}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["date"], "2024-01-30");

    let row = &body["results"][0];
    assert_eq!(row["symbol"], "BETA");
    assert_eq!(row["name"], "Beta Labs");
    assert_eq!(row["sector"], "Pharma");
    assert!(row["rsi14"].as_f64().unwrap() < 30.0);
    assert!(row["close"].is_number());
    // Internal fields stay internal
    assert!(row.get("prev_supertrend_dir").is_none());
    assert!(row.get("date").is_none());
}

#[tokio::test]
async fn test_run_screener_field_comparison() {
    let router = test_router().await;
    let (status, body) = send(
        &router,
        post(
            "/api/screener/run",
            json!({"conditions": [
                {"field": "close", "op": ">", "value": "ema20"},
                {"field": "change_pct", "op": ">", "value": 0}
            ]}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let matched: Vec<&str> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["symbol"].as_str().unwrap())
        .collect();
    assert_eq!(matched, vec!["ALPHA"]);
}

#[tokio::test]
async fn test_run_screener_unknown_field_is_400() {
    let router = test_router().await;
    let (status, body) = send(
        &router,
        post(
            "/api/screener/run",
            json!({"conditions": [
                {"field": "rsi14", "op": "<", "value": 30},
                {"field": "ema13", "op": ">", "value": 1}
            ]}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("Unknown field"), "got: {}", message);
    assert!(body.get("results").is_none());
}

#[tokio::test]
async fn test_run_screener_rejects_literal_crossover() {
    let router = test_router().await;
    let (status, body) = send(
        &router,
        post(
            "/api/screener/run",
            json!({"conditions": [
                {"field": "ema50", "op": "crossed_above", "value": 200}
            ]}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("field name"));
}

#[tokio::test]
async fn test_run_screener_rejects_empty_conditions() {
    let router = test_router().await;
    let (status, body) = send(
        &router,
        post("/api/screener/run", json!({"conditions": []})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("no conditions"));
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let router = test_router().await;
    let payload = json!({"conditions": [{"field": "close", "op": ">", "value": 100}]});

    let (_, first) = send(&router, post("/api/screener/run", payload.clone())).await;
    let (_, second) = send(&router, post("/api/screener/run", payload)).await;

    assert_eq!(first["count"], second["count"]);
    let names = |body: &Value| {
        let mut v: Vec<String> = body["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["symbol"].as_str().unwrap().to_string())
            .collect();
        v.sort();
        v
    };
    assert_eq!(names(&first), names(&second));
}

// ============================================================================
// Saved Screeners
// ============================================================================

#[tokio::test]
async fn test_saved_screener_lifecycle() {
    let router = test_router().await;
    let conditions = json!([
        {"field": "rsi14", "op": "<", "value": 30.5},
        {"field": "close", "op": ">", "value": "ema20"}
    ]);

    let (status, body) = send(
        &router,
        post(
            "/api/screeners",
            json!({"name": "Oversold bounce", "conditions": conditions}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["id"].as_i64().unwrap();

    let (status, body) = send(&router, get("/api/screeners")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "Oversold bounce");

    let (status, body) = send(&router, get(&format!("/api/screeners/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["conditions"], conditions);
    assert!(body["created_at"].as_str().is_some());

    let (status, body) = send(&router, get(&format!("/api/screeners/{}", id + 1))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("Not found"));
}

#[tokio::test]
async fn test_save_screener_validates_conditions() {
    let router = test_router().await;
    let (status, body) = send(
        &router,
        post(
            "/api/screeners",
            json!({"name": "Broken", "conditions": [{"field": "bogus", "op": ">", "value": 1}]}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Unknown field"));

    let (status, _) = send(
        &router,
        post(
            "/api/screeners",
            json!({"name": "  ", "conditions": [{"field": "rsi14", "op": "<", "value": 30}]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Stocks
// ============================================================================

#[tokio::test]
async fn test_list_stocks_with_search() {
    let router = test_router().await;

    let (status, body) = send(&router, get("/api/stocks")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["stocks"][0]["symbol"], "ALPHA");

    let (status, body) = send(&router, get("/api/stocks?q=beta")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["stocks"][0]["symbol"], "BETA");
}

#[tokio::test]
async fn test_stock_detail() {
    let router = test_router().await;
    let (status, body) = send(&router, get("/api/stocks/ALPHA")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbol"], "ALPHA");
    assert_eq!(body["name"], "Alpha Industries");
    assert_eq!(body["recent_data"].as_array().unwrap().len(), 30);
    assert_eq!(body["recent_data"][0]["date"], "2024-01-01");

    let indicators = &body["latest_indicators"];
    assert_eq!(indicators["symbol"], "ALPHA");
    assert!(indicators["ema20"].is_number());
    assert!((indicators["close"].as_f64().unwrap() - 129.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_stock_detail_not_found() {
    let router = test_router().await;
    let (status, body) = send(&router, get("/api/stocks/NOSUCH")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("Not found"));
}
