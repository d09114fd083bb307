//! The per-bar indicator snapshot.

use chrono::NaiveDate;
use serde::Serialize;

/// All derived indicator values for one symbol on one day, plus the day's
/// own OHLCV fields.
///
/// A snapshot is computed once and never mutated. `None` means the field
/// is undefined because the trailing history is too short - it is a normal
/// state, not an error, and conditions over it evaluate false.
///
/// `date` and `prev_supertrend_dir` are engine-internal: resolvable in
/// conditions (the latter) but not part of the published result payload.
#[derive(Debug, Clone, Serialize)]
pub struct IndicatorSnapshot {
    #[serde(skip_serializing)]
    pub date: NaiveDate,

    // Price
    pub close: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub change_pct: Option<f64>,

    // Moving averages
    pub ema9: Option<f64>,
    pub ema20: Option<f64>,
    pub ema50: Option<f64>,
    pub ema100: Option<f64>,
    pub ema200: Option<f64>,
    pub sma20: Option<f64>,
    pub sma50: Option<f64>,
    pub sma200: Option<f64>,

    // Oscillators
    pub rsi14: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_hist: Option<f64>,
    pub adx14: Option<f64>,
    pub plus_di: Option<f64>,
    pub minus_di: Option<f64>,

    // Volatility
    pub atr14: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub supertrend: Option<f64>,
    pub supertrend_dir: Option<f64>,
    #[serde(skip_serializing)]
    pub prev_supertrend_dir: Option<f64>,

    // Volume
    pub volume: f64,
    pub vol_spike: Option<f64>,
    pub vol_avg20: Option<f64>,

    // Price levels
    pub high_52w: Option<f64>,
    pub low_52w: Option<f64>,
    pub high_20d: Option<f64>,
    pub low_20d: Option<f64>,
}

/// The latest two snapshots for a symbol, as consumed by condition
/// evaluation. `previous` is absent for single-bar histories.
#[derive(Debug, Clone)]
pub struct LatestSnapshots {
    pub current: IndicatorSnapshot,
    pub previous: Option<IndicatorSnapshot>,
}
