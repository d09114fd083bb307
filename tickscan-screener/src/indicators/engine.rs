//! The indicator engine.
//!
//! Consumes one symbol's full daily-bar history and produces one
//! `IndicatorSnapshot` per bar, same length and order as the input. The
//! engine is stateless; all history dependence lives in the series math.

use super::directional::{atr_series, directional_series};
use super::series::{ema_series, rolling_max_series, rolling_min_series, rolling_std_series, sma_series, wilder_series};
use super::snapshot::{IndicatorSnapshot, LatestSnapshots};
use super::supertrend::supertrend_series;
use crate::data::Bar;

const RSI_PERIOD: usize = 14;
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const ADX_PERIOD: usize = 14;
const ATR_PERIOD: usize = 14;
const BB_PERIOD: usize = 20;
const BB_WIDTH: f64 = 2.0;
const SUPERTREND_PERIOD: usize = 10;
const SUPERTREND_MULTIPLIER: f64 = 3.0;
const VOLUME_PERIOD: usize = 20;
const WEEK_52_WINDOW: usize = 252;
const DAYS_20_WINDOW: usize = 20;

/// Computes indicator snapshots from bar history.
#[derive(Debug, Default)]
pub struct IndicatorEngine;

impl IndicatorEngine {
    pub fn new() -> Self {
        Self
    }

    /// Compute a snapshot for every input bar.
    pub fn compute(&self, bars: &[Bar]) -> Vec<IndicatorSnapshot> {
        if bars.is_empty() {
            return Vec::new();
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

        let ema9 = ema_series(&closes, 9);
        let ema20 = ema_series(&closes, 20);
        let ema50 = ema_series(&closes, 50);
        let ema100 = ema_series(&closes, 100);
        let ema200 = ema_series(&closes, 200);
        let sma20 = sma_series(&closes, 20);
        let sma50 = sma_series(&closes, 50);
        let sma200 = sma_series(&closes, 200);

        let rsi14 = rsi_series(&closes, RSI_PERIOD);
        let (macd, macd_signal, macd_hist) = macd_series(&closes);
        let directional = directional_series(bars, ADX_PERIOD);
        let atr14 = atr_series(bars, ATR_PERIOD);

        let bb_std = rolling_std_series(&closes, BB_PERIOD);
        let supertrend = supertrend_series(bars, SUPERTREND_PERIOD, SUPERTREND_MULTIPLIER);

        let vol_avg20 = sma_series(&volumes, VOLUME_PERIOD);

        let high_52w = rolling_max_series(&highs, WEEK_52_WINDOW);
        let low_52w = rolling_min_series(&lows, WEEK_52_WINDOW);
        let high_20d = rolling_max_series(&highs, DAYS_20_WINDOW);
        let low_20d = rolling_min_series(&lows, DAYS_20_WINDOW);

        bars.iter()
            .enumerate()
            .map(|(i, bar)| {
                let change_pct = if i > 0 && bars[i - 1].close != 0.0 {
                    Some((bar.close - bars[i - 1].close) / bars[i - 1].close * 100.0)
                } else {
                    None
                };

                let bb_middle = sma20[i];
                let (bb_upper, bb_lower) = match (bb_middle, bb_std[i]) {
                    (Some(mid), Some(std)) => {
                        (Some(mid + BB_WIDTH * std), Some(mid - BB_WIDTH * std))
                    }
                    _ => (None, None),
                };

                let vol_spike = match vol_avg20[i] {
                    Some(avg) if avg > 0.0 => Some(bar.volume / avg),
                    _ => None,
                };

                let st_point = supertrend[i];
                let prev_supertrend_dir = if i > 0 {
                    supertrend[i - 1].map(|p| p.direction)
                } else {
                    None
                };

                IndicatorSnapshot {
                    date: bar.date,
                    close: bar.close,
                    open: bar.open,
                    high: bar.high,
                    low: bar.low,
                    change_pct,
                    ema9: ema9[i],
                    ema20: ema20[i],
                    ema50: ema50[i],
                    ema100: ema100[i],
                    ema200: ema200[i],
                    sma20: sma20[i],
                    sma50: sma50[i],
                    sma200: sma200[i],
                    rsi14: rsi14[i],
                    macd: macd[i],
                    macd_signal: macd_signal[i],
                    macd_hist: macd_hist[i],
                    adx14: directional.adx[i],
                    plus_di: directional.plus_di[i],
                    minus_di: directional.minus_di[i],
                    atr14: atr14[i],
                    bb_upper,
                    bb_middle,
                    bb_lower,
                    supertrend: st_point.map(|p| p.value),
                    supertrend_dir: st_point.map(|p| p.direction),
                    prev_supertrend_dir,
                    volume: bar.volume,
                    vol_spike,
                    vol_avg20: vol_avg20[i],
                    high_52w: Some(high_52w[i]),
                    low_52w: Some(low_52w[i]),
                    high_20d: Some(high_20d[i]),
                    low_20d: Some(low_20d[i]),
                }
            })
            .collect()
    }

    /// Compute only the latest two snapshots, as condition evaluation needs.
    pub fn compute_latest(&self, bars: &[Bar]) -> Option<LatestSnapshots> {
        let mut snapshots = self.compute(bars);
        let current = snapshots.pop()?;
        let previous = snapshots.pop();
        Some(LatestSnapshots { current, previous })
    }
}

/// RSI: Wilder-smoothed average gain over average loss.
///
/// A zero average loss pins RSI at 100 rather than dividing by zero.
fn rsi_series(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = closes.len();
    let mut out = vec![None; n];
    if n < 2 {
        return out;
    }

    let mut gains = Vec::with_capacity(n - 1);
    let mut losses = Vec::with_capacity(n - 1);
    for i in 1..n {
        let change = closes[i] - closes[i - 1];
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let avg_gain = wilder_series(&gains, period);
    let avg_loss = wilder_series(&losses, period);

    for j in 0..n - 1 {
        if let (Some(gain), Some(loss)) = (avg_gain[j], avg_loss[j]) {
            let rsi = if loss == 0.0 {
                100.0
            } else {
                let rs = gain / loss;
                100.0 - 100.0 / (1.0 + rs)
            };
            out[j + 1] = Some(rsi);
        }
    }

    out
}

/// MACD line, signal line, and histogram.
///
/// Signal is the EMA of the MACD line's defined region, seeded the same
/// way every EMA here is (by its leading SMA).
fn macd_series(closes: &[f64]) -> (Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>) {
    let n = closes.len();
    let fast = ema_series(closes, MACD_FAST);
    let slow = ema_series(closes, MACD_SLOW);

    let mut macd = vec![None; n];
    let mut defined = Vec::new();
    let mut start = None;
    for i in 0..n {
        if let (Some(f), Some(s)) = (fast[i], slow[i]) {
            macd[i] = Some(f - s);
            start.get_or_insert(i);
            defined.push(f - s);
        }
    }

    let mut signal = vec![None; n];
    if let Some(start) = start {
        for (j, value) in ema_series(&defined, MACD_SIGNAL).into_iter().enumerate() {
            signal[start + j] = value;
        }
    }

    let hist = (0..n)
        .map(|i| match (macd[i], signal[i]) {
            (Some(m), Some(s)) => Some(m - s),
            _ => None,
        })
        .collect();

    (macd, signal, hist)
}
