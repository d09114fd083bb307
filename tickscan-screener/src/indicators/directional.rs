//! Wilder's volatility and directional-movement system.
//!
//! True range, ATR, and the +DI/-DI/ADX trio. Everything here follows
//! Wilder's original conventions: the first true range with a prior close
//! is the first smoothed input, TR/DM are smoothed as running sums
//! (`s = s - s/n + x`), and ADX is the Wilder-smoothed mean of DX.

use super::series::wilder_series;
use crate::data::Bar;

/// Per-bar true range. The first bar has no prior close and falls back to
/// its plain high-low range.
pub fn true_range_series(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let prev_close = i.checked_sub(1).map(|p| bars[p].close);
            bar.true_range(prev_close)
        })
        .collect()
}

/// Average true range over `period`, Wilder-smoothed.
///
/// Only true ranges computed against a prior close participate, so the
/// value is defined from bar index `period` onward.
pub fn atr_series(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; bars.len()];
    if bars.len() < 2 {
        return out;
    }

    let tr = true_range_series(bars);
    let smoothed = wilder_series(&tr[1..], period);
    for (j, value) in smoothed.into_iter().enumerate() {
        out[j + 1] = value;
    }

    out
}

/// Output of the directional-movement system, aligned to the input bars.
#[derive(Debug, Clone)]
pub struct DirectionalSeries {
    pub plus_di: Vec<Option<f64>>,
    pub minus_di: Vec<Option<f64>>,
    pub adx: Vec<Option<f64>>,
}

/// Compute +DI, -DI, and ADX over `period`.
///
/// DI values are defined from bar index `period`; ADX needs a further
/// `period` DX values, so it is defined from bar index `2 * period - 1`.
pub fn directional_series(bars: &[Bar], period: usize) -> DirectionalSeries {
    let n = bars.len();
    let mut result = DirectionalSeries {
        plus_di: vec![None; n],
        minus_di: vec![None; n],
        adx: vec![None; n],
    };
    if n < 2 || period == 0 {
        return result;
    }

    // Per-bar movement inputs, index j describes bar j + 1
    let mut plus_dm = Vec::with_capacity(n - 1);
    let mut minus_dm = Vec::with_capacity(n - 1);
    let mut tr = Vec::with_capacity(n - 1);
    for i in 1..n {
        let up = bars[i].high - bars[i - 1].high;
        let down = bars[i - 1].low - bars[i].low;
        plus_dm.push(if up > down && up > 0.0 { up } else { 0.0 });
        minus_dm.push(if down > up && down > 0.0 { down } else { 0.0 });
        tr.push(bars[i].true_range(Some(bars[i - 1].close)));
    }

    let smoothed_plus = wilder_sum_series(&plus_dm, period);
    let smoothed_minus = wilder_sum_series(&minus_dm, period);
    let smoothed_tr = wilder_sum_series(&tr, period);

    // DX values in bar order, for the ADX smoothing below
    let mut dx_values = Vec::new();
    let mut dx_start = None;

    for j in 0..n - 1 {
        let (Some(sp), Some(sm), Some(st)) =
            (smoothed_plus[j], smoothed_minus[j], smoothed_tr[j])
        else {
            continue;
        };

        let bar_idx = j + 1;
        let plus = if st > 0.0 { 100.0 * sp / st } else { 0.0 };
        let minus = if st > 0.0 { 100.0 * sm / st } else { 0.0 };
        result.plus_di[bar_idx] = Some(plus);
        result.minus_di[bar_idx] = Some(minus);

        let di_sum = plus + minus;
        let dx = if di_sum > 0.0 {
            100.0 * (plus - minus).abs() / di_sum
        } else {
            0.0
        };
        dx_start.get_or_insert(bar_idx);
        dx_values.push(dx);
    }

    if let Some(start) = dx_start {
        let adx = wilder_series(&dx_values, period);
        for (j, value) in adx.into_iter().enumerate() {
            result.adx[start + j] = value;
        }
    }

    result
}

/// Wilder's running-sum smoothing for TR/DM: seeded with the plain sum of
/// the first `period` values, then `s = s - s/period + x`.
fn wilder_sum_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let mut smoothed: f64 = values[..period].iter().sum();
    out[period - 1] = Some(smoothed);

    for i in period..values.len() {
        smoothed = smoothed - smoothed / period as f64 + values[i];
        out[i] = Some(smoothed);
    }

    out
}
