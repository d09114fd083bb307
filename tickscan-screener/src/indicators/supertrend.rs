//! Supertrend indicator.
//!
//! ATR-band trend follower with the standard ratchet and flip rules:
//! bands tighten but never loosen while a trend holds, the direction flips
//! when the close crosses the prior opposite band, and the indicator value
//! is the band on the active side of price.

use super::directional::atr_series;
use crate::data::Bar;

/// One bar's supertrend state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupertrendPoint {
    /// The active band value (lower band in an uptrend, upper in a downtrend)
    pub value: f64,
    /// Trend direction: 1.0 up, -1.0 down
    pub direction: f64,
}

/// Compute Supertrend over `period` with the given ATR `multiplier`.
///
/// Undefined until ATR(`period`) is defined. The first defined bar seeds
/// the trend as up; flips require a close beyond the prior bar's band.
pub fn supertrend_series(bars: &[Bar], period: usize, multiplier: f64) -> Vec<Option<SupertrendPoint>> {
    let mut out = vec![None; bars.len()];
    let atr = atr_series(bars, period);

    let mut prev_final_upper = f64::NAN;
    let mut prev_final_lower = f64::NAN;
    let mut prev_direction = 0.0;
    let mut seeded = false;

    for (i, bar) in bars.iter().enumerate() {
        let Some(atr_value) = atr[i] else {
            continue;
        };

        let mid = bar.midpoint();
        let basic_upper = mid + multiplier * atr_value;
        let basic_lower = mid - multiplier * atr_value;

        let (final_upper, final_lower, direction) = if !seeded {
            seeded = true;
            (basic_upper, basic_lower, 1.0)
        } else {
            let prev_close = bars[i - 1].close;

            // Ratchet: the upper band may only fall while price stays below
            // it, the lower band may only rise while price stays above it.
            let final_upper = if basic_upper < prev_final_upper || prev_close > prev_final_upper {
                basic_upper
            } else {
                prev_final_upper
            };
            let final_lower = if basic_lower > prev_final_lower || prev_close < prev_final_lower {
                basic_lower
            } else {
                prev_final_lower
            };

            let direction = if bar.close > prev_final_upper {
                1.0
            } else if bar.close < prev_final_lower {
                -1.0
            } else {
                prev_direction
            };

            (final_upper, final_lower, direction)
        };

        let value = if direction > 0.0 { final_lower } else { final_upper };
        out[i] = Some(SupertrendPoint { value, direction });

        prev_final_upper = final_upper;
        prev_final_lower = final_lower;
        prev_direction = direction;
    }

    out
}
