//! Windowed series primitives shared by the indicator computations.
//!
//! All functions return vectors aligned with their input: index i of the
//! output describes the same bar as index i of the input. `None` means the
//! value is undefined because not enough history exists yet.

use statrs::statistics::Statistics;

/// Simple moving average: mean of the trailing `period` values.
///
/// Undefined until `period` values exist.
pub fn sma_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let mut window_sum: f64 = values[..period].iter().sum();
    out[period - 1] = Some(window_sum / period as f64);

    for i in period..values.len() {
        window_sum += values[i] - values[i - period];
        out[i] = Some(window_sum / period as f64);
    }

    out
}

/// Exponential moving average, seeded by the SMA of the first `period`
/// values, then `ema = value * k + prev * (1 - k)` with `k = 2/(period+1)`.
///
/// Undefined before the seed point.
pub fn ema_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema: f64 = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(ema);

    for i in period..values.len() {
        ema = values[i] * k + ema * (1.0 - k);
        out[i] = Some(ema);
    }

    out
}

/// Wilder smoothing (alpha = 1/period), seeded by the arithmetic mean of
/// the first `period` values: `s = (prev * (period - 1) + value) / period`.
///
/// Used by RSI average gain/loss and ATR.
pub fn wilder_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let mut smoothed: f64 = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(smoothed);

    for i in period..values.len() {
        smoothed = (smoothed * (period as f64 - 1.0) + values[i]) / period as f64;
        out[i] = Some(smoothed);
    }

    out
}

/// Population standard deviation over the trailing `period` values.
///
/// Undefined until `period` values exist.
pub fn rolling_std_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    for i in (period - 1)..values.len() {
        let window = &values[i + 1 - period..=i];
        out[i] = Some(window.population_std_dev());
    }

    out
}

/// Rolling maximum over the trailing `window` values, shrinking to the
/// available prefix at the start of history. Defined from the first value.
pub fn rolling_max_series(values: &[f64], window: usize) -> Vec<f64> {
    rolling_extreme(values, window, f64::max, f64::NEG_INFINITY)
}

/// Rolling minimum over the trailing `window` values, shrinking to the
/// available prefix at the start of history. Defined from the first value.
pub fn rolling_min_series(values: &[f64], window: usize) -> Vec<f64> {
    rolling_extreme(values, window, f64::min, f64::INFINITY)
}

fn rolling_extreme(
    values: &[f64],
    window: usize,
    pick: fn(f64, f64) -> f64,
    identity: f64,
) -> Vec<f64> {
    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let start = (i + 1).saturating_sub(window);
            values[start..=i].iter().copied().fold(identity, pick)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_sma_undefined_until_window_full() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let sma = sma_series(&values, 3);

        assert!(sma[0].is_none());
        assert!(sma[1].is_none());
        assert!((sma[2].unwrap() - 2.0).abs() < EPS);
        assert!((sma[3].unwrap() - 3.0).abs() < EPS);
        assert!((sma[4].unwrap() - 4.0).abs() < EPS);
    }

    #[test]
    fn test_sma_shorter_than_window() {
        let sma = sma_series(&[1.0, 2.0], 5);
        assert!(sma.iter().all(Option::is_none));
    }

    #[test]
    fn test_ema_seed_equals_sma() {
        let values = [10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0];
        for period in [2, 3, 5] {
            let ema = ema_series(&values, period);
            let sma = sma_series(&values, period);
            assert!(
                (ema[period - 1].unwrap() - sma[period - 1].unwrap()).abs() < EPS,
                "EMA({}) seed must equal SMA({})",
                period,
                period
            );
        }
    }

    #[test]
    fn test_ema_recurrence() {
        let values = [10.0, 12.0, 14.0, 16.0];
        let ema = ema_series(&values, 2);
        // seed = (10 + 12) / 2 = 11; k = 2/3
        let k = 2.0 / 3.0;
        let e2 = 14.0 * k + 11.0 * (1.0 - k);
        let e3 = 16.0 * k + e2 * (1.0 - k);
        assert!((ema[1].unwrap() - 11.0).abs() < EPS);
        assert!((ema[2].unwrap() - e2).abs() < EPS);
        assert!((ema[3].unwrap() - e3).abs() < EPS);
    }

    #[test]
    fn test_ema_converges_toward_constant() {
        let values = vec![50.0; 40];
        let ema = ema_series(&values, 9);
        assert!((ema[39].unwrap() - 50.0).abs() < EPS);
    }

    #[test]
    fn test_wilder_seed_and_step() {
        let values = [4.0, 6.0, 8.0, 10.0];
        let smoothed = wilder_series(&values, 2);
        // seed = (4 + 6) / 2 = 5
        assert!((smoothed[1].unwrap() - 5.0).abs() < EPS);
        // (5 * 1 + 8) / 2 = 6.5
        assert!((smoothed[2].unwrap() - 6.5).abs() < EPS);
        // (6.5 * 1 + 10) / 2 = 8.25
        assert!((smoothed[3].unwrap() - 8.25).abs() < EPS);
    }

    #[test]
    fn test_rolling_std_population() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let std = rolling_std_series(&values, 8);
        // Classic population-stddev example: exactly 2.0
        assert!((std[7].unwrap() - 2.0).abs() < EPS);
        assert!(std[6].is_none());
    }

    #[test]
    fn test_rolling_extremes_prefix_behavior() {
        let values = [5.0, 3.0, 8.0, 1.0, 6.0];
        let max = rolling_max_series(&values, 3);
        let min = rolling_min_series(&values, 3);

        // Prefix shorter than the window still yields a value
        assert!((max[0] - 5.0).abs() < EPS);
        assert!((min[0] - 5.0).abs() < EPS);
        assert!((max[1] - 5.0).abs() < EPS);
        assert!((min[1] - 3.0).abs() < EPS);

        // Full windows
        assert!((max[2] - 8.0).abs() < EPS);
        assert!((max[4] - 8.0).abs() < EPS);
        assert!((min[3] - 1.0).abs() < EPS);
        assert!((min[4] - 1.0).abs() < EPS);
    }
}
