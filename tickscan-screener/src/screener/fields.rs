//! The field registry.
//!
//! A closed mapping from field names to snapshot accessors, shared by the
//! indicator engine (what to publish) and the condition evaluator (how to
//! read). Unknown names fail at condition-compile time, never during
//! per-symbol evaluation.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::indicators::IndicatorSnapshot;

/// Category a field belongs to in the published catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCategory {
    Price,
    MovingAverage,
    Oscillator,
    Volatility,
    Volume,
    PriceLevel,
    /// Evaluator-only synthetic fields, not part of the published catalog
    Synthetic,
}

/// A screenable field.
///
/// The set is closed: every variant carries its wire name and an accessor
/// into `IndicatorSnapshot`, so an unknown field is unrepresentable after
/// parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    // Price
    Close,
    Open,
    High,
    Low,
    ChangePct,
    // Moving averages
    Ema9,
    Ema20,
    Ema50,
    Ema100,
    Ema200,
    Sma20,
    Sma50,
    Sma200,
    // Oscillators
    Rsi14,
    Macd,
    MacdSignal,
    MacdHist,
    Adx14,
    PlusDi,
    MinusDi,
    // Volatility
    Atr14,
    BbUpper,
    BbMiddle,
    BbLower,
    Supertrend,
    SupertrendDir,
    // Volume
    Volume,
    VolSpike,
    VolAvg20,
    // Price levels
    High52w,
    Low52w,
    High20d,
    Low20d,
    // Synthetic
    PrevSupertrendDir,
}

impl Field {
    /// Every registered field, published and synthetic.
    pub const ALL: &'static [Field] = &[
        Field::Close,
        Field::Open,
        Field::High,
        Field::Low,
        Field::ChangePct,
        Field::Ema9,
        Field::Ema20,
        Field::Ema50,
        Field::Ema100,
        Field::Ema200,
        Field::Sma20,
        Field::Sma50,
        Field::Sma200,
        Field::Rsi14,
        Field::Macd,
        Field::MacdSignal,
        Field::MacdHist,
        Field::Adx14,
        Field::PlusDi,
        Field::MinusDi,
        Field::Atr14,
        Field::BbUpper,
        Field::BbMiddle,
        Field::BbLower,
        Field::Supertrend,
        Field::SupertrendDir,
        Field::Volume,
        Field::VolSpike,
        Field::VolAvg20,
        Field::High52w,
        Field::Low52w,
        Field::High20d,
        Field::Low20d,
        Field::PrevSupertrendDir,
    ];

    /// Wire name of the field.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Field::Close => "close",
            Field::Open => "open",
            Field::High => "high",
            Field::Low => "low",
            Field::ChangePct => "change_pct",
            Field::Ema9 => "ema9",
            Field::Ema20 => "ema20",
            Field::Ema50 => "ema50",
            Field::Ema100 => "ema100",
            Field::Ema200 => "ema200",
            Field::Sma20 => "sma20",
            Field::Sma50 => "sma50",
            Field::Sma200 => "sma200",
            Field::Rsi14 => "rsi14",
            Field::Macd => "macd",
            Field::MacdSignal => "macd_signal",
            Field::MacdHist => "macd_hist",
            Field::Adx14 => "adx14",
            Field::PlusDi => "plus_di",
            Field::MinusDi => "minus_di",
            Field::Atr14 => "atr14",
            Field::BbUpper => "bb_upper",
            Field::BbMiddle => "bb_middle",
            Field::BbLower => "bb_lower",
            Field::Supertrend => "supertrend",
            Field::SupertrendDir => "supertrend_dir",
            Field::Volume => "volume",
            Field::VolSpike => "vol_spike",
            Field::VolAvg20 => "vol_avg20",
            Field::High52w => "high_52w",
            Field::Low52w => "low_52w",
            Field::High20d => "high_20d",
            Field::Low20d => "low_20d",
            Field::PrevSupertrendDir => "prev_supertrend_dir",
        }
    }

    /// Look up a field by wire name.
    pub fn parse(name: &str) -> Option<Field> {
        static BY_NAME: Lazy<HashMap<&'static str, Field>> = Lazy::new(|| {
            Field::ALL.iter().map(|f| (f.as_str(), *f)).collect()
        });
        BY_NAME.get(name).copied()
    }

    /// Catalog category.
    pub const fn category(&self) -> FieldCategory {
        match self {
            Field::Close | Field::Open | Field::High | Field::Low | Field::ChangePct => {
                FieldCategory::Price
            }
            Field::Ema9
            | Field::Ema20
            | Field::Ema50
            | Field::Ema100
            | Field::Ema200
            | Field::Sma20
            | Field::Sma50
            | Field::Sma200 => FieldCategory::MovingAverage,
            Field::Rsi14
            | Field::Macd
            | Field::MacdSignal
            | Field::MacdHist
            | Field::Adx14
            | Field::PlusDi
            | Field::MinusDi => FieldCategory::Oscillator,
            Field::Atr14
            | Field::BbUpper
            | Field::BbMiddle
            | Field::BbLower
            | Field::Supertrend
            | Field::SupertrendDir => FieldCategory::Volatility,
            Field::Volume | Field::VolSpike | Field::VolAvg20 => FieldCategory::Volume,
            Field::High52w | Field::Low52w | Field::High20d | Field::Low20d => {
                FieldCategory::PriceLevel
            }
            Field::PrevSupertrendDir => FieldCategory::Synthetic,
        }
    }

    /// Whether the field appears in published screener results.
    pub const fn is_published(&self) -> bool {
        !matches!(self.category(), FieldCategory::Synthetic)
    }

    /// Read this field's value from a snapshot.
    pub fn resolve(&self, snapshot: &IndicatorSnapshot) -> Option<f64> {
        match self {
            Field::Close => Some(snapshot.close),
            Field::Open => Some(snapshot.open),
            Field::High => Some(snapshot.high),
            Field::Low => Some(snapshot.low),
            Field::ChangePct => snapshot.change_pct,
            Field::Ema9 => snapshot.ema9,
            Field::Ema20 => snapshot.ema20,
            Field::Ema50 => snapshot.ema50,
            Field::Ema100 => snapshot.ema100,
            Field::Ema200 => snapshot.ema200,
            Field::Sma20 => snapshot.sma20,
            Field::Sma50 => snapshot.sma50,
            Field::Sma200 => snapshot.sma200,
            Field::Rsi14 => snapshot.rsi14,
            Field::Macd => snapshot.macd,
            Field::MacdSignal => snapshot.macd_signal,
            Field::MacdHist => snapshot.macd_hist,
            Field::Adx14 => snapshot.adx14,
            Field::PlusDi => snapshot.plus_di,
            Field::MinusDi => snapshot.minus_di,
            Field::Atr14 => snapshot.atr14,
            Field::BbUpper => snapshot.bb_upper,
            Field::BbMiddle => snapshot.bb_middle,
            Field::BbLower => snapshot.bb_lower,
            Field::Supertrend => snapshot.supertrend,
            Field::SupertrendDir => snapshot.supertrend_dir,
            Field::Volume => Some(snapshot.volume),
            Field::VolSpike => snapshot.vol_spike,
            Field::VolAvg20 => snapshot.vol_avg20,
            Field::High52w => snapshot.high_52w,
            Field::Low52w => snapshot.low_52w,
            Field::High20d => snapshot.high_20d,
            Field::Low20d => snapshot.low_20d,
            Field::PrevSupertrendDir => snapshot.prev_supertrend_dir,
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_field_parses_by_its_own_name() {
        for field in Field::ALL {
            assert_eq!(Field::parse(field.as_str()), Some(*field));
        }
    }

    #[test]
    fn test_unknown_names_do_not_parse() {
        assert!(Field::parse("ema13").is_none());
        assert!(Field::parse("CLOSE").is_none());
        assert!(Field::parse("").is_none());
    }

    #[test]
    fn test_names_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for field in Field::ALL {
            assert!(seen.insert(field.as_str()), "duplicate name {}", field);
        }
    }

    #[test]
    fn test_published_catalog_counts() {
        let by_category = |cat: FieldCategory| {
            Field::ALL.iter().filter(|f| f.category() == cat).count()
        };

        assert_eq!(by_category(FieldCategory::Price), 5);
        assert_eq!(by_category(FieldCategory::MovingAverage), 8);
        assert_eq!(by_category(FieldCategory::Oscillator), 7);
        assert_eq!(by_category(FieldCategory::Volatility), 6);
        assert_eq!(by_category(FieldCategory::Volume), 3);
        assert_eq!(by_category(FieldCategory::PriceLevel), 4);
        assert_eq!(by_category(FieldCategory::Synthetic), 1);
    }

    #[test]
    fn test_prev_supertrend_dir_resolvable_but_unpublished() {
        let field = Field::parse("prev_supertrend_dir").unwrap();
        assert_eq!(field, Field::PrevSupertrendDir);
        assert!(!field.is_published());
        assert!(Field::SupertrendDir.is_published());
    }
}
