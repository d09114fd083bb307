//! Indicator computation pipeline.
//!
//! Turns one symbol's ordered daily bars into per-bar snapshots of derived
//! indicator values. All indicators follow the standard textbook
//! definitions (Wilder smoothing for RSI/ATR/ADX, SMA-seeded EMAs), and
//! insufficient history is always an explicit `None` - never a zero or a
//! silent NaN.
//!
//! # Structure
//!
//! - `series` - windowed primitives (SMA/EMA/Wilder/rolling extremes)
//! - `directional` - true range, ATR, and the +DI/-DI/ADX system
//! - `supertrend` - ATR-band trend follower with ratchet + flip rules
//! - `engine` - assembles everything into per-bar snapshots
//! - `snapshot` - the snapshot type itself

pub mod directional;
pub mod engine;
pub mod series;
pub mod snapshot;
pub mod supertrend;

pub use engine::IndicatorEngine;
pub use snapshot::{IndicatorSnapshot, LatestSnapshots};
