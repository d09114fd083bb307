//! Screening engine module.
//!
//! Turns a conjunction of field conditions into the subset of the universe
//! that currently satisfies it.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                        Screener run                                │
//! ├────────────────────────────────────────────────────────────────────┤
//! │                                                                    │
//! │  conditions ──▶ compile (validate once) ──▶ CompiledCondition[]    │
//! │                                                  │                 │
//! │  ┌───────────┐     ┌────────────────┐            ▼                 │
//! │  │ Bar store │────▶│ Indicator      │───▶ latest two snapshots     │
//! │  │ (SQLite)  │     │ engine         │            │                 │
//! │  └───────────┘     └────────────────┘            ▼                 │
//! │    one bounded task per symbol ──▶ evaluate (AND, short-circuit)   │
//! │                                                                    │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use tickscan_screener::screener::ScreenerEngine;
//!
//! let engine = ScreenerEngine::new(provider, None, true);
//! let run = engine.run(&conditions).await?;
//! println!("{} matches as of {:?}", run.results.len(), run.date);
//! ```

pub mod condition;
pub mod engine;
pub mod evaluator;
pub mod fields;

pub use condition::{compile, Condition, ConditionValue, Operator, ScreenerError};
pub use engine::{RunError, ScreenerEngine, ScreenerMatch, ScreenerRun};
pub use fields::{Field, FieldCategory};
