//! Shared building blocks for Tickscan services.
//!
//! Provides the pieces every service needs and none should reimplement:
//! configuration loading, the common error type, and logging setup.

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
