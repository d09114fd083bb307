//! Configuration management for Tickscan services.
//!
//! All Tickscan services share a unified configuration file at
//! `~/.tickscan/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Explicit config file values
//! 2. Environment variables (TICKSCAN_* prefix)
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `TICKSCAN_BIND_ADDRESS` → network.bind
//! - `TICKSCAN_SCREENER_PORT` → screener.port
//! - `TICKSCAN_DB_PATH` → screener.db_path
//! - `TICKSCAN_LOG_LEVEL` → observability.log_level
//! - `TICKSCAN_LOG_FORMAT` → observability.log_format

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".tickscan"),
        |dirs| dirs.home_dir().join(".tickscan"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Network Configuration
// ============================================================================

/// Global network configuration.
///
/// Controls the bind address for all services. Default is `127.0.0.1`
/// (local only). Set to `0.0.0.0` to allow remote access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Bind address for all services.
    #[serde(default = "default_bind_address")]
    pub bind: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".into()
}

// ============================================================================
// Screener Service Configuration
// ============================================================================

/// Configuration for the screener service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerConfig {
    /// HTTP port for the screener API
    #[serde(default = "default_screener_port")]
    pub port: u16,

    /// Path to the SQLite market database.
    /// Defaults to `~/.tickscan/market.db` when unset.
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// Concurrent per-symbol evaluation tasks.
    /// Defaults to available CPU parallelism when unset.
    #[serde(default)]
    pub workers: Option<usize>,

    /// Whether to cache computed snapshots between runs.
    /// Cache entries are keyed by the dataset version, so stale data
    /// is never served after bars change.
    #[serde(default = "default_true")]
    pub snapshot_cache: bool,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            port: default_screener_port(),
            db_path: None,
            workers: None,
            snapshot_cache: true,
        }
    }
}

fn default_screener_port() -> u16 {
    8091
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Observability configuration (logging).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Base log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format: "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Unified configuration for Tickscan services.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Network configuration
    #[serde(default)]
    pub network: NetworkConfig,

    /// Screener service configuration
    #[serde(default)]
    pub screener: ScreenerConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path, applying env overrides.
    ///
    /// A missing config file is not an error; defaults are used.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&config_path())?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from an explicit path (no env overrides).
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(bind) = std::env::var("TICKSCAN_BIND_ADDRESS") {
            self.network.bind = bind;
        }
        if let Ok(port) = std::env::var("TICKSCAN_SCREENER_PORT") {
            if let Ok(port) = port.parse() {
                self.screener.port = port;
            }
        }
        if let Ok(db_path) = std::env::var("TICKSCAN_DB_PATH") {
            self.screener.db_path = Some(PathBuf::from(db_path));
        }
        if let Ok(level) = std::env::var("TICKSCAN_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Ok(format) = std::env::var("TICKSCAN_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }

    /// Resolved market database path.
    pub fn db_path(&self) -> PathBuf {
        self.screener
            .db_path
            .clone()
            .unwrap_or_else(|| config_dir().join("market.db"))
    }
}
