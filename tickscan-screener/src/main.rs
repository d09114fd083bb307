//! Tickscan Screener - technical-analysis screening service.
//!
//! Serves the screener API: indicator snapshots over a daily-bar
//! universe, condition evaluation, and saved screener definitions.

use anyhow::Result;
use tickscan_common::config::Config;
use tickscan_common::logging::init_logging;
use tickscan_screener::ScreenerService;

#[tokio::main]
async fn main() -> Result<()> {
    let startup_start = std::time::Instant::now();

    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("Tickscan Screener v{}", env!("CARGO_PKG_VERSION"));

    let service = ScreenerService::new(config)?;

    let startup_duration = startup_start.elapsed();
    tracing::info!(
        duration_ms = startup_duration.as_millis() as u64,
        "Service initialized in {:?}",
        startup_duration
    );

    service.start().await
}
