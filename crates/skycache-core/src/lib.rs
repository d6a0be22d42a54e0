pub mod clock;
pub mod config;

pub use clock::{Clock, SystemClock};
pub use config::{Config, ValidationResult, WeatherConfig};

use anyhow::Result;

/// Initialize the core: logging via tracing with env-filter support.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Skycache core initialized");
    Ok(())
}
