pub mod app;
pub mod config;
pub mod error;

pub use app::App;
pub use config::{Config, DatabaseConfig, UiConfig, ValidationResult, WeatherConfig};
pub use error::{
    AppError, ConfigError, DatabaseError, NetworkError, ReqwestErrorExt, WeatherError,
};

use anyhow::Result;

/// Initialize logging for the application.
///
/// Safe to call more than once; only the first call installs the subscriber.
pub fn init() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    tracing::info!("Kerala weather core initialized");
    Ok(())
}
