use anyhow::Result;
use std::sync::Arc;

use crate::{Config, ValidationResult};

/// Main application state and lifecycle manager
pub struct App {
    config: Arc<Config>,
    validation: ValidationResult,
}

impl App {
    /// Create a new application instance from the on-disk configuration
    pub fn new() -> Result<Self> {
        let (config, validation) = Config::load_validated()?;
        Ok(Self::with_config(config, validation))
    }

    /// Create an application instance around an already-loaded configuration
    pub fn with_config(config: Config, validation: ValidationResult) -> Self {
        Self {
            config: Arc::new(config),
            validation,
        }
    }

    /// Log the effective configuration
    pub fn initialize(&mut self) -> Result<()> {
        tracing::info!(
            "Initializing application (database: {}, api: {}, workers: {})",
            self.config.database.path.display(),
            self.config.weather.api_base_url,
            self.config.weather.max_concurrent_fetches
        );

        if !self.validation.warnings.is_empty() {
            tracing::info!(
                "Configuration loaded with {} warning(s)",
                self.validation.warnings.len()
            );
        }

        Ok(())
    }

    /// Shutdown the application
    pub fn shutdown(&mut self) -> Result<()> {
        tracing::info!("Shutting down application");
        Ok(())
    }

    /// Get reference to application config
    pub fn config(&self) -> &Config {
        &self.config
    }
}
