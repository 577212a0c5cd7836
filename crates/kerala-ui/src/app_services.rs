//! Centralized application services.
//!
//! `AppServices` owns the tokio runtime, the sync routine and the weather
//! service channel. Both halves of the channel live here so any number of
//! requests can share one sender while the UI thread drains the receiver.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;

use kerala_core::Config;
use kerala_store::ReadingClient;
use kerala_weather::{DistrictRegistry, WeatherProvider, WeatherSync};

/// Message types for the weather service channel
pub use crate::services::WeatherServiceMessage;

pub struct AppServices {
    /// Tokio runtime for async operations
    runtime: tokio::runtime::Runtime,

    weather_sync: Arc<WeatherSync>,

    /// Why the store could not be opened, if it could not
    store_issue: Option<String>,

    weather_service_tx: Sender<WeatherServiceMessage>,
    weather_service_rx: Mutex<Receiver<WeatherServiceMessage>>,
}

impl AppServices {
    /// Build the provider, registry and store described by `config`.
    ///
    /// A store that cannot be opened does not fail startup; it is recorded
    /// and every store operation reports it.
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = WeatherProvider::with_base_url(&config.weather.api_base_url)
            .with_context(|| format!("Invalid weather API URL {}", config.weather.api_base_url))?;
        let registry = DistrictRegistry::kerala().context("Built-in district table is invalid")?;

        let store = ReadingClient::open(&config.database.path);
        let store_issue = store.unavailable_reason().map(str::to_string);

        let sync = WeatherSync::new(Arc::new(provider), Arc::new(store), Arc::new(registry))
            .with_max_concurrent(config.weather.max_concurrent_fetches);

        Self::new(sync, store_issue)
    }

    pub fn new(weather_sync: WeatherSync, store_issue: Option<String>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("kerala-tokio")
            .build()
            .context("Failed to create tokio runtime")?;

        let (tx, rx) = mpsc::channel();

        Ok(Self {
            runtime,
            weather_sync: Arc::new(weather_sync),
            store_issue,
            weather_service_tx: tx,
            weather_service_rx: Mutex::new(rx),
        })
    }

    pub fn runtime(&self) -> tokio::runtime::Handle {
        self.runtime.handle().clone()
    }

    pub fn weather_sync(&self) -> Arc<WeatherSync> {
        Arc::clone(&self.weather_sync)
    }

    pub fn store_issue(&self) -> Option<&str> {
        self.store_issue.as_deref()
    }

    pub fn weather_sender(&self) -> &Sender<WeatherServiceMessage> {
        &self.weather_service_tx
    }

    /// Next pending message, without blocking.
    pub fn try_recv(&self) -> Option<WeatherServiceMessage> {
        self.weather_service_rx.lock().try_recv().ok()
    }

    /// Wait up to `timeout` for the next message.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<WeatherServiceMessage> {
        match self.weather_service_rx.lock().recv_timeout(timeout) {
            Ok(msg) => Some(msg),
            Err(RecvTimeoutError::Timeout) => None,
            // Unreachable while we hold a sender
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Stop the runtime, giving in-flight work a moment to finish.
    pub fn shutdown(self) {
        tracing::info!("Shutting down services");
        self.runtime.shutdown_timeout(Duration::from_secs(5));
    }
}
