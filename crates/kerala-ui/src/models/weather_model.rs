use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use kerala_core::{AppError, DatabaseError};
use kerala_weather::{BatchSummary, StoredReading, SyncError, SyncEvent, WeatherReading};

use crate::app_services::AppServices;
use crate::services::{self, WeatherServiceMessage};

pub const STATUS_FETCHING: &str = "Fetching weather data...";
pub const STATUS_FETCHED: &str = "Weather data fetched successfully!";

/// The reading shown in the latest-update panel.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestWeather {
    pub reading: WeatherReading,
    /// When the model received it
    pub received_at: DateTime<Utc>,
}

impl From<WeatherReading> for LatestWeather {
    fn from(reading: WeatherReading) -> Self {
        Self {
            reading,
            received_at: Utc::now(),
        }
    }
}

/// UI state for the weather screen.
///
/// Actions only queue work on the services runtime; state changes when
/// `poll` or `wait_idle` applies the resulting messages on this thread.
pub struct WeatherModel {
    services: AppServices,
    latest: Option<LatestWeather>,
    history: Vec<StoredReading>,
    status: String,
    loading: bool,
    error_message: String,
    /// Every error text shown since the last `take_notices`
    notices: Vec<String>,
    /// Requests whose final message has not been applied yet
    in_flight: usize,
}

impl WeatherModel {
    pub fn new(services: AppServices) -> Self {
        let mut model = Self {
            services,
            latest: None,
            history: Vec::new(),
            status: String::new(),
            loading: false,
            error_message: String::new(),
            notices: Vec::new(),
            in_flight: 0,
        };

        if let Some(reason) = model.services.store_issue().map(str::to_string) {
            let err = AppError::Database(DatabaseError::ConnectionFailed(reason));
            tracing::error!("Weather store unavailable: {}", err);
            model.show_error(err.user_message().to_string());
        }

        model
    }

    pub fn fetch_all(&mut self) {
        self.begin(STATUS_FETCHING);
        services::request_fetch_all(
            &self.services.runtime(),
            self.services.weather_sender(),
            self.services.weather_sync(),
        );
    }

    pub fn show_history(&mut self) {
        self.begin("Loading history...");
        services::request_history(
            &self.services.runtime(),
            self.services.weather_sender(),
            self.services.weather_sync(),
        );
    }

    pub fn search(&mut self, district: &str) {
        self.begin(STATUS_FETCHING);
        services::request_search(
            &self.services.runtime(),
            self.services.weather_sender(),
            self.services.weather_sync(),
            district,
        );
    }

    /// Search again; `None` or a blank name ends in a validation message.
    pub fn refresh(&mut self, district: Option<&str>) {
        self.begin(STATUS_FETCHING);
        services::request_refresh(
            &self.services.runtime(),
            self.services.weather_sender(),
            self.services.weather_sync(),
            district.unwrap_or_default(),
        );
    }

    /// Apply every message already waiting. Returns how many were applied.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Some(msg) = self.services.try_recv() {
            self.apply(msg);
            applied += 1;
        }
        applied
    }

    /// Apply messages until no request is in flight or `timeout` passes.
    /// Returns whether the model is idle.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!("Gave up waiting on {} weather request(s)", self.in_flight);
                break;
            }
            if let Some(msg) = self.services.recv_timeout(remaining) {
                self.apply(msg);
            }
        }
        self.poll();
        self.in_flight == 0
    }

    pub fn apply(&mut self, msg: WeatherServiceMessage) {
        match msg {
            WeatherServiceMessage::Sync(event) => self.apply_sync_event(event),
            WeatherServiceMessage::LookupDone { query, result } => {
                self.finish();
                match result {
                    Ok(reading) => {
                        tracing::info!(
                            "Latest weather for {} (query {:?})",
                            reading.district,
                            query
                        );
                        self.status = format!("Weather updated for {}", reading.district);
                        self.latest = Some(reading.into());
                    }
                    Err(e) => {
                        self.status.clear();
                        self.show_sync_error(e);
                    }
                }
            }
            WeatherServiceMessage::HistoryDone(result) => {
                self.finish();
                match result {
                    Ok(rows) => {
                        self.status = format!("{} stored readings", rows.len());
                        self.history = rows;
                    }
                    Err(e) => {
                        self.status.clear();
                        self.show_sync_error(e);
                    }
                }
            }
        }
    }

    fn apply_sync_event(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::BatchStarted { .. } => {
                self.status = STATUS_FETCHING.to_string();
                self.loading = true;
            }
            SyncEvent::Latest(reading) => {
                self.latest = Some(reading.into());
            }
            SyncEvent::DistrictFailed { district, error } => {
                tracing::debug!("Batch failure for {}", district);
                self.show_sync_error(error);
            }
            SyncEvent::BatchComplete(summary) => {
                self.finish();
                self.status = batch_status(&summary);
            }
        }
    }

    fn begin(&mut self, status: &str) {
        self.in_flight += 1;
        self.loading = true;
        self.status = status.to_string();
        self.error_message.clear();
    }

    fn finish(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.loading = self.in_flight > 0;
    }

    fn show_sync_error(&mut self, error: SyncError) {
        self.show_error(sync_error_text(error));
    }

    fn show_error(&mut self, text: String) {
        self.error_message = text.clone();
        self.notices.push(text);
    }

    /// Drain the error texts shown since the last call.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    pub fn latest(&self) -> Option<&LatestWeather> {
        self.latest.as_ref()
    }

    pub fn history(&self) -> &[StoredReading] {
        &self.history
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn services(&self) -> &AppServices {
        &self.services
    }

    pub fn shutdown(self) {
        self.services.shutdown();
    }
}

fn batch_status(summary: &BatchSummary) -> String {
    if summary.is_clean() {
        return STATUS_FETCHED.to_string();
    }
    format!(
        "{} ({} of {} districts failed: {})",
        STATUS_FETCHED,
        summary.failed.len(),
        summary.attempted,
        summary.failed.join(", ")
    )
}

/// Text shown for a sync error. Fetch and parse failures name the district.
fn sync_error_text(error: SyncError) -> String {
    tracing::warn!("{}", error);

    let fetch_district = match &error {
        SyncError::Fetch { district, .. } | SyncError::Parse { district, .. } => {
            Some(district.clone())
        }
        _ => None,
    };
    if let Some(district) = fetch_district {
        return format!("Error fetching data for {district}");
    }

    crate::error_mapping::weather::to_app(error)
        .user_message()
        .to_string()
}
