//! District weather synchronization.
//!
//! `WeatherSync::sync_all` fans out one task per registry district, bounded by
//! a semaphore, and joins them all before reporting `BatchComplete`. Each task
//! fetches, persists, and reports on its own, so one district's failure never
//! affects another's.
//!
//! Progress goes to a `SyncObserver` rather than into shared state. The usual
//! observer is the sending half of the presentation layer's channel.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::provider::WeatherSource;
use crate::registry::DistrictRegistry;
use crate::store::{ReadingStore, StoreError};
use crate::types::{District, StoredReading, WeatherError, WeatherReading};

/// Errors surfaced to the user by sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Any store failure. The inner `StoreError` tells an unreachable store
    /// (`Unavailable`) from a failed statement (`Query`).
    #[error("Store error: {0}")]
    Connection(#[from] StoreError),

    #[error("Failed to fetch weather for {district}: {source}")]
    Fetch {
        district: String,
        #[source]
        source: WeatherError,
    },

    #[error("Invalid weather data for {district}: {message}")]
    Parse { district: String, message: String },

    #[error("District not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl SyncError {
    /// Classify a provider error for `district`.
    pub fn from_weather(district: &str, error: WeatherError) -> Self {
        match error {
            WeatherError::Parse(message) => Self::Parse {
                district: district.to_string(),
                message,
            },
            source => Self::Fetch {
                district: district.to_string(),
                source,
            },
        }
    }

    /// The district this error concerns, when there is one.
    pub fn district(&self) -> Option<&str> {
        match self {
            Self::Fetch { district, .. } | Self::Parse { district, .. } => Some(district),
            Self::NotFound(name) => Some(name),
            Self::Connection(_) | Self::Validation(_) => None,
        }
    }
}

/// Outcome counts for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub attempted: usize,
    pub stored: usize,
    /// Districts that produced no stored reading, sorted by name.
    pub failed: Vec<String>,
}

impl BatchSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Progress reported while a batch runs.
#[derive(Debug)]
pub enum SyncEvent {
    BatchStarted { total: usize },
    /// A district was fetched successfully; this is now the latest reading.
    Latest(WeatherReading),
    DistrictFailed { district: String, error: SyncError },
    /// Always sent once per batch, after every district has finished.
    BatchComplete(BatchSummary),
}

/// Receives sync progress. Called from worker tasks.
pub trait SyncObserver: Send + Sync + 'static {
    fn on_event(&self, event: SyncEvent);
}

impl<M> SyncObserver for std::sync::mpsc::Sender<M>
where
    M: From<SyncEvent> + Send + 'static,
{
    fn on_event(&self, event: SyncEvent) {
        if self.send(M::from(event)).is_err() {
            tracing::debug!("Sync observer channel closed; dropping event");
        }
    }
}

/// The synchronization routine over a registry, a weather source and a store.
#[derive(Clone)]
pub struct WeatherSync {
    source: Arc<dyn WeatherSource>,
    store: Arc<dyn ReadingStore>,
    registry: Arc<DistrictRegistry>,
    max_concurrent: usize,
}

impl WeatherSync {
    pub const DEFAULT_MAX_CONCURRENT: usize = 4;

    pub fn new(
        source: Arc<dyn WeatherSource>,
        store: Arc<dyn ReadingStore>,
        registry: Arc<DistrictRegistry>,
    ) -> Self {
        Self {
            source,
            store,
            registry,
            max_concurrent: Self::DEFAULT_MAX_CONCURRENT,
        }
    }

    /// Limit concurrent district fetches; values below 1 are treated as 1.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn registry(&self) -> &DistrictRegistry {
        &self.registry
    }

    /// Fetch and persist every registry district.
    ///
    /// Issues exactly one fetch per district. Failures are reported through
    /// `observer` and recorded in the summary; they never stop the batch.
    pub async fn sync_all<O>(&self, observer: O) -> BatchSummary
    where
        O: SyncObserver + Clone,
    {
        let total = self.registry.len();
        tracing::info!("Fetching weather data for {} districts", total);
        observer.on_event(SyncEvent::BatchStarted { total });

        let permits = Arc::new(Semaphore::new(self.max_concurrent));
        let mut pending = HashSet::with_capacity(total);
        let mut tasks = JoinSet::new();

        for district in self.registry.iter() {
            pending.insert(district.name.clone());

            let district = district.clone();
            let source = Arc::clone(&self.source);
            let store = Arc::clone(&self.store);
            let observer = observer.clone();
            let permits = Arc::clone(&permits);

            tasks.spawn(async move {
                // The semaphore is never closed, so acquire cannot fail.
                let _permit = permits.acquire_owned().await.ok();
                let stored = sync_district(source.as_ref(), store, &district, &observer).await;
                (district.name, stored)
            });
        }

        let mut summary = BatchSummary {
            attempted: total,
            ..BatchSummary::default()
        };

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, stored)) => {
                    pending.remove(&name);
                    if stored {
                        summary.stored += 1;
                    } else {
                        summary.failed.push(name);
                    }
                }
                Err(e) => tracing::error!("District sync task did not complete: {}", e),
            }
        }

        // Whatever is still pending belongs to a task that panicked.
        summary.failed.extend(pending);
        summary.failed.sort();

        tracing::info!(
            "Weather batch complete: {}/{} stored, {} failed",
            summary.stored,
            summary.attempted,
            summary.failed.len()
        );
        observer.on_event(SyncEvent::BatchComplete(summary.clone()));
        summary
    }

    /// Fetch one district by name without persisting.
    pub async fn sync_one(&self, name: &str) -> Result<WeatherReading, SyncError> {
        let district = self
            .registry
            .find(name)
            .ok_or_else(|| SyncError::NotFound(name.trim().to_string()))?;

        tracing::info!("Fetching weather for {}", district.name);
        self.source
            .fetch_current(district)
            .await
            .map_err(|e| SyncError::from_weather(&district.name, e))
    }

    /// `sync_one`, but a blank name is a validation error instead of a miss.
    pub async fn refresh(&self, name: &str) -> Result<WeatherReading, SyncError> {
        if name.trim().is_empty() {
            return Err(SyncError::Validation(
                "a district name is required to refresh".to_string(),
            ));
        }
        self.sync_one(name).await
    }

    /// Every stored reading, newest first.
    pub async fn list_history(&self) -> Result<Vec<StoredReading>, SyncError> {
        let store = Arc::clone(&self.store);
        let rows = tokio::task::spawn_blocking(move || store.list_history())
            .await
            .map_err(|e| StoreError::query(format!("history task failed: {e}")))??;

        tracing::debug!("Loaded {} history rows", rows.len());
        Ok(rows)
    }
}

/// Fetch, persist and report one district. Returns whether a row was stored.
async fn sync_district<O: SyncObserver>(
    source: &dyn WeatherSource,
    store: Arc<dyn ReadingStore>,
    district: &District,
    observer: &O,
) -> bool {
    let reading = match source.fetch_current(district).await {
        Ok(reading) => reading,
        Err(e) => {
            let error = SyncError::from_weather(&district.name, e);
            tracing::warn!("Error fetching data for {}: {}", district.name, error);
            observer.on_event(SyncEvent::DistrictFailed {
                district: district.name.clone(),
                error,
            });
            return false;
        }
    };

    let persisted = persist(store, reading.clone()).await;
    observer.on_event(SyncEvent::Latest(reading));

    match persisted {
        Ok(stored) => {
            tracing::debug!("Stored reading {} for {}", stored.id, district.name);
            true
        }
        Err(e) => {
            tracing::error!("Failed to store reading for {}: {}", district.name, e);
            observer.on_event(SyncEvent::DistrictFailed {
                district: district.name.clone(),
                error: SyncError::Connection(e),
            });
            false
        }
    }
}

async fn persist(
    store: Arc<dyn ReadingStore>,
    reading: WeatherReading,
) -> Result<StoredReading, StoreError> {
    tokio::task::spawn_blocking(move || store.insert(&reading))
        .await
        .map_err(|e| StoreError::query(format!("store task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    /// Source that fails for the listed districts and counts every call.
    struct FakeSource {
        failing: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(failing: Vec<&'static str>) -> Self {
            Self {
                failing,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl WeatherSource for FakeSource {
        async fn fetch_current(
            &self,
            district: &District,
        ) -> Result<WeatherReading, WeatherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(&district.name.as_str()) {
                return Err(WeatherError::Status { status: 500 });
            }
            Ok(WeatherReading {
                district: district.name.clone(),
                temperature: district.latitude,
                wind_speed: 10.0,
                humidity: 75.0,
                rain: 0.0,
            })
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<Vec<StoredReading>>,
        broken: bool,
    }

    impl ReadingStore for MemoryStore {
        fn insert(&self, reading: &WeatherReading) -> Result<StoredReading, StoreError> {
            if self.broken {
                return Err(StoreError::unavailable("no connection"));
            }
            let mut rows = self.rows.lock();
            let stored = StoredReading {
                id: rows.len() as i64 + 1,
                reading: reading.clone(),
                timestamp: Utc::now(),
            };
            rows.push(stored.clone());
            Ok(stored)
        }

        fn list_history(&self) -> Result<Vec<StoredReading>, StoreError> {
            if self.broken {
                return Err(StoreError::unavailable("no connection"));
            }
            let mut rows = self.rows.lock().clone();
            rows.reverse();
            Ok(rows)
        }
    }

    fn routine(source: Arc<FakeSource>, store: Arc<MemoryStore>) -> WeatherSync {
        let registry = Arc::new(DistrictRegistry::kerala().unwrap());
        WeatherSync::new(source, store, registry).with_max_concurrent(3)
    }

    #[tokio::test]
    async fn test_sync_all_fetches_each_district_once() {
        let source = Arc::new(FakeSource::new(vec![]));
        let store = Arc::new(MemoryStore::default());
        let sync = routine(source.clone(), store.clone());
        let (tx, rx) = mpsc::channel::<SyncEvent>();

        let summary = sync.sync_all(tx).await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 14);
        assert_eq!(summary.attempted, 14);
        assert_eq!(summary.stored, 14);
        assert!(summary.is_clean());
        assert_eq!(store.rows.lock().len(), 14);

        let events: Vec<SyncEvent> = rx.try_iter().collect();
        assert!(matches!(events.first(), Some(SyncEvent::BatchStarted { total: 14 })));
        assert!(matches!(events.last(), Some(SyncEvent::BatchComplete(_))));
        let latest = events
            .iter()
            .filter(|e| matches!(e, SyncEvent::Latest(_)))
            .count();
        assert_eq!(latest, 14);
    }

    #[tokio::test]
    async fn test_failed_districts_are_isolated() {
        let source = Arc::new(FakeSource::new(vec!["Kottayam", "Wayanad"]));
        let store = Arc::new(MemoryStore::default());
        let sync = routine(source.clone(), store.clone());
        let (tx, rx) = mpsc::channel::<SyncEvent>();

        let summary = sync.sync_all(tx).await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 14);
        assert_eq!(summary.stored, 12);
        assert_eq!(summary.failed, vec!["Kottayam".to_string(), "Wayanad".to_string()]);

        let rows = store.rows.lock();
        assert_eq!(rows.len(), 12);
        assert!(!rows.iter().any(|r| r.reading.district == "Kottayam"));
        assert!(!rows.iter().any(|r| r.reading.district == "Wayanad"));
        drop(rows);

        let failures: Vec<String> = rx
            .try_iter()
            .filter_map(|e| match e {
                SyncEvent::DistrictFailed { district, error } => {
                    assert!(matches!(error, SyncError::Fetch { .. }));
                    Some(district)
                }
                _ => None,
            })
            .collect();
        assert_eq!(failures.len(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_still_reports_latest() {
        let source = Arc::new(FakeSource::new(vec![]));
        let store = Arc::new(MemoryStore {
            broken: true,
            ..MemoryStore::default()
        });
        let sync = routine(source.clone(), store);
        let (tx, rx) = mpsc::channel::<SyncEvent>();

        let summary = sync.sync_all(tx).await;

        assert_eq!(summary.stored, 0);
        assert_eq!(summary.failed.len(), 14);

        let events: Vec<SyncEvent> = rx.try_iter().collect();
        let latest = events.iter().filter(|e| matches!(e, SyncEvent::Latest(_))).count();
        let connection_failures = events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    SyncEvent::DistrictFailed {
                        error: SyncError::Connection(_),
                        ..
                    }
                )
            })
            .count();
        assert_eq!(latest, 14);
        assert_eq!(connection_failures, 14);
        assert!(matches!(events.last(), Some(SyncEvent::BatchComplete(_))));
    }

    #[tokio::test]
    async fn test_sync_one_case_insensitive_does_not_persist() {
        let source = Arc::new(FakeSource::new(vec![]));
        let store = Arc::new(MemoryStore::default());
        let sync = routine(source.clone(), store.clone());

        let reading = sync.sync_one("kottayam").await.unwrap();

        assert_eq!(reading.district, "Kottayam");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(store.rows.lock().is_empty());
    }

    #[tokio::test]
    async fn test_sync_one_unknown_district_is_not_found() {
        let source = Arc::new(FakeSource::new(vec![]));
        let store = Arc::new(MemoryStore::default());
        let sync = routine(source.clone(), store.clone());

        let err = sync.sync_one("Kochi-not-real").await.unwrap_err();

        assert!(matches!(err, SyncError::NotFound(ref name) if name == "Kochi-not-real"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert!(store.rows.lock().is_empty());
    }

    #[tokio::test]
    async fn test_sync_one_fetch_failure_is_distinct_from_not_found() {
        let source = Arc::new(FakeSource::new(vec!["Idukki"]));
        let sync = routine(source, Arc::new(MemoryStore::default()));

        let err = sync.sync_one("IDUKKI").await.unwrap_err();
        assert!(matches!(err, SyncError::Fetch { ref district, .. } if district == "Idukki"));
        assert_eq!(err.district(), Some("Idukki"));
    }

    #[tokio::test]
    async fn test_refresh_requires_name() {
        let source = Arc::new(FakeSource::new(vec![]));
        let sync = routine(source.clone(), Arc::new(MemoryStore::default()));

        let err = sync.refresh("   ").await.unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);

        let reading = sync.refresh("Kannur").await.unwrap();
        assert_eq!(reading.district, "Kannur");
    }

    #[tokio::test]
    async fn test_list_history_empty_and_unavailable() {
        let source = Arc::new(FakeSource::new(vec![]));
        let sync = routine(source.clone(), Arc::new(MemoryStore::default()));
        assert!(sync.list_history().await.unwrap().is_empty());

        let broken = Arc::new(MemoryStore {
            broken: true,
            ..MemoryStore::default()
        });
        let sync = routine(source, broken);
        let err = sync.list_history().await.unwrap_err();
        assert!(matches!(err, SyncError::Connection(StoreError::Unavailable(_))));
    }

    /// Store that accepts nothing and fails every statement.
    struct QueryFailingStore;

    impl ReadingStore for QueryFailingStore {
        fn insert(&self, _reading: &WeatherReading) -> Result<StoredReading, StoreError> {
            Err(StoreError::query("disk I/O error"))
        }

        fn list_history(&self) -> Result<Vec<StoredReading>, StoreError> {
            Err(StoreError::query("disk I/O error"))
        }
    }

    #[tokio::test]
    async fn test_store_query_failure_keeps_its_kind() {
        let registry = Arc::new(DistrictRegistry::kerala().unwrap());
        let sync = WeatherSync::new(
            Arc::new(FakeSource::new(vec![])),
            Arc::new(QueryFailingStore),
            registry,
        );
        let (tx, rx) = mpsc::channel::<SyncEvent>();

        let summary = sync.sync_all(tx).await;
        assert_eq!(summary.failed.len(), 14);

        let query_failures = rx
            .try_iter()
            .filter(|e| {
                matches!(
                    e,
                    SyncEvent::DistrictFailed {
                        error: SyncError::Connection(StoreError::Query(_)),
                        ..
                    }
                )
            })
            .count();
        assert_eq!(query_failures, 14);

        let err = sync.list_history().await.unwrap_err();
        assert!(matches!(err, SyncError::Connection(StoreError::Query(_))));
    }

    #[test]
    fn test_from_weather_classifies_parse_errors() {
        let err = SyncError::from_weather("Kollam", WeatherError::Parse("missing rain".into()));
        assert!(matches!(err, SyncError::Parse { .. }));

        let err = SyncError::from_weather("Kollam", WeatherError::Status { status: 404 });
        assert!(matches!(err, SyncError::Fetch { .. }));
    }
}
