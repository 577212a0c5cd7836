//! Weather backend: async sync operations.
//! All network and store work runs off the UI thread; results sent via mpsc.

use std::sync::mpsc::Sender;
use std::sync::Arc;

use kerala_weather::{StoredReading, SyncError, SyncEvent, WeatherReading, WeatherSync};
use tokio::runtime::Handle;

/// Messages sent from async operations back to the UI thread
#[derive(Debug)]
pub enum WeatherServiceMessage {
    /// Progress from a fetch-all batch
    Sync(SyncEvent),
    /// Result of a search or refresh for one district
    LookupDone {
        query: String,
        result: Result<WeatherReading, SyncError>,
    },
    /// Result of loading the stored history
    HistoryDone(Result<Vec<StoredReading>, SyncError>),
}

impl From<SyncEvent> for WeatherServiceMessage {
    fn from(event: SyncEvent) -> Self {
        Self::Sync(event)
    }
}

/// Fetch and store every district.
/// Sends `Sync` progress, ending with `BatchComplete`.
pub fn request_fetch_all(
    runtime: &Handle,
    tx: &Sender<WeatherServiceMessage>,
    sync: Arc<WeatherSync>,
) {
    let tx = tx.clone();
    runtime.spawn(async move {
        sync.sync_all(tx).await;
    });
}

/// Fetch one district by name. Sends `LookupDone`.
pub fn request_search(
    runtime: &Handle,
    tx: &Sender<WeatherServiceMessage>,
    sync: Arc<WeatherSync>,
    query: &str,
) {
    let tx = tx.clone();
    let query = query.to_string();
    runtime.spawn(async move {
        let result = sync.sync_one(&query).await;
        let _ = tx.send(WeatherServiceMessage::LookupDone { query, result });
    });
}

/// Like `request_search`, but a blank name is a validation error.
pub fn request_refresh(
    runtime: &Handle,
    tx: &Sender<WeatherServiceMessage>,
    sync: Arc<WeatherSync>,
    query: &str,
) {
    let tx = tx.clone();
    let query = query.to_string();
    runtime.spawn(async move {
        let result = sync.refresh(&query).await;
        let _ = tx.send(WeatherServiceMessage::LookupDone { query, result });
    });
}

/// Load stored readings, newest first. Sends `HistoryDone`.
pub fn request_history(
    runtime: &Handle,
    tx: &Sender<WeatherServiceMessage>,
    sync: Arc<WeatherSync>,
) {
    let tx = tx.clone();
    runtime.spawn(async move {
        let result = sync.list_history().await;
        let _ = tx.send(WeatherServiceMessage::HistoryDone(result));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_events_wrap_into_messages() {
        let msg: WeatherServiceMessage = SyncEvent::BatchStarted { total: 14 }.into();
        assert!(matches!(
            msg,
            WeatherServiceMessage::Sync(SyncEvent::BatchStarted { total: 14 })
        ));
    }
}
