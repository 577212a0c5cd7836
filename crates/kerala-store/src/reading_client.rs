//! The store handle the app holds.
//!
//! Opening the database can fail (unwritable data dir, locked or corrupt
//! file). The app still starts in that case; every store call then returns
//! `StoreError::Unavailable` carrying the original open error.

use std::path::Path;
use std::sync::Arc;

use kerala_weather::{ReadingStore, StoreError, StoreResult, StoredReading, WeatherReading};

use crate::reading_store::SqliteReadingStore;

#[derive(Clone)]
pub enum ReadingClient {
    /// Local SQLite storage.
    Sqlite(Arc<SqliteReadingStore>),

    /// The store could not be opened.
    Unavailable { reason: String },
}

impl ReadingClient {
    /// Open the SQLite store at `path`, falling back to `Unavailable`.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match SqliteReadingStore::new(path) {
            Ok(store) => {
                tracing::info!("Weather store ready at {}", path.display());
                Self::Sqlite(Arc::new(store))
            }
            Err(e) => {
                tracing::error!("Failed to open weather store at {}: {:#}", path.display(), e);
                Self::Unavailable {
                    reason: format!("{}: {:#}", path.display(), e),
                }
            }
        }
    }

    pub fn sqlite(store: SqliteReadingStore) -> Self {
        Self::Sqlite(Arc::new(store))
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Sqlite(_))
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            Self::Sqlite(_) => None,
            Self::Unavailable { reason } => Some(reason),
        }
    }
}

impl ReadingStore for ReadingClient {
    fn insert(&self, reading: &WeatherReading) -> StoreResult<StoredReading> {
        match self {
            Self::Sqlite(store) => store.insert(reading),
            Self::Unavailable { reason } => Err(StoreError::unavailable(reason.clone())),
        }
    }

    fn list_history(&self) -> StoreResult<Vec<StoredReading>> {
        match self {
            Self::Sqlite(store) => store.list_history(),
            Self::Unavailable { reason } => Err(StoreError::unavailable(reason.clone())),
        }
    }
}
