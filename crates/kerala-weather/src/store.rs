//! Persistence seam for weather readings.
//!
//! The sync routine only appends and lists; implementations live in
//! `kerala-store`.

use thiserror::Error;

use crate::types::{StoredReading, WeatherReading};

#[derive(Debug, Error)]
pub enum StoreError {
    /// No usable connection (open failed at startup, or the file went away).
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A statement failed against an open connection.
    #[error("Query failed: {0}")]
    Query(String),
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Append-only reading storage.
///
/// Implementations must serialize writes themselves; the sync routine calls
/// `insert` from several workers at once.
pub trait ReadingStore: Send + Sync {
    /// Append a reading; the store assigns id and timestamp.
    fn insert(&self, reading: &WeatherReading) -> StoreResult<StoredReading>;

    /// All readings, newest first.
    fn list_history(&self) -> StoreResult<Vec<StoredReading>>;
}
