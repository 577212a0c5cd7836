//! SQLite-based reading storage.
//!
//! One append-only table, `weather_data`. The id and timestamp are assigned by
//! SQLite on insert; the timestamp has millisecond precision and rows with an
//! equal timestamp are ordered by id.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;

use kerala_weather::{ReadingStore, StoreError, StoreResult, StoredReading, WeatherReading};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS weather_data (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        district TEXT NOT NULL,
        temperature REAL NOT NULL,
        wind_speed REAL NOT NULL,
        humidity REAL NOT NULL,
        rain REAL NOT NULL,
        timestamp TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    );

    CREATE INDEX IF NOT EXISTS idx_weather_data_timestamp ON weather_data(timestamp DESC);
"#;

/// SQLite-backed `ReadingStore`.
///
/// The connection sits behind a mutex, so one store can be shared by all
/// sync workers.
pub struct SqliteReadingStore {
    conn: Mutex<Connection>,
}

impl SqliteReadingStore {
    /// Open (or create) the database at `path`, creating parent directories.
    pub fn new<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        tracing::debug!("Opened weather store at {}", path.display());
        Ok(store)
    }

    /// Create an in-memory store. Contents are lost on drop.
    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> anyhow::Result<()> {
        self.conn.lock().execute_batch(SCHEMA)?;
        Ok(())
    }

    fn row_to_reading(row: &rusqlite::Row) -> rusqlite::Result<StoredReading> {
        let timestamp_str: String = row.get(6)?;
        let timestamp = parse_timestamp(&timestamp_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(StoredReading {
            id: row.get(0)?,
            reading: WeatherReading {
                district: row.get(1)?,
                temperature: row.get(2)?,
                wind_speed: row.get(3)?,
                humidity: row.get(4)?,
                rain: row.get(5)?,
            },
            timestamp,
        })
    }

    /// Number of stored readings.
    pub fn count(&self) -> anyhow::Result<usize> {
        let count: i64 =
            self.conn
                .lock()
                .query_row("SELECT COUNT(*) FROM weather_data", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}

impl ReadingStore for SqliteReadingStore {
    fn insert(&self, reading: &WeatherReading) -> StoreResult<StoredReading> {
        let conn = self.conn.lock();
        let (id, timestamp_str): (i64, String) = conn
            .query_row(
                "INSERT INTO weather_data (district, temperature, wind_speed, humidity, rain)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 RETURNING id, timestamp",
                params![
                    reading.district,
                    reading.temperature,
                    reading.wind_speed,
                    reading.humidity,
                    reading.rain
                ],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|e| StoreError::query(e.to_string()))?;

        let timestamp =
            parse_timestamp(&timestamp_str).map_err(|e| StoreError::query(e.to_string()))?;

        Ok(StoredReading {
            id,
            reading: reading.clone(),
            timestamp,
        })
    }

    fn list_history(&self) -> StoreResult<Vec<StoredReading>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, district, temperature, wind_speed, humidity, rain, timestamp
                 FROM weather_data
                 ORDER BY timestamp DESC, id DESC",
            )
            .map_err(|e| StoreError::query(e.to_string()))?;

        let rows = stmt
            .query_map([], Self::row_to_reading)
            .map_err(|e| StoreError::query(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::query(e.to_string()))
    }
}
