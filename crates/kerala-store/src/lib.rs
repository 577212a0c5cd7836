//! Local persistence for weather readings.
//!
//! `SqliteReadingStore` owns the `weather_data` table. `ReadingClient` is what
//! the app holds: either an open store or the reason it could not be opened.

pub mod reading_client;
pub mod reading_store;

pub use reading_client::ReadingClient;
pub use reading_store::SqliteReadingStore;
