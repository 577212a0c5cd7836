//! Weather synchronization for Kerala's districts
//!
//! Fetches current conditions from the Open-Meteo API for a fixed district
//! registry, persists each reading through a `ReadingStore`, and reports
//! progress to the presentation layer through a `SyncObserver`.

pub mod provider;
pub mod registry;
pub mod store;
pub mod sync;
pub mod types;

pub use provider::{WeatherProvider, WeatherSource};
pub use registry::{DistrictRegistry, RegistryError};
pub use store::{ReadingStore, StoreError, StoreResult};
pub use sync::{BatchSummary, SyncError, SyncEvent, SyncObserver, WeatherSync};
pub use types::*;
