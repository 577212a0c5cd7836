//! Presentation layer for the Kerala weather app.
//!
//! Async work runs on the runtime owned by `AppServices`; results come back as
//! `WeatherServiceMessage`s and are applied to `WeatherModel` on the caller's
//! thread. `view` turns model state into text.

pub mod app_services;
pub mod error_mapping;
pub mod models;
pub mod services;
pub mod view;

pub use app_services::AppServices;
pub use models::weather_model::{LatestWeather, WeatherModel};
