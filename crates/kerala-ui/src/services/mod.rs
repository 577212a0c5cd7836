pub mod weather_service;

pub use weather_service::{
    request_fetch_all, request_history, request_refresh, request_search, WeatherServiceMessage,
};
