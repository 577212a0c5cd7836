use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named district and the coordinates used as its weather query key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct District {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl District {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }
}

/// One snapshot of current conditions for a district
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub district: String,
    /// Air temperature at 2 m, °C
    pub temperature: f64,
    /// Wind speed at 10 m, km/h
    pub wind_speed: f64,
    /// Relative humidity at 2 m, %
    pub humidity: f64,
    /// Rain, mm
    pub rain: f64,
}

/// A reading as persisted, with its store-assigned id and timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReading {
    pub id: i64,
    pub reading: WeatherReading,
    pub timestamp: DateTime<Utc>,
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Weather API returned HTTP {status}")]
    Status { status: u16 },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

impl WeatherError {
    /// True when the response arrived but could not be used.
    #[cfg(test)]
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}
