//! Open-Meteo current-conditions client.
//!
//! Only the four `current` fields the app stores are requested and read;
//! anything else in the response is ignored.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use url::Url;

use crate::types::{District, WeatherError, WeatherReading};

const FORECAST_PATH: &str = "/v1/forecast";
const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,rain,wind_speed_10m";
const USER_AGENT: &str = concat!("kerala-weather/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentBlock,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    temperature_2m: f64,
    wind_speed_10m: f64,
    relative_humidity_2m: f64,
    rain: f64,
}

/// Anything that can produce the current reading for a district.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch_current(&self, district: &District) -> Result<WeatherReading, WeatherError>;
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    base_url: String,
}

impl WeatherProvider {
    /// Provider against an Open-Meteo compatible host, e.g. `https://api.open-meteo.com`.
    ///
    /// No timeout is configured; requests use the transport defaults.
    pub fn with_base_url(base_url: &str) -> Result<Self, WeatherError> {
        Url::parse(base_url).map_err(|e| WeatherError::InvalidUrl(format!("{base_url}: {e}")))?;

        let client = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Forecast URL for a district's coordinates.
    pub fn request_url(&self, district: &District) -> Result<Url, WeatherError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, FORECAST_PATH))
            .map_err(|e| WeatherError::InvalidUrl(e.to_string()))?;

        url.query_pairs_mut()
            .append_pair("latitude", &district.latitude.to_string())
            .append_pair("longitude", &district.longitude.to_string())
            .append_pair("current", CURRENT_FIELDS);

        Ok(url)
    }
}

#[async_trait]
impl WeatherSource for WeatherProvider {
    #[instrument(skip(self, district), fields(district = %district.name), level = "debug")]
    async fn fetch_current(&self, district: &District) -> Result<WeatherReading, WeatherError> {
        let url = self.request_url(district)?;
        tracing::debug!("GET {}", url);

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        parse_current(&district.name, &body)
    }
}

/// Extract the four stored fields from an Open-Meteo response body.
///
/// A missing `current` object, a missing field, or a non-numeric value is a
/// `WeatherError::Parse`.
pub fn parse_current(district: &str, body: &str) -> Result<WeatherReading, WeatherError> {
    let parsed: ForecastResponse =
        serde_json::from_str(body).map_err(|e| WeatherError::Parse(e.to_string()))?;

    let current = parsed.current;
    Ok(WeatherReading {
        district: district.to_string(),
        temperature: current.temperature_2m,
        wind_speed: current.wind_speed_10m,
        humidity: current.relative_humidity_2m,
        rain: current.rain,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn kottayam() -> District {
        District::new("Kottayam", 9.5869, 76.5213)
    }

    #[test]
    fn test_parse_current_extracts_exact_values() {
        let body = r#"{"current":{"temperature_2m":31.5,"wind_speed_10m":12.0,"relative_humidity_2m":70.0,"rain":0.0}}"#;
        let reading = parse_current("Kottayam", body).unwrap();

        assert_eq!(
            reading,
            WeatherReading {
                district: "Kottayam".to_string(),
                temperature: 31.5,
                wind_speed: 12.0,
                humidity: 70.0,
                rain: 0.0,
            }
        );
    }

    #[test]
    fn test_parse_current_accepts_integer_humidity_and_extra_fields() {
        let body = r#"{
            "latitude": 9.5,
            "current_units": {"temperature_2m": "°C"},
            "current": {"time": "2026-10-16T10:00", "interval": 900,
                        "temperature_2m": 28.1, "relative_humidity_2m": 84,
                        "rain": 0.4, "wind_speed_10m": 7.9}
        }"#;
        let reading = parse_current("Alappuzha", body).unwrap();
        assert_eq!(reading.humidity, 84.0);
        assert_eq!(reading.rain, 0.4);
    }

    #[test]
    fn test_parse_current_missing_field_is_parse_error() {
        let body = r#"{"current":{"temperature_2m":31.5,"wind_speed_10m":12.0,"rain":0.0}}"#;
        let err = parse_current("Kottayam", body).unwrap_err();
        assert!(err.is_parse(), "got {err:?}");
        assert!(err.to_string().contains("relative_humidity_2m"));
    }

    #[test]
    fn test_parse_current_null_value_is_parse_error() {
        let body = r#"{"current":{"temperature_2m":null,"wind_speed_10m":12.0,"relative_humidity_2m":70,"rain":0.0}}"#;
        assert!(parse_current("Kottayam", body).unwrap_err().is_parse());
    }

    #[test]
    fn test_parse_current_malformed_json_is_parse_error() {
        assert!(parse_current("Kottayam", "<html>oops</html>").unwrap_err().is_parse());
        assert!(parse_current("Kottayam", r#"{"hourly":{}}"#).unwrap_err().is_parse());
    }

    #[test]
    fn test_request_url_contains_coordinates_and_fields() {
        let provider = WeatherProvider::with_base_url("https://api.open-meteo.com/").unwrap();
        let url = provider.request_url(&kottayam()).unwrap();

        assert_eq!(url.path(), "/v1/forecast");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("latitude".into(), "9.5869".into())));
        assert!(pairs.contains(&("longitude".into(), "76.5213".into())));
        assert!(pairs.contains(&(
            "current".into(),
            "temperature_2m,relative_humidity_2m,rain,wind_speed_10m".into()
        )));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = WeatherProvider::with_base_url("not a url").unwrap_err();
        assert!(matches!(err, WeatherError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_fetch_current_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "9.5869"))
            .and(query_param("longitude", "76.5213"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "current": {
                    "temperature_2m": 31.5,
                    "wind_speed_10m": 12.0,
                    "relative_humidity_2m": 70.0,
                    "rain": 0.0
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = WeatherProvider::with_base_url(&mock_server.uri()).unwrap();
        let reading = provider.fetch_current(&kottayam()).await.unwrap();

        assert_eq!(reading.district, "Kottayam");
        assert_eq!(reading.temperature, 31.5);
        assert_eq!(reading.wind_speed, 12.0);
    }

    #[tokio::test]
    async fn test_fetch_current_http_error_is_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let provider = WeatherProvider::with_base_url(&mock_server.uri()).unwrap();
        let err = provider.fetch_current(&kottayam()).await.unwrap_err();

        assert!(matches!(err, WeatherError::Status { status: 503 }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_fetch_current_connection_refused_is_network() {
        // Port 9 (discard) is not served by anything in the test environment.
        let provider = WeatherProvider::with_base_url("http://127.0.0.1:9").unwrap();
        let err = provider.fetch_current(&kottayam()).await.unwrap_err();
        assert!(matches!(err, WeatherError::Network(_)), "got {err:?}");
    }
}
