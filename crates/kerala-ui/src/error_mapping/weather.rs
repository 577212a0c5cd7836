use kerala_core::{
    AppError, ConfigError, DatabaseError, NetworkError, ReqwestErrorExt,
    WeatherError as AppWeatherError,
};
use kerala_weather::{StoreError, SyncError, WeatherError};

/// Converts a `SyncError` into an `AppError`. A free function because the
/// orphan rule forbids `impl From<SyncError> for AppError` in this crate.
pub(crate) fn to_app(e: SyncError) -> AppError {
    match e {
        SyncError::Connection(StoreError::Unavailable(s)) => {
            AppError::Database(DatabaseError::ConnectionFailed(s))
        }
        SyncError::Connection(StoreError::Query(s)) => {
            AppError::Database(DatabaseError::QueryFailed(s))
        }
        SyncError::Fetch { district, source } => match source {
            WeatherError::Network(err) => AppError::Network(err.into_network_error()),
            WeatherError::Status { status } => AppError::Network(NetworkError::ServerError {
                status,
                message: format!("HTTP {status} for {district}"),
            }),
            WeatherError::Parse(s) => AppError::Weather(AppWeatherError::InvalidPayload(s)),
            WeatherError::InvalidUrl(s) => AppError::Config(ConfigError::Invalid(s)),
        },
        SyncError::Parse { message, .. } => {
            AppError::Weather(AppWeatherError::InvalidPayload(message))
        }
        SyncError::NotFound(name) => AppError::Weather(AppWeatherError::DistrictNotFound(name)),
        SyncError::Validation(s) => AppError::Weather(AppWeatherError::InvalidInput(s)),
    }
}
