use common::errors::AppError;
use common::http_client::DEFAULT_TIMEOUT;
use std::env;
use std::time::Duration;

use crate::services::DEFAULT_REQUEST_TIMEOUT;

pub struct Config {
    pub port: u16,
    pub weatherapi_url: String,
    pub weatherapi_api_key: String,
    pub mapbox_url: String,
    pub mapbox_api_key: String,
    pub http_timeout: Duration,
    pub request_timeout: Duration,
    pub suggestions_limit: u8,
}

impl Config {
    /// Read configuration from the environment; missing API keys are fatal.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_source(|name| env::var(name).ok())
    }

    pub fn from_source(var: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let required = |name: &str| {
            var(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| AppError::config(format!("{} must be set", name)))
        };

        Ok(Self {
            port: var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            weatherapi_url: var("WEATHERAPI_COM_URL")
                .unwrap_or_else(|| "http://api.weatherapi.com/v1/forecast.json".to_string()),
            weatherapi_api_key: required("WEATHERAPI_COM_API_KEY")?,
            mapbox_url: var("MAPBOX_GEOCODING_URL").unwrap_or_else(|| {
                "https://api.mapbox.com/geocoding/v5/mapbox.places".to_string()
            }),
            mapbox_api_key: required("MAPBOX_API_KEY")?,
            http_timeout: var("HTTP_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
            request_timeout: var("REQUEST_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            suggestions_limit: var("SUGGESTIONS_LIMIT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        })
    }
}
