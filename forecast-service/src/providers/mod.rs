//! Pluggable forecast and geocoding backends.

use async_trait::async_trait;
use common::errors::AppError;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::config::Config;

pub mod mapbox;
pub mod mock;
pub mod weatherapi;

pub use mapbox::MapboxProvider;
pub use mock::{MockAddressProvider, MockWeatherProvider};
pub use weatherapi::WeatherApiComProvider;

/// How long a provider's answers stay cached unless it says otherwise.
pub const DEFAULT_CACHE_EXPIRY: Duration = Duration::from_secs(30 * 60);

/// A weather backend.
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// Registry name, also used to partition the forecast cache.
    fn name(&self) -> &'static str;

    fn cache_expiry(&self) -> Duration {
        DEFAULT_CACHE_EXPIRY
    }

    /// Forecast for `"lat,lng"` as a nested JSON object.
    async fn get_forecast(&self, coordinates: &str) -> Result<Value, AppError>;
}

/// A geocoding backend.
#[async_trait]
pub trait AddressProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn cache_expiry(&self) -> Duration {
        DEFAULT_CACHE_EXPIRY
    }

    /// Suggestions for `query` as a JSON array of
    /// `{label, coordinates, country_code}` records.
    async fn search(&self, query: &str) -> Result<Value, AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeatherProviderKind {
    WeatherApiCom,
    Test,
}

impl WeatherProviderKind {
    /// Resolve a provider name; `None` selects weatherapi.com.
    pub fn from_name(name: Option<&str>) -> Result<Self, AppError> {
        match name {
            None | Some("weatherapi_com") => Ok(Self::WeatherApiCom),
            Some("test") => Ok(Self::Test),
            Some(other) => {
                error!(provider = %other, "Invalid weather provider requested");
                Err(AppError::unknown_provider(other))
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WeatherApiCom => "weatherapi_com",
            Self::Test => "test",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressProviderKind {
    Mapbox,
    Test,
}

impl AddressProviderKind {
    /// Resolve a provider name; `None` selects Mapbox.
    pub fn from_name(name: Option<&str>) -> Result<Self, AppError> {
        match name {
            None | Some("mapbox") => Ok(Self::Mapbox),
            Some("test") => Ok(Self::Test),
            Some(other) => {
                error!(provider = %other, "Invalid address provider requested");
                Err(AppError::unknown_provider(other))
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mapbox => "mapbox",
            Self::Test => "test",
        }
    }
}

/// Every provider the process can serve, built once at startup.
pub struct ProviderRegistry {
    weatherapi_com: Arc<dyn ForecastProvider>,
    mock_weather: Arc<dyn ForecastProvider>,
    mapbox: Arc<dyn AddressProvider>,
    mock_address: Arc<dyn AddressProvider>,
}

impl ProviderRegistry {
    /// Registry with the given real backends and the built-in mocks.
    pub fn new(
        weatherapi_com: Arc<dyn ForecastProvider>,
        mapbox: Arc<dyn AddressProvider>,
    ) -> Self {
        Self {
            weatherapi_com,
            mock_weather: Arc::new(MockWeatherProvider),
            mapbox,
            mock_address: Arc::new(MockAddressProvider),
        }
    }

    /// Build the real backends from configuration.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let weatherapi_com = WeatherApiComProvider::new(
            config.weatherapi_url.clone(),
            config.weatherapi_api_key.clone(),
            config.http_timeout,
        )?;
        let mapbox = MapboxProvider::new(
            config.mapbox_url.clone(),
            config.mapbox_api_key.clone(),
            config.suggestions_limit,
            config.http_timeout,
        )?;

        info!("Provider registry initialized");

        Ok(Self::new(Arc::new(weatherapi_com), Arc::new(mapbox)))
    }

    pub fn forecast_provider(&self, kind: WeatherProviderKind) -> Arc<dyn ForecastProvider> {
        match kind {
            WeatherProviderKind::WeatherApiCom => self.weatherapi_com.clone(),
            WeatherProviderKind::Test => self.mock_weather.clone(),
        }
    }

    pub fn address_provider(&self, kind: AddressProviderKind) -> Arc<dyn AddressProvider> {
        match kind {
            AddressProviderKind::Mapbox => self.mapbox.clone(),
            AddressProviderKind::Test => self.mock_address.clone(),
        }
    }
}
