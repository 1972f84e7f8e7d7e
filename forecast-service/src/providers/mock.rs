use async_trait::async_trait;
use chrono::{Days, Utc};
use common::errors::AppError;
use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{error, info, instrument};

use super::{AddressProvider, ForecastProvider};

struct MockCondition {
    code: u32,
    text: &'static str,
    icon: u32,
}

const WEATHER_CONDITIONS: &[MockCondition] = &[
    MockCondition { code: 1000, text: "Sunny", icon: 113 },
    MockCondition { code: 1003, text: "Partly cloudy", icon: 116 },
    MockCondition { code: 1006, text: "Cloudy", icon: 119 },
    MockCondition { code: 1009, text: "Overcast", icon: 122 },
    MockCondition { code: 1030, text: "Mist", icon: 143 },
    MockCondition { code: 1063, text: "Patchy rain possible", icon: 176 },
    MockCondition { code: 1066, text: "Patchy snow possible", icon: 179 },
    MockCondition { code: 1069, text: "Patchy sleet possible", icon: 182 },
    MockCondition { code: 1072, text: "Patchy freezing drizzle possible", icon: 185 },
    MockCondition { code: 1087, text: "Thundery outbreaks possible", icon: 200 },
];

const FORECAST_DAYS: u64 = 3;

/// Canned forecasts for development and tests.
///
/// A few sentinel inputs trigger failure paths instead of data:
/// `"raise_error"`, `"timeout"` and `"empty"`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockWeatherProvider;

impl MockWeatherProvider {
    pub const CACHE_EXPIRY: Duration = Duration::from_secs(1);
}

#[async_trait]
impl ForecastProvider for MockWeatherProvider {
    fn name(&self) -> &'static str {
        "test"
    }

    fn cache_expiry(&self) -> Duration {
        Self::CACHE_EXPIRY
    }

    #[instrument(skip(self))]
    async fn get_forecast(&self, coordinates: &str) -> Result<Value, AppError> {
        info!(coordinates = %coordinates, "Getting mock forecast");

        match coordinates {
            "raise_error" => {
                error!("Mock error triggered");
                Err(AppError::provider("Mock provider error"))
            }
            "timeout" => {
                error!("Mock timeout triggered");
                Err(AppError::timeout("Mock provider timeout"))
            }
            "empty" => Ok(json!({})),
            _ => Ok(mock_forecast(coordinates)),
        }
    }
}

fn mock_forecast(coordinates: &str) -> Value {
    let mut rng = rand::thread_rng();
    let (lat, lon) = coordinates.split_once(',').unwrap_or((coordinates, coordinates));
    let now = Utc::now();

    let days: Vec<Value> = (0..FORECAST_DAYS)
        .map(|i| {
            let date = now
                .date_naive()
                .checked_add_days(Days::new(i))
                .unwrap_or_else(|| now.date_naive());
            json!({
                "date": date.to_string(),
                "maxtemp_c": rng.gen_range(15..=35),
                "mintemp_c": rng.gen_range(-5..=15),
                "maxwind_kph": rng.gen_range(0..=50),
                "condition": mock_condition(&mut rng),
                "avghumidity": rng.gen_range(30..=80),
            })
        })
        .collect();

    json!({
        "location": {
            "name": "Mock City",
            "country": "Mock Country",
            "lat": lat,
            "lon": lon,
            "localtime": now.format("%Y-%m-%d %H:%M").to_string(),
        },
        "current": {
            "temp_c": 11,
            "is_day": 1,
            "feelslike_c": 11,
            "wind_kph": 11,
            "wind_dir": "N",
            "humidity": 11,
            "condition": mock_condition(&mut rng),
        },
        "forecast": days,
    })
}

fn mock_condition(rng: &mut impl Rng) -> Value {
    let condition = WEATHER_CONDITIONS
        .choose(rng)
        .unwrap_or(&WEATHER_CONDITIONS[0]);
    json!({
        "code": condition.code,
        "text": condition.text,
        "icon": format!("https://cdn.weatherapi.com/weather/64x64/day/{}.png", condition.icon),
    })
}

/// Two fixed suggestions regardless of the query.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockAddressProvider;

#[async_trait]
impl AddressProvider for MockAddressProvider {
    fn name(&self) -> &'static str {
        "test"
    }

    async fn search(&self, query: &str) -> Result<Value, AppError> {
        info!(query = %query, "Returning mock suggestions");

        Ok(json!([
            {
                "label": "Mock Location 1",
                "coordinates": "40.7128,-74.0060",
                "country_code": "CA"
            },
            {
                "label": "Mock Location 2",
                "coordinates": "51.5074,-0.1278",
                "country_code": "US"
            }
        ]))
    }
}
