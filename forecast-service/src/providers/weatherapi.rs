use async_trait::async_trait;
use common::errors::AppError;
use common::http_client::HttpClient;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{info, instrument};

use super::ForecastProvider;

/// Days of forecast requested; the free tier stops at three.
pub const FORECAST_DAYS: u8 = 3;

const LOCATION_FIELDS: &[&str] = &["name", "country"];

const CURRENT_FIELDS: &[&str] = &[
    "last_updated_epoch",
    "last_updated",
    "temp_c",
    "is_day",
    "wind_kph",
    "wind_dir",
    "humidity",
    "feelslike_c",
];

const CONDITION_FIELDS: &[&str] = &["text", "icon"];

const DAY_FIELDS: &[&str] = &["maxtemp_c", "mintemp_c", "avghumidity", "maxwind_kph"];

/// Client for the weatherapi.com forecast endpoint.
pub struct WeatherApiComProvider {
    http_client: HttpClient,
    base_url: String,
    api_key: String,
}

impl WeatherApiComProvider {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            http_client: HttpClient::new(timeout)?,
            base_url,
            api_key,
        })
    }

    fn build_url(&self, coordinates: &str) -> String {
        format!(
            "{}?q={}&key={}&days={}",
            self.base_url,
            urlencoding::encode(coordinates),
            urlencoding::encode(&self.api_key),
            FORECAST_DAYS
        )
    }
}

#[async_trait]
impl ForecastProvider for WeatherApiComProvider {
    fn name(&self) -> &'static str {
        "weatherapi_com"
    }

    #[instrument(skip(self))]
    async fn get_forecast(&self, coordinates: &str) -> Result<Value, AppError> {
        info!(coordinates = %coordinates, "Fetching forecast from weatherapi.com");

        let data: Value = self.http_client.get_json(&self.build_url(coordinates)).await?;

        parse_response(&data)
    }
}

/// Keep only the whitelisted fields of a weatherapi.com forecast response.
fn parse_response(data: &Value) -> Result<Value, AppError> {
    let location = section(data, "/location")?;
    let current = section(data, "/current")?;
    let days = data
        .pointer("/forecast/forecastday")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("forecast.forecastday"))?;

    let mut current_out = slice(current, CURRENT_FIELDS);
    current_out.insert(
        "condition".to_string(),
        Value::Object(slice(section(data, "/current/condition")?, CONDITION_FIELDS)),
    );

    let forecast = days
        .iter()
        .map(|day| -> Result<Value, AppError> {
            let mut out = Map::new();
            if let Some(date) = day.get("date") {
                out.insert("date".to_string(), date.clone());
            }
            out.insert(
                "condition".to_string(),
                Value::Object(slice(section(day, "/day/condition")?, CONDITION_FIELDS)),
            );
            out.extend(slice(section(day, "/day")?, DAY_FIELDS));
            Ok(Value::Object(out))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut out = Map::new();
    out.insert("location".to_string(), Value::Object(slice(location, LOCATION_FIELDS)));
    out.insert("current".to_string(), Value::Object(current_out));
    out.insert("forecast".to_string(), Value::Array(forecast));
    Ok(Value::Object(out))
}

fn section<'a>(data: &'a Value, pointer: &str) -> Result<&'a Map<String, Value>, AppError> {
    data.pointer(pointer)
        .and_then(Value::as_object)
        .ok_or_else(|| malformed(&pointer.trim_start_matches('/').replace('/', ".")))
}

fn slice(map: &Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
    keys.iter()
        .filter_map(|key| map.get(*key).map(|value| (key.to_string(), value.clone())))
        .collect()
}

fn malformed(path: &str) -> AppError {
    AppError::format(format!(
        "Failed to parse API response: missing object at {}",
        path
    ))
}
