use async_trait::async_trait;
use common::errors::AppError;
use common::http_client::HttpClient;
use common::models::AddressSuggestion;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::AddressProvider;

const UNKNOWN_COUNTRY: &str = "unknown";

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    id: String,
    place_name: String,
    /// `[longitude, latitude]`
    center: [f64; 2],
    #[serde(default)]
    properties: Properties,
    #[serde(default)]
    context: Vec<ContextEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    short_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContextEntry {
    id: String,
    short_code: Option<String>,
}

impl Feature {
    fn country_code(&self) -> Option<String> {
        let code = if self.id.starts_with("country.") {
            self.properties.short_code.as_deref()
        } else {
            self.context
                .iter()
                .find(|entry| entry.id.starts_with("country."))
                .and_then(|entry| entry.short_code.as_deref())
        };
        code.filter(|c| !c.is_empty()).map(str::to_uppercase)
    }

    fn into_suggestion(self) -> AddressSuggestion {
        let [lng, lat] = self.center;
        AddressSuggestion {
            country_code: self
                .country_code()
                .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string()),
            coordinates: format!("{},{}", lat, lng),
            label: self.place_name,
        }
    }
}

/// Address search through the Mapbox geocoding API.
pub struct MapboxProvider {
    http_client: HttpClient,
    base_url: String,
    api_key: String,
    limit: u8,
}

impl MapboxProvider {
    pub fn new(
        base_url: String,
        api_key: String,
        limit: u8,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        Ok(Self {
            http_client: HttpClient::new(timeout)?,
            base_url,
            api_key,
            limit,
        })
    }

    fn build_url(&self, query: &str) -> String {
        format!(
            "{}/{}.json?access_token={}&limit={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(query),
            urlencoding::encode(&self.api_key),
            self.limit
        )
    }
}

#[async_trait]
impl AddressProvider for MapboxProvider {
    fn name(&self) -> &'static str {
        "mapbox"
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Value, AppError> {
        if query.trim().is_empty() {
            debug!("Blank query, skipping geocoding request");
            return Ok(Value::Array(Vec::new()));
        }

        info!(query = %query, "Searching Mapbox");

        let response: GeocodingResponse = self.http_client.get_json(&self.build_url(query)).await?;

        let suggestions: Vec<AddressSuggestion> = response
            .features
            .into_iter()
            .map(Feature::into_suggestion)
            .collect();

        info!(count = suggestions.len(), "Mapbox returned suggestions");

        serde_json::to_value(suggestions)
            .map_err(|e| AppError::internal(format!("Failed to encode suggestions: {}", e)))
    }
}
