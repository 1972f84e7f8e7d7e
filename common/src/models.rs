use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Single address suggestion from a geocoding provider
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
pub struct AddressSuggestion {
    /// Human-readable address
    pub label: String,
    /// `"lat,lng"`, ready to be passed back to the forecast endpoint
    pub coordinates: String,
    /// Two-letter country code, or `"unknown"`
    pub country_code: String,
}

/// Validated forecast plus cache metadata
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForecastEnvelope {
    /// Normalized forecast: `location`, `current` and `forecast` days
    #[schema(value_type = Object)]
    pub forecast: serde_json::Value,
    /// Minutes since the entry was cached; `null` when just fetched
    pub cache_age: Option<i64>,
    /// When the forecast was fetched from the provider
    #[schema(value_type = String, format = DateTime)]
    pub timestamp: DateTime<Utc>,
}

/// Address suggestions plus cache metadata
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsEnvelope {
    pub suggestions: Vec<AddressSuggestion>,
    /// Minutes since the entry was cached; `null` when just fetched
    pub cache_age: Option<i64>,
}
