use axum::{
    Router,
    extract::{Query, State},
    response::Json,
    routing::get,
};
use common::errors::{AppError, ServiceUnavailable};
use common::models::{ForecastEnvelope, SuggestionsEnvelope};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::openapi;
use crate::providers::ProviderRegistry;
use crate::services::{LookupContext, SuggestionsService, WeatherService};

#[derive(Clone)]
pub struct AppState {
    pub providers: Arc<ProviderRegistry>,
    pub context: LookupContext,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/forecast", get(render_forecast))
        .route("/api/address_suggestions", get(render_suggestions))
        .merge(openapi::swagger_ui())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service health check")
    )
)]
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "service": "forecast-service" }))
}

#[derive(Deserialize)]
pub struct ForecastQuery {
    pub coordinates: Option<String>,
    pub provider: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/forecast",
    params(
        ("coordinates" = String, Query, description = "Location as \"lat,lng\""),
        ("provider" = Option<String>, Query, description = "weatherapi_com (default) or test")
    ),
    responses(
        (status = 200, description = "Validated forecast with cache metadata", body = ForecastEnvelope),
        (status = 503, description = "Weather service unavailable")
    ),
    tag = "weather"
)]
pub async fn render_forecast(
    State(state): State<AppState>,
    Query(params): Query<ForecastQuery>,
) -> Result<Json<ForecastEnvelope>, ServiceUnavailable> {
    info!(
        coordinates = ?params.coordinates,
        provider = ?params.provider,
        "Forecast request received"
    );

    let coordinates = params
        .coordinates
        .ok_or_else(|| AppError::invalid_input("Coordinates cannot be empty"))
        .map_err(ServiceUnavailable::weather)?;

    let service = WeatherService::new(&state.providers, params.provider.as_deref(), &state.context)
        .map_err(ServiceUnavailable::weather)?;

    let envelope = service
        .get_forecast(&coordinates)
        .await
        .map_err(ServiceUnavailable::weather)?;

    Ok(Json(envelope))
}

#[derive(Deserialize)]
pub struct SuggestionsQuery {
    #[serde(default)]
    pub query: String,
    pub provider: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/address_suggestions",
    params(
        ("query" = String, Query, description = "Free-text address search"),
        ("provider" = Option<String>, Query, description = "mapbox (default) or test")
    ),
    responses(
        (status = 200, description = "Address suggestions with cache metadata", body = SuggestionsEnvelope),
        (status = 503, description = "Address suggestions unavailable")
    ),
    tag = "suggestions"
)]
pub async fn render_suggestions(
    State(state): State<AppState>,
    Query(params): Query<SuggestionsQuery>,
) -> Result<Json<SuggestionsEnvelope>, ServiceUnavailable> {
    info!(query = %params.query, provider = ?params.provider, "Suggestions request received");

    let service =
        SuggestionsService::new(&state.providers, params.provider.as_deref(), &state.context)
            .map_err(ServiceUnavailable::suggestions)?;

    let envelope = service
        .get_suggestions(&params.query)
        .await
        .map_err(ServiceUnavailable::suggestions)?;

    Ok(Json(envelope))
}
