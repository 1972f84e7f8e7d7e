use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use common::models::{AddressSuggestion, ForecastEnvelope, SuggestionsEnvelope};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::render_forecast,
        handlers::render_suggestions,
    ),
    components(schemas(
        ForecastEnvelope,
        SuggestionsEnvelope,
        AddressSuggestion,
    )),
    tags(
        (name = "weather", description = "Forecast lookups"),
        (name = "suggestions", description = "Address suggestions"),
    ),
)]
struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
