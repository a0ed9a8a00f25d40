use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

/// Location of the raw OpenAPI document.
pub const OPENAPI_JSON_PATH: &str = "/api-doc/openapi.json";

/// Swagger UI at `/docs`, reading the document generated from the route annotations.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::<SharedState>::from(SwaggerUi::new("/docs").url(OPENAPI_JSON_PATH, ApiDoc::openapi()))
        .with_state(state)
}
