use axum::Router;

use crate::state::SharedState;

/// Swagger UI and the OpenAPI document.
pub mod docs;
/// Liveness endpoint.
pub mod health;
/// Per-guild queue inspection.
pub mod queue;
/// Score ledger endpoints.
pub mod scores;
/// Activity event stream.
pub mod sse;
/// Gateway WebSocket upgrade.
pub mod websocket;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(websocket::router())
        .merge(scores::router())
        .merge(queue::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
