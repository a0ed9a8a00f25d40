use std::convert::Infallible;

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::{services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/sse/activity",
    tag = "sse",
    responses((status = 200, description = "Quiz results, adventure outcomes and track starts", content_type = "text/event-stream", body = String))
)]
/// Stream bot activity to connected dashboards.
pub async fn activity_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    info!("new activity SSE connection");
    let receiver = sse_service::subscribe_activity(&state);
    sse_service::to_sse_stream(receiver)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/activity", get(activity_stream))
}
