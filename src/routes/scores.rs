use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::scores::{LeaderboardQuery, LeaderboardResponse},
    services::score_service,
    state::SharedState,
};

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

#[utoipa::path(
    get,
    path = "/scores",
    tag = "scores",
    params(LeaderboardQuery),
    responses((status = 200, description = "Quiz leaderboard", body = LeaderboardResponse))
)]
/// Return the quiz leaderboard, best players first.
pub async fn leaderboard(
    State(state): State<SharedState>,
    Query(query): Query<LeaderboardQuery>,
) -> Json<LeaderboardResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    Json(LeaderboardResponse {
        entries: score_service::leaderboard(&state, limit).await,
    })
}

/// Configure the leaderboard routes.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/scores", get(leaderboard))
}
