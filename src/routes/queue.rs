use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::queue::QueueResponse, error::AppError, platform::GuildId, state::SharedState,
};

#[utoipa::path(
    get,
    path = "/guilds/{guild_id}/queue",
    tag = "playback",
    params(("guild_id" = String, Path, description = "Guild identifier")),
    responses(
        (status = 200, description = "Player state and pending tracks", body = QueueResponse),
        (status = 400, description = "Malformed guild identifier"),
        (status = 503, description = "Playback scheduler is not running")
    )
)]
/// Show what a guild's player is doing and what is queued after it.
pub async fn guild_queue(
    State(state): State<SharedState>,
    Path(guild_id): Path<String>,
) -> Result<Json<QueueResponse>, AppError> {
    let guild: GuildId = guild_id
        .parse()
        .map_err(|_| AppError::BadRequest(format!("`{guild_id}` is not a guild id")))?;
    let snapshot = state.playback().snapshot(guild).await?;
    Ok(Json(QueueResponse::new(guild, snapshot)))
}

/// Configure the playback routes.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/guilds/{guild_id}/queue", get(guild_queue))
}
