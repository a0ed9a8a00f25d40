use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the bot's HTTP surface.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::scores::leaderboard,
        crate::routes::queue::guild_queue,
        crate::routes::sse::activity_stream,
        crate::routes::websocket::bridge_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::scores::LeaderboardRow,
            crate::dto::scores::LeaderboardResponse,
            crate::dto::queue::QueueResponse,
            crate::state::playback::Track,
            crate::dto::sse::Handshake,
            crate::dto::sse::AdventureEnding,
            crate::dto::sse::AdventureEndedEvent,
            crate::dto::sse::QuizFinishedEvent,
            crate::dto::sse::TrackStartedEvent,
            crate::dto::bridge::BridgeInbound,
            crate::dto::bridge::BridgeOutbound,
            crate::dto::bridge::InboundMessage,
            crate::dto::bridge::ButtonClick,
            crate::dto::bridge::Author,
            crate::state::directory::GuildSnapshot,
            crate::platform::OutboundMessage,
            crate::platform::Embed,
            crate::platform::EmbedField,
            crate::platform::Button,
            crate::platform::ButtonStyle,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "scores", description = "Quiz leaderboard"),
        (name = "playback", description = "Per-guild music queues"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "bridge", description = "WebSocket bridge for the chat platform gateway"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/healthcheck",
            "/scores",
            "/guilds/{guild_id}/queue",
            "/sse/activity",
            "/bridge",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
