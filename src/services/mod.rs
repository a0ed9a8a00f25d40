/// Adventure start, button clicks and view expiry.
pub mod adventure_service;
/// `tanya` relay to the text generator.
pub mod ask_service;
/// Platform gateway WebSocket lifecycle and frame routing.
pub mod bridge_service;
/// Prefix command parsing and dispatch.
pub mod command_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Kick, ban and move commands.
pub mod moderation_service;
/// Playback scheduler actor and its handle.
pub mod playback_service;
/// Quiz generation, questioning and grading.
pub mod quiz_service;
/// Error reports and reaction GIFs posted to channels.
pub mod reactions;
/// Leaderboard queries and win recording.
pub mod score_service;
/// Server-Sent Events streaming of bot activity.
pub mod sse_service;
/// Search strings and catalogue links to playable tracks.
pub mod track_resolver;
