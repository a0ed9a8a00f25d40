use serde::Serialize;
use utoipa::ToSchema;

use crate::platform::{GuildId, UserId};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    /// SSE `event:` name; `None` for unnamed messages.
    pub event: Option<String>,
    /// Serialised payload.
    pub data: String,
}

impl ServerEvent {
    /// Build an event with a preformatted data field.
    pub fn new<E>(event: E, data: String) -> Self
    where
        E: Into<Option<String>>,
    {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Name of the stream being joined.
    pub stream: String,
    /// Greeting shown by clients.
    pub message: String,
    /// Whether no platform gateway is attached.
    pub degraded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
/// How an adventure ended without reaching the quiz.
pub enum AdventureEnding {
    /// Fell in the forest.
    Defeated,
    /// Ran away from the village.
    Escaped,
    /// Gave up or let a choice expire.
    Abandoned,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when an adventure ends before the quiz.
pub struct AdventureEndedEvent {
    /// Adventurer.
    pub user: UserId,
    /// How it ended.
    pub ending: AdventureEnding,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a quiz completes (not when it is abandoned).
pub struct QuizFinishedEvent {
    /// Player who took the quiz.
    pub user: UserId,
    /// Correct answers.
    pub score: u32,
    /// Questions asked.
    pub total: usize,
    /// Whether the pass mark was reached.
    pub passed: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a guild starts streaming a track.
pub struct TrackStartedEvent {
    /// Guild streaming the track.
    pub guild: GuildId,
    /// Track display title.
    pub title: String,
}
