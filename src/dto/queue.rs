use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    platform::GuildId,
    state::playback::{QueueSnapshot, Track},
};

#[derive(Debug, Serialize, ToSchema)]
/// Player activity and pending tracks of one guild.
pub struct QueueResponse {
    /// Guild the queue belongs to.
    pub guild: GuildId,
    /// A track is streaming.
    pub playing: bool,
    /// The current track is paused.
    pub paused: bool,
    /// Tracks waiting to play, next first.
    pub pending: Vec<Track>,
}

impl QueueResponse {
    /// Wrap a scheduler snapshot for `guild`.
    pub fn new(guild: GuildId, snapshot: QueueSnapshot) -> Self {
        Self {
            guild,
            playing: snapshot.playing,
            paused: snapshot.paused,
            pending: snapshot.pending,
        }
    }
}
