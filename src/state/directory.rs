use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::platform::{GuildId, UserId};

/// Guild metadata pushed by the platform gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GuildSnapshot {
    /// Guild id.
    pub id: GuildId,
    /// Guild name.
    pub name: String,
    /// Owner of the guild.
    pub owner_id: UserId,
    /// Icon image, when the guild has one.
    #[serde(default)]
    pub icon_url: Option<String>,
    /// Total members.
    pub member_count: u64,
    /// Number of text channels.
    pub text_channels: u32,
    /// Number of voice channels.
    pub voice_channels: u32,
    /// Unix timestamp (seconds) of the guild creation.
    pub created_at: i64,
}

/// Names and guild metadata learned from platform events.
#[derive(Debug, Default)]
pub struct Directory {
    users: DashMap<UserId, String>,
    guilds: DashMap<GuildId, GuildSnapshot>,
}

impl Directory {
    /// Empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest display name of `user`; empty names are ignored.
    pub fn remember_user(&self, user: UserId, display_name: &str) {
        if display_name.is_empty() {
            return;
        }
        self.users.insert(user, display_name.to_string());
    }

    /// Last display name seen for `user`.
    pub fn user_name(&self, user: UserId) -> Option<String> {
        self.users.get(&user).map(|name| name.value().clone())
    }

    /// Store or replace guild metadata.
    pub fn remember_guild(&self, snapshot: GuildSnapshot) {
        self.guilds.insert(snapshot.id, snapshot);
    }

    /// Latest metadata of `guild`.
    pub fn guild(&self, guild: GuildId) -> Option<GuildSnapshot> {
        self.guilds.get(&guild).map(|entry| entry.value().clone())
    }
}
