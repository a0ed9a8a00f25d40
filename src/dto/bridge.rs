use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    platform::{ChannelId, GuildId, MessageRef, OutboundMessage, UserId},
    state::directory::GuildSnapshot,
};

/// User as described by the platform gateway.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct Author {
    /// Platform user id.
    pub id: UserId,
    /// Account name.
    pub name: String,
    /// Guild nickname, when set.
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Author {
    /// Nickname if present, account name otherwise.
    pub fn shown_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// A text message seen in a channel the bot can read.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct InboundMessage {
    /// Absent for direct messages.
    #[serde(default)]
    pub guild: Option<GuildId>,
    /// Channel the message was posted in.
    pub channel: ChannelId,
    /// Who wrote it.
    pub author: Author,
    /// Raw message text.
    pub content: String,
    /// Voice channel the author currently sits in.
    #[serde(default)]
    pub voice_channel: Option<ChannelId>,
    /// Author's resolved permission bits in this channel.
    #[serde(default)]
    pub permissions: u64,
    /// Users mentioned in the message, in order.
    #[serde(default)]
    pub mentions: Vec<Author>,
}

/// A button press on a message the bot posted.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ButtonClick {
    /// Token for answering the interaction.
    pub interaction_id: String,
    /// Message carrying the button.
    #[schema(value_type = uuid::Uuid)]
    pub message_ref: MessageRef,
    /// Channel of that message.
    pub channel: ChannelId,
    /// Who clicked.
    pub user: Author,
    /// Identifier of the clicked button.
    pub custom_id: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Frames accepted from the platform gateway.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeInbound {
    /// First frame of every connection.
    Hello {
        /// Free-form gateway name, logged only.
        gateway: String,
    },
    /// A text message.
    Message(InboundMessage),
    /// A button press.
    Button(ButtonClick),
    /// The current track of a guild ended.
    TrackFinished {
        /// Guild whose player went idle.
        guild: GuildId,
        /// Set when playback failed instead of ending normally.
        #[serde(default)]
        error: Option<String>,
    },
    /// The bot was removed from a voice channel.
    VoiceDisconnected {
        /// Guild that lost its voice connection.
        guild: GuildId,
    },
    /// Channels and members of a guild.
    GuildSnapshot(GuildSnapshot),
    /// Any frame type this server does not know.
    #[serde(other)]
    Unknown,
}

impl BridgeInbound {
    /// Parse one text frame.
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
/// Actions the platform gateway must execute.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeOutbound {
    /// Sent once after `hello`.
    Welcome {
        /// Identifier assigned to this connection.
        connection: uuid::Uuid,
    },
    /// Post a message.
    SendMessage {
        /// Reference the bot will use for later edits.
        #[schema(value_type = uuid::Uuid)]
        message_ref: MessageRef,
        /// Target channel.
        channel: ChannelId,
        /// Message body.
        message: OutboundMessage,
    },
    /// Replace a posted message.
    EditMessage {
        /// Message to replace.
        #[schema(value_type = uuid::Uuid)]
        message_ref: MessageRef,
        /// Channel of that message.
        channel: ChannelId,
        /// New body.
        message: OutboundMessage,
    },
    /// Remove a posted message.
    DeleteMessage {
        /// Message to remove.
        #[schema(value_type = uuid::Uuid)]
        message_ref: MessageRef,
        /// Channel of that message.
        channel: ChannelId,
    },
    /// Answer an interaction privately.
    EphemeralReply {
        /// Interaction being answered.
        interaction_id: String,
        /// Reply text.
        content: String,
    },
    /// Join or move to a voice channel.
    VoiceConnect {
        /// Guild to connect in.
        guild: GuildId,
        /// Voice channel to join.
        channel: ChannelId,
    },
    /// Leave the voice channel.
    VoiceDisconnect {
        /// Guild to leave.
        guild: GuildId,
    },
    /// Stream a track.
    Play {
        /// Guild whose player streams it.
        guild: GuildId,
        /// Direct media URL.
        source_uri: String,
        /// Display title.
        title: String,
    },
    /// Pause the player.
    Pause {
        /// Target guild.
        guild: GuildId,
    },
    /// Resume the player.
    Resume {
        /// Target guild.
        guild: GuildId,
    },
    /// Stop the current track.
    StopTrack {
        /// Target guild.
        guild: GuildId,
    },
    /// Kick a member.
    Kick {
        /// Guild of the member.
        guild: GuildId,
        /// Member to kick.
        user: UserId,
        /// Audit log reason.
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// Ban a member.
    Ban {
        /// Guild of the member.
        guild: GuildId,
        /// Member to ban.
        user: UserId,
        /// Audit log reason.
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// Move a member between voice channels.
    MoveMember {
        /// Guild of the member.
        guild: GuildId,
        /// Member to move.
        user: UserId,
        /// Destination voice channel.
        channel: ChannelId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_frame_parses_with_defaults() {
        let frame = BridgeInbound::from_json_str(
            r#"{"type":"message","channel":"10","author":{"id":"1","name":"budi"},"content":"!skor"}"#,
        )
        .unwrap();
        match frame {
            BridgeInbound::Message(message) => {
                assert_eq!(message.channel, ChannelId(10));
                assert_eq!(message.author.shown_name(), "budi");
                assert_eq!(message.guild, None);
                assert_eq!(message.permissions, 0);
                assert!(message.mentions.is_empty());
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn unknown_frames_are_tolerated() {
        let frame = BridgeInbound::from_json_str(r#"{"type":"typing_start"}"#).unwrap();
        assert!(matches!(frame, BridgeInbound::Unknown));
    }

    #[test]
    fn play_frame_is_tagged() {
        let frame = BridgeOutbound::Play {
            guild: GuildId(3),
            source_uri: "https://media.example/a.webm".into(),
            title: "A".into(),
        };
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            serde_json::json!({
                "type": "play",
                "guild": "3",
                "source_uri": "https://media.example/a.webm",
                "title": "A"
            })
        );
    }
}
