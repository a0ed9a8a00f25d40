//! Narrow interfaces to the chat platform: text delivery, interactive buttons and voice.
//!
//! The bot core only ever talks to [`ChatPlatform`] and [`VoiceGateway`]; the production
//! implementation is the WebSocket [`bridge`], tests swap in recording fakes.

pub mod bridge;
/// Typed snowflake identifiers for users, channels and guilds.
pub mod ids;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::playback::{CompletionHandle, Track};

pub use self::ids::{ChannelId, GuildId, UserId};

/// Identifier the bot assigns to every message it posts so it can edit it later.
pub type MessageRef = Uuid;

/// Failures reported by the chat side of the platform.
#[derive(Debug, Error)]
pub enum ChatError {
    /// No platform gateway is currently attached.
    #[error("chat platform is not connected")]
    Disconnected,
    /// The gateway refused or failed the request.
    #[error("chat platform rejected the request: {0}")]
    Rejected(String),
}

/// Failures reported by the voice side of the platform.
#[derive(Debug, Error)]
pub enum VoiceError {
    /// No platform gateway is currently attached.
    #[error("voice gateway is not connected")]
    Disconnected,
    /// The bot has no voice connection in this guild.
    #[error("not connected to a voice channel")]
    NotInVoice,
    /// A track is already being streamed.
    #[error("already playing audio")]
    AlreadyPlaying,
    /// Nothing is being streamed.
    #[error("nothing is playing")]
    NothingPlaying,
}

/// Visual style of an interactive button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    /// Blurple call to action.
    Primary,
    /// Neutral grey.
    Secondary,
    /// Green confirmation.
    Success,
    /// Red, destructive or risky choice.
    Danger,
}

/// Clickable button attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Button {
    /// Identifier echoed back in the click event.
    pub custom_id: String,
    /// Text on the button.
    pub label: String,
    /// Emoji shown before the label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    /// Colour of the button.
    pub style: ButtonStyle,
}

impl Button {
    /// Button without an emoji.
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>, style: ButtonStyle) -> Self {
        Self {
            custom_id: custom_id.into(),
            label: label.into(),
            emoji: None,
            style,
        }
    }

    /// Show `emoji` before the label.
    pub fn with_emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }
}

/// Named value rendered inside an embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EmbedField {
    /// Bold field heading.
    pub name: String,
    /// Field body.
    pub value: String,
    /// Whether the field may share a row with its neighbours.
    pub inline: bool,
}

/// Rich card rendered by the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Embed {
    /// Heading of the card.
    pub title: String,
    /// Body text.
    pub description: String,
    /// RGB colour, `0xRRGGBB`.
    pub color: u32,
    /// Named values below the description.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    /// Image URL shown in the corner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Small text at the bottom.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

impl Embed {
    /// Embed without fields, thumbnail or footer.
    pub fn new(title: impl Into<String>, description: impl Into<String>, color: u32) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            color,
            ..Self::default()
        }
    }

    /// Append a field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }
}

/// Colours used by the bot's embeds.
pub mod colors {
    /// Adventure start.
    pub const PURPLE: u32 = 0x9b59b6;
    /// Forest stage.
    pub const DARK_GREEN: u32 = 0x1f8b4c;
    /// Village stage and quiz announcement.
    pub const GOLD: u32 = 0xf1c40f;
    /// Defeat.
    pub const RED: u32 = 0xe74c3c;
    /// Lost quiz.
    pub const DARK_RED: u32 = 0x992d22;
    /// Won quiz.
    pub const GREEN: u32 = 0x2ecc71;
    /// Quiz questions.
    pub const ORANGE: u32 = 0xe67e22;
    /// Escape.
    pub const LIGHT_GREY: u32 = 0x979c9f;
    /// Informational embeds.
    pub const BLUE: u32 = 0x3498db;
}

/// Content of a message to post or of an edit to apply.
///
/// On edits, `None` content or embed clears it and an empty button list removes the view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OutboundMessage {
    /// Plain text body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Rich card rendered under the text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<Embed>,
    /// Interactive buttons below the message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
}

impl OutboundMessage {
    /// Text-only message.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Embed-only message.
    pub fn embed(embed: Embed) -> Self {
        Self {
            embed: Some(embed),
            ..Self::default()
        }
    }

    /// Attach `buttons`.
    pub fn with_buttons(mut self, buttons: Vec<Button>) -> Self {
        self.buttons = buttons;
        self
    }
}

/// Permission-gated one-shot actions executed by the platform on the bot's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationAction {
    /// Remove a member from the guild.
    Kick {
        /// Guild the member belongs to.
        guild: GuildId,
        /// Member to remove.
        user: UserId,
        /// Shown in the audit log.
        reason: Option<String>,
    },
    /// Remove a member and prevent them from rejoining.
    Ban {
        /// Guild the member belongs to.
        guild: GuildId,
        /// Member to ban.
        user: UserId,
        /// Shown in the audit log.
        reason: Option<String>,
    },
    /// Move a member to another voice channel.
    Move {
        /// Guild the member belongs to.
        guild: GuildId,
        /// Member to move.
        user: UserId,
        /// Target voice channel.
        channel: ChannelId,
    },
}

/// Text side of the chat platform.
pub trait ChatPlatform: Send + Sync {
    /// Post a message and return the reference used for later edits.
    fn send(
        &self,
        channel: ChannelId,
        message: OutboundMessage,
    ) -> BoxFuture<'_, Result<MessageRef, ChatError>>;

    /// Replace the content, embed and buttons of a previously posted message.
    fn edit(
        &self,
        channel: ChannelId,
        message: MessageRef,
        update: OutboundMessage,
    ) -> BoxFuture<'_, Result<(), ChatError>>;

    /// Remove a previously posted message.
    fn delete(&self, channel: ChannelId, message: MessageRef)
    -> BoxFuture<'_, Result<(), ChatError>>;

    /// Answer a button interaction with a message only the clicking user sees.
    fn reply_ephemeral(
        &self,
        interaction: String,
        content: String,
    ) -> BoxFuture<'_, Result<(), ChatError>>;

    /// Run a moderation action.
    fn moderate(&self, action: ModerationAction) -> BoxFuture<'_, Result<(), ChatError>>;
}

/// Voice connection state of one guild as seen by the gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoiceStatus {
    /// Voice channel the bot sits in, if any.
    pub channel: Option<ChannelId>,
    /// A track is streaming.
    pub playing: bool,
    /// A track is loaded but paused.
    pub paused: bool,
}

impl VoiceStatus {
    /// Whether the bot sits in a voice channel of this guild.
    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    /// A paused track still occupies the player.
    pub fn is_busy(&self) -> bool {
        self.playing || self.paused
    }
}

/// Voice side of the chat platform; at most one connection per guild.
pub trait VoiceGateway: Send + Sync {
    /// Connect to `channel`, moving the existing connection when there is one.
    fn connect(&self, guild: GuildId, channel: ChannelId) -> BoxFuture<'_, Result<(), VoiceError>>;

    /// Leave the guild's voice channel.
    fn disconnect(&self, guild: GuildId) -> BoxFuture<'_, Result<(), VoiceError>>;

    /// Current status as last seen by the gateway.
    fn status(&self, guild: GuildId) -> VoiceStatus;

    /// Start streaming `track`; `on_complete` fires once, when the track ends or fails.
    fn play(
        &self,
        guild: GuildId,
        track: &Track,
        on_complete: CompletionHandle,
    ) -> Result<(), VoiceError>;

    /// Pause the current track.
    fn pause(&self, guild: GuildId) -> Result<(), VoiceError>;

    /// Resume a paused track.
    fn resume(&self, guild: GuildId) -> Result<(), VoiceError>;

    /// Halt the current track; its completion handle fires as for a natural end.
    fn stop_track(&self, guild: GuildId) -> Result<(), VoiceError>;
}
