//! [`ChatPlatform`] and [`VoiceGateway`] served by a platform gateway attached over WebSocket.
//!
//! Every call turns into an outbound action frame; voice status is tracked locally from the
//! frames sent and the `track_finished`/`voice_disconnected` frames received.

use std::sync::{PoisonError, RwLock};

use axum::extract::ws::Message;
use dashmap::DashMap;
use futures::future::{self, BoxFuture};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    ChannelId, ChatError, ChatPlatform, GuildId, MessageRef, ModerationAction, OutboundMessage,
    VoiceError, VoiceGateway, VoiceStatus,
};
use crate::{
    dto::bridge::BridgeOutbound,
    state::playback::{CompletionHandle, Track},
};

#[derive(Clone)]
struct BridgeConnection {
    id: Uuid,
    tx: mpsc::UnboundedSender<Message>,
}

/// Outbound side of the gateway bridge plus locally tracked voice state.
#[derive(Default)]
pub struct Bridge {
    connection: RwLock<Option<BridgeConnection>>,
    voice: DashMap<GuildId, VoiceStatus>,
    completions: DashMap<GuildId, CompletionHandle>,
}

impl Bridge {
    /// Bridge with no gateway attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a gateway connection, replacing any previous one. Returns the connection id.
    pub fn attach(&self, tx: mpsc::UnboundedSender<Message>) -> Uuid {
        let id = Uuid::new_v4();
        let previous = self
            .connection
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(BridgeConnection { id, tx });
        if let Some(previous) = previous {
            warn!(replaced = %previous.id, connection = %id, "gateway connection replaced");
            let _ = previous.tx.send(Message::Close(None));
        }
        id
    }

    /// Detach `id` if it is still the active connection.
    ///
    /// Voice state and pending completions are forgotten; the guilds that had a voice
    /// connection are returned so their queues can be torn down.
    pub fn detach(&self, id: Uuid) -> Vec<GuildId> {
        let mut guard = self
            .connection
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if !guard.as_ref().is_some_and(|current| current.id == id) {
            return Vec::new();
        }
        guard.take();
        drop(guard);

        let mut guilds: Vec<GuildId> = self.voice.iter().map(|entry| *entry.key()).collect();
        guilds.extend(self.completions.iter().map(|entry| *entry.key()));
        guilds.sort_unstable();
        guilds.dedup();
        self.voice.clear();
        self.completions.clear();
        info!(connection = %id, guilds = guilds.len(), "gateway connection detached");
        guilds
    }

    /// Whether a gateway connection is currently attached.
    pub fn is_attached(&self) -> bool {
        self.connection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn push(&self, frame: BridgeOutbound) -> Result<(), ChatError> {
        let tx = self
            .connection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|connection| connection.tx.clone())
            .ok_or(ChatError::Disconnected)?;

        let payload = serde_json::to_string(&frame)
            .map_err(|err| ChatError::Rejected(format!("unencodable frame: {err}")))?;
        tx.send(Message::Text(payload.into()))
            .map_err(|_| ChatError::Disconnected)
    }

    fn push_voice(&self, frame: BridgeOutbound) -> Result<(), VoiceError> {
        self.push(frame).map_err(|_| VoiceError::Disconnected)
    }

    /// Record the end of the current track and hand back its completion handle.
    pub fn track_finished(&self, guild: GuildId) -> Option<CompletionHandle> {
        if let Some(mut status) = self.voice.get_mut(&guild) {
            status.playing = false;
            status.paused = false;
        }
        self.completions.remove(&guild).map(|(_, handle)| handle)
    }

    /// Forget the guild's connection after the platform dropped it.
    pub fn voice_disconnected(&self, guild: GuildId) -> Option<CompletionHandle> {
        self.voice.remove(&guild);
        self.completions.remove(&guild).map(|(_, handle)| handle)
    }
}

impl ChatPlatform for Bridge {
    fn send(
        &self,
        channel: ChannelId,
        message: OutboundMessage,
    ) -> BoxFuture<'_, Result<MessageRef, ChatError>> {
        let message_ref = Uuid::new_v4();
        let result = self
            .push(BridgeOutbound::SendMessage {
                message_ref,
                channel,
                message,
            })
            .map(|()| message_ref);
        Box::pin(future::ready(result))
    }

    fn edit(
        &self,
        channel: ChannelId,
        message: MessageRef,
        update: OutboundMessage,
    ) -> BoxFuture<'_, Result<(), ChatError>> {
        Box::pin(future::ready(self.push(BridgeOutbound::EditMessage {
            message_ref: message,
            channel,
            message: update,
        })))
    }

    fn delete(
        &self,
        channel: ChannelId,
        message: MessageRef,
    ) -> BoxFuture<'_, Result<(), ChatError>> {
        Box::pin(future::ready(self.push(BridgeOutbound::DeleteMessage {
            message_ref: message,
            channel,
        })))
    }

    fn reply_ephemeral(
        &self,
        interaction: String,
        content: String,
    ) -> BoxFuture<'_, Result<(), ChatError>> {
        Box::pin(future::ready(self.push(BridgeOutbound::EphemeralReply {
            interaction_id: interaction,
            content,
        })))
    }

    fn moderate(&self, action: ModerationAction) -> BoxFuture<'_, Result<(), ChatError>> {
        let frame = match action {
            ModerationAction::Kick {
                guild,
                user,
                reason,
            } => BridgeOutbound::Kick {
                guild,
                user,
                reason,
            },
            ModerationAction::Ban {
                guild,
                user,
                reason,
            } => BridgeOutbound::Ban {
                guild,
                user,
                reason,
            },
            ModerationAction::Move {
                guild,
                user,
                channel,
            } => BridgeOutbound::MoveMember {
                guild,
                user,
                channel,
            },
        };
        Box::pin(future::ready(self.push(frame)))
    }
}

impl VoiceGateway for Bridge {
    fn connect(&self, guild: GuildId, channel: ChannelId) -> BoxFuture<'_, Result<(), VoiceError>> {
        let result = self
            .push_voice(BridgeOutbound::VoiceConnect { guild, channel })
            .map(|()| {
                self.voice.entry(guild).or_default().channel = Some(channel);
            });
        Box::pin(future::ready(result))
    }

    fn disconnect(&self, guild: GuildId) -> BoxFuture<'_, Result<(), VoiceError>> {
        let result = if self.voice.remove(&guild).is_some() {
            self.push_voice(BridgeOutbound::VoiceDisconnect { guild })
        } else {
            Err(VoiceError::NotInVoice)
        };
        Box::pin(future::ready(result))
    }

    fn status(&self, guild: GuildId) -> VoiceStatus {
        self.voice
            .get(&guild)
            .map(|status| *status)
            .unwrap_or_default()
    }

    fn play(
        &self,
        guild: GuildId,
        track: &Track,
        on_complete: CompletionHandle,
    ) -> Result<(), VoiceError> {
        let status = self.status(guild);
        if !status.is_connected() {
            return Err(VoiceError::NotInVoice);
        }
        if status.is_busy() {
            return Err(VoiceError::AlreadyPlaying);
        }

        self.push_voice(BridgeOutbound::Play {
            guild,
            source_uri: track.source_uri.clone(),
            title: track.title.clone(),
        })?;
        if let Some(mut status) = self.voice.get_mut(&guild) {
            status.playing = true;
            status.paused = false;
        }
        self.completions.insert(guild, on_complete);
        Ok(())
    }

    fn pause(&self, guild: GuildId) -> Result<(), VoiceError> {
        let mut status = self.voice.get_mut(&guild).ok_or(VoiceError::NotInVoice)?;
        if !status.playing {
            return Err(VoiceError::NothingPlaying);
        }
        self.push_voice(BridgeOutbound::Pause { guild })?;
        status.playing = false;
        status.paused = true;
        Ok(())
    }

    fn resume(&self, guild: GuildId) -> Result<(), VoiceError> {
        let mut status = self.voice.get_mut(&guild).ok_or(VoiceError::NotInVoice)?;
        if !status.paused {
            return Err(VoiceError::NothingPlaying);
        }
        self.push_voice(BridgeOutbound::Resume { guild })?;
        status.playing = true;
        status.paused = false;
        Ok(())
    }

    fn stop_track(&self, guild: GuildId) -> Result<(), VoiceError> {
        let status = self.status(guild);
        if !status.is_connected() {
            return Err(VoiceError::NotInVoice);
        }
        if !status.is_busy() {
            return Err(VoiceError::NothingPlaying);
        }
        self.push_voice(BridgeOutbound::StopTrack { guild })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::platform::UserId;

    fn attached() -> (Bridge, mpsc::UnboundedReceiver<Message>) {
        let bridge = Bridge::new();
        let (tx, rx) = mpsc::unbounded_channel();
        bridge.attach(tx);
        (bridge, rx)
    }

    fn next_frame(rx: &mut mpsc::UnboundedReceiver<Message>) -> BridgeOutbound {
        match rx.try_recv().unwrap() {
            Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("unexpected message {other:?}"),
        }
    }

    fn track() -> Track {
        Track {
            source_uri: "https://media.example/t.webm".into(),
            title: "t".into(),
        }
    }

    #[tokio::test]
    async fn send_without_gateway_fails() {
        let bridge = Bridge::new();
        let err = bridge
            .send(ChannelId(1), OutboundMessage::text("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Disconnected));
    }

    #[tokio::test]
    async fn send_emits_frame_with_generated_ref() {
        let (bridge, mut rx) = attached();
        let message_ref = bridge
            .send(ChannelId(1), OutboundMessage::text("hi"))
            .await
            .unwrap();

        assert_eq!(
            next_frame(&mut rx),
            BridgeOutbound::SendMessage {
                message_ref,
                channel: ChannelId(1),
                message: OutboundMessage::text("hi"),
            }
        );
    }

    #[tokio::test]
    async fn voice_status_follows_playback_frames() {
        let (bridge, mut rx) = attached();
        let guild = GuildId(7);
        let (inbox, _scheduler) = mpsc::channel(4);

        assert!(matches!(
            bridge.play(
                guild,
                &track(),
                CompletionHandle::new(guild, inbox.clone(), Duration::from_millis(10))
            ),
            Err(VoiceError::NotInVoice)
        ));

        bridge.connect(guild, ChannelId(70)).await.unwrap();
        bridge
            .play(
                guild,
                &track(),
                CompletionHandle::new(guild, inbox.clone(), Duration::from_millis(10)),
            )
            .unwrap();
        assert!(bridge.status(guild).playing);
        assert!(matches!(
            bridge.play(
                guild,
                &track(),
                CompletionHandle::new(guild, inbox, Duration::from_millis(10))
            ),
            Err(VoiceError::AlreadyPlaying)
        ));

        bridge.pause(guild).unwrap();
        assert!(bridge.status(guild).is_busy());
        bridge.resume(guild).unwrap();

        let handle = bridge.track_finished(guild).unwrap();
        assert_eq!(handle.guild(), guild);
        assert!(!bridge.status(guild).is_busy());
        assert!(bridge.status(guild).is_connected());

        let frames: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(frames.len(), 4);
    }

    #[tokio::test]
    async fn replaced_connection_is_closed_and_stale_detach_ignored() {
        let bridge = Bridge::new();
        let (first_tx, mut first_rx) = mpsc::unbounded_channel();
        let first = bridge.attach(first_tx);
        let (second_tx, _second_rx) = mpsc::unbounded_channel();
        bridge.attach(second_tx);

        assert!(matches!(first_rx.try_recv(), Ok(Message::Close(None))));
        assert!(bridge.detach(first).is_empty());
        assert!(bridge.is_attached());
    }

    #[tokio::test]
    async fn detach_forgets_voice_and_completions() {
        let bridge = Bridge::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let connection = bridge.attach(tx);
        let (inbox, _scheduler) = mpsc::channel(4);
        bridge.connect(GuildId(7), ChannelId(70)).await.unwrap();
        bridge.connect(GuildId(8), ChannelId(80)).await.unwrap();
        bridge
            .play(
                GuildId(7),
                &track(),
                CompletionHandle::new(GuildId(7), inbox, Duration::from_millis(10)),
            )
            .unwrap();

        assert_eq!(bridge.detach(connection), [GuildId(7), GuildId(8)]);
        assert!(!bridge.status(GuildId(7)).is_connected());
        assert!(bridge.track_finished(GuildId(7)).is_none());
    }

    #[tokio::test]
    async fn moderation_actions_become_frames() {
        let (bridge, mut rx) = attached();
        bridge
            .moderate(ModerationAction::Ban {
                guild: GuildId(1),
                user: UserId(2),
                reason: None,
            })
            .await
            .unwrap();
        assert_eq!(
            next_frame(&mut rx),
            BridgeOutbound::Ban {
                guild: GuildId(1),
                user: UserId(2),
                reason: None
            }
        );
    }
}
