//! Per-guild playback queues driven by a single scheduler task.
//!
//! Handlers never touch the queues directly: they send [`PlaybackCommand`]s through a
//! [`PlaybackHandle`] and the [`PlaybackScheduler`] applies them one at a time. Track
//! completions come back through the same inbox via [`CompletionHandle`].

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::{
    dto::sse::{ServerEvent, TrackStartedEvent},
    error::ServiceError,
    platform::{ChannelId, ChatPlatform, GuildId, OutboundMessage, VoiceError, VoiceGateway},
    state::{
        SseHub,
        playback::{
            CompletionHandle, EnqueueOutcome, PlaybackCommand, PlaybackQueue, QueueSnapshot,
            Track,
        },
    },
};

const INBOX_CAPACITY: usize = 64;

/// Cloneable client of the playback scheduler.
#[derive(Clone)]
pub struct PlaybackHandle {
    inbox: mpsc::Sender<PlaybackCommand>,
}

impl PlaybackHandle {
    /// Append `track` to the guild's queue, starting it right away when the player is idle.
    pub async fn enqueue(
        &self,
        guild: GuildId,
        channel: ChannelId,
        track: Track,
    ) -> Result<EnqueueOutcome, ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.request(
            PlaybackCommand::Enqueue {
                guild,
                channel,
                track,
                reply,
            },
            rx,
        )
        .await?
        .map_err(ServiceError::from)
    }

    /// Halt the current track; the queue moves on to the next one.
    pub async fn skip(&self, guild: GuildId) -> Result<(), ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.request(PlaybackCommand::Skip { guild, reply }, rx)
            .await?
            .map_err(ServiceError::from)
    }

    /// Drain the queue and leave voice, returning how many pending tracks were dropped.
    pub async fn stop(&self, guild: GuildId) -> Result<usize, ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.request(PlaybackCommand::Stop { guild, reply }, rx)
            .await?
            .map_err(ServiceError::from)
    }

    /// Pending tracks and player activity of `guild`.
    pub async fn snapshot(&self, guild: GuildId) -> Result<QueueSnapshot, ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.request(PlaybackCommand::Snapshot { guild, reply }, rx)
            .await
    }

    /// Tell the scheduler the guild's voice connection is gone.
    pub async fn disconnected(&self, guild: GuildId) {
        if self
            .inbox
            .send(PlaybackCommand::Disconnected { guild })
            .await
            .is_err()
        {
            warn!(guild = %guild, "playback scheduler is gone; dropping disconnect notice");
        }
    }

    async fn request<T>(
        &self,
        command: PlaybackCommand,
        rx: oneshot::Receiver<T>,
    ) -> Result<T, ServiceError> {
        self.inbox
            .send(command)
            .await
            .map_err(|_| ServiceError::ServiceUnavailable("playback scheduler"))?;
        rx.await
            .map_err(|_| ServiceError::ServiceUnavailable("playback scheduler"))
    }
}

/// Actor owning every guild's queue.
pub struct PlaybackScheduler {
    inbox: mpsc::Receiver<PlaybackCommand>,
    // Weak so that the scheduler stops once every handle is dropped.
    loopback: mpsc::WeakSender<PlaybackCommand>,
    queues: HashMap<GuildId, PlaybackQueue>,
    chat: Arc<dyn ChatPlatform>,
    voice: Arc<dyn VoiceGateway>,
    activity: SseHub,
    handoff_deadline: Duration,
}

impl PlaybackScheduler {
    /// Scheduler paired with the handle that feeds its inbox.
    pub fn new(
        chat: Arc<dyn ChatPlatform>,
        voice: Arc<dyn VoiceGateway>,
        activity: SseHub,
        handoff_deadline: Duration,
    ) -> (PlaybackHandle, Self) {
        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        let scheduler = Self {
            inbox: rx,
            loopback: tx.downgrade(),
            queues: HashMap::new(),
            chat,
            voice,
            activity,
            handoff_deadline,
        };
        (PlaybackHandle { inbox: tx }, scheduler)
    }

    /// Process commands until every [`PlaybackHandle`] and pending completion is dropped.
    pub async fn run(mut self) {
        info!("playback scheduler started");
        while let Some(command) = self.inbox.recv().await {
            self.handle(command).await;
        }
        info!("playback scheduler stopped");
    }

    async fn handle(&mut self, command: PlaybackCommand) {
        match command {
            PlaybackCommand::Enqueue {
                guild,
                channel,
                track,
                reply,
            } => {
                let outcome = self.enqueue(guild, channel, track).await;
                let _ = reply.send(outcome);
            }
            PlaybackCommand::TrackFinished { guild, error } => {
                if let Some(error) = error {
                    warn!(guild = %guild, error = %error, "track ended with an error");
                    if let Some(channel) = self.queues.get(&guild).map(|q| q.announce_channel) {
                        self.announce(channel, format!("Playback error: `{error}`"))
                            .await;
                    }
                }
                self.advance(guild).await;
            }
            PlaybackCommand::Skip { guild, reply } => {
                let _ = reply.send(self.voice.stop_track(guild));
            }
            PlaybackCommand::Stop { guild, reply } => {
                let _ = reply.send(self.stop(guild).await);
            }
            PlaybackCommand::Disconnected { guild } => {
                if let Some(queue) = self.queues.remove(&guild) {
                    info!(guild = %guild, dropped = queue.len(), "voice connection lost; queue removed");
                }
            }
            PlaybackCommand::Snapshot { guild, reply } => {
                let status = self.voice.status(guild);
                let pending = self
                    .queues
                    .get(&guild)
                    .map(|queue| queue.tracks().cloned().collect())
                    .unwrap_or_default();
                let _ = reply.send(QueueSnapshot {
                    playing: status.playing,
                    paused: status.paused,
                    pending,
                });
            }
        }
    }

    async fn enqueue(
        &mut self,
        guild: GuildId,
        channel: ChannelId,
        track: Track,
    ) -> Result<EnqueueOutcome, VoiceError> {
        let status = self.voice.status(guild);
        if !status.is_connected() {
            self.queues.remove(&guild);
            return Err(VoiceError::NotInVoice);
        }

        let queue = self
            .queues
            .entry(guild)
            .or_insert_with(|| PlaybackQueue::new(channel));
        queue.announce_channel = channel;
        debug!(guild = %guild, title = %track.title, "track enqueued");
        queue.push(track);

        if status.is_busy() {
            return Ok(EnqueueOutcome::Queued {
                position: queue.len(),
            });
        }

        self.advance(guild).await;
        Ok(EnqueueOutcome::Started)
    }

    /// Start the next pending track if the guild is connected and its player is idle.
    async fn advance(&mut self, guild: GuildId) {
        loop {
            let status = self.voice.status(guild);
            if !status.is_connected() {
                if self.queues.remove(&guild).is_some() {
                    debug!(guild = %guild, "no voice connection; queue torn down");
                }
                return;
            }
            if status.is_busy() {
                return;
            }

            let Some(queue) = self.queues.get_mut(&guild) else {
                return;
            };
            let channel = queue.announce_channel;
            let Some(track) = queue.pop() else {
                debug!(guild = %guild, "queue empty; player idle");
                return;
            };

            let Some(inbox) = self.loopback.upgrade() else {
                return;
            };
            let on_complete = CompletionHandle::new(guild, inbox, self.handoff_deadline);

            match self.voice.play(guild, &track, on_complete) {
                Ok(()) => {
                    info!(guild = %guild, title = %track.title, "track started");
                    self.announce(channel, format!("Now playing: **{}**", track.title))
                        .await;
                    if let Ok(event) = ServerEvent::json(
                        Some("track_started".to_string()),
                        &TrackStartedEvent {
                            guild,
                            title: track.title,
                        },
                    ) {
                        self.activity.broadcast(event);
                    }
                    return;
                }
                Err(err) => {
                    warn!(guild = %guild, title = %track.title, error = %err, "track failed to start");
                    self.announce(
                        channel,
                        format!("Couldn't play **{}**: `{err}`", track.title),
                    )
                    .await;
                }
            }
        }
    }

    async fn stop(&mut self, guild: GuildId) -> Result<usize, VoiceError> {
        let dropped = self
            .queues
            .remove(&guild)
            .map(|mut queue| queue.drain())
            .unwrap_or(0);

        let _ = self.voice.stop_track(guild);
        self.voice.disconnect(guild).await?;
        info!(guild = %guild, dropped, "playback stopped");
        Ok(dropped)
    }

    async fn announce(&self, channel: ChannelId, text: String) {
        if let Err(err) = self.chat.send(channel, OutboundMessage::text(text)).await {
            warn!(channel = %channel, error = %err, "failed to post playback update");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeVoice, RecordingChat};

    const GUILD: GuildId = GuildId(1);
    const TEXT: ChannelId = ChannelId(10);

    fn track(title: &str) -> Track {
        Track {
            source_uri: format!("https://media.example/{title}"),
            title: title.into(),
        }
    }

    fn start(voice: FakeVoice) -> (PlaybackHandle, Arc<FakeVoice>, Arc<RecordingChat>) {
        let voice = Arc::new(voice);
        let chat = Arc::new(RecordingChat::default());
        let (handle, scheduler) = PlaybackScheduler::new(
            chat.clone(),
            voice.clone(),
            SseHub::new(8),
            Duration::from_millis(100),
        );
        tokio::spawn(scheduler.run());
        (handle, voice, chat)
    }

    #[tokio::test]
    async fn tracks_play_in_enqueue_order() {
        let (handle, voice, chat) = start(FakeVoice::connected(GUILD, ChannelId(99)));

        assert_eq!(
            handle.enqueue(GUILD, TEXT, track("t1")).await.unwrap(),
            EnqueueOutcome::Started
        );
        assert_eq!(
            handle.enqueue(GUILD, TEXT, track("t2")).await.unwrap(),
            EnqueueOutcome::Queued { position: 1 }
        );
        assert_eq!(
            handle.enqueue(GUILD, TEXT, track("t3")).await.unwrap(),
            EnqueueOutcome::Queued { position: 2 }
        );
        assert_eq!(voice.played(), ["t1"]);

        voice.finish(GUILD, None);
        handle.snapshot(GUILD).await.unwrap();
        assert_eq!(voice.played(), ["t1", "t2"]);

        // An errored track still advances the queue.
        voice.finish(GUILD, Some("decoder crashed"));
        let snapshot = handle.snapshot(GUILD).await.unwrap();
        assert_eq!(voice.played(), ["t1", "t2", "t3"]);
        assert!(snapshot.playing);
        assert!(snapshot.pending.is_empty());
        assert!(
            chat.texts()
                .iter()
                .any(|text| text.contains("decoder crashed"))
        );

        voice.finish(GUILD, None);
        let snapshot = handle.snapshot(GUILD).await.unwrap();
        assert!(!snapshot.playing);
        assert_eq!(voice.played().len(), 3);
    }

    #[tokio::test]
    async fn enqueue_without_voice_connection_fails() {
        let (handle, voice, _chat) = start(FakeVoice::default());

        let err = handle.enqueue(GUILD, TEXT, track("t1")).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotConnected));
        assert!(voice.played().is_empty());
    }

    #[tokio::test]
    async fn failing_track_is_reported_and_skipped() {
        let (handle, voice, chat) = start(FakeVoice::connected(GUILD, ChannelId(99)));
        voice.break_track("broken");

        handle.enqueue(GUILD, TEXT, track("first")).await.unwrap();
        handle.enqueue(GUILD, TEXT, track("broken")).await.unwrap();
        handle.enqueue(GUILD, TEXT, track("last")).await.unwrap();

        voice.finish(GUILD, None);
        handle.snapshot(GUILD).await.unwrap();

        assert_eq!(voice.played(), ["first", "last"]);
        assert!(chat.texts().iter().any(|text| text.contains("broken")));
    }

    #[tokio::test]
    async fn stop_drains_and_disconnects() {
        let (handle, voice, _chat) = start(FakeVoice::connected(GUILD, ChannelId(99)));
        for title in ["a", "b", "c"] {
            handle.enqueue(GUILD, TEXT, track(title)).await.unwrap();
        }

        assert_eq!(handle.stop(GUILD).await.unwrap(), 2);
        assert!(!voice.status(GUILD).is_connected());

        let snapshot = handle.snapshot(GUILD).await.unwrap();
        assert!(snapshot.pending.is_empty());
        assert!(matches!(
            handle.stop(GUILD).await,
            Err(ServiceError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn skip_requires_a_playing_track() {
        let (handle, voice, _chat) = start(FakeVoice::connected(GUILD, ChannelId(99)));

        assert!(matches!(
            handle.skip(GUILD).await,
            Err(ServiceError::InvalidInput(_))
        ));

        handle.enqueue(GUILD, TEXT, track("a")).await.unwrap();
        handle.enqueue(GUILD, TEXT, track("b")).await.unwrap();
        handle.skip(GUILD).await.unwrap();
        voice.finish(GUILD, None);
        handle.snapshot(GUILD).await.unwrap();
        assert_eq!(voice.played(), ["a", "b"]);
    }

    #[tokio::test]
    async fn disconnect_tears_queue_down() {
        let (handle, voice, _chat) = start(FakeVoice::connected(GUILD, ChannelId(99)));
        handle.enqueue(GUILD, TEXT, track("a")).await.unwrap();
        handle.enqueue(GUILD, TEXT, track("b")).await.unwrap();

        handle.disconnected(GUILD).await;
        let snapshot = handle.snapshot(GUILD).await.unwrap();
        assert!(snapshot.pending.is_empty());
        assert_eq!(voice.played(), ["a"]);
    }
}
