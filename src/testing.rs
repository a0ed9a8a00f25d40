//! In-memory collaborators used by unit tests.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use dashmap::DashMap;
use futures::future::{self, BoxFuture};
use uuid::Uuid;

use crate::{
    clients::{
        MediaResolver, ResolvedMedia, TextGenerator, TrackInfo, TrackMetadata,
        error::{GenerationError, MetadataError, ResolveError},
    },
    config::AppConfig,
    dao::{models::ScoreLedger, score_store::ScoreStore, storage::StorageResult},
    platform::{
        ChannelId, ChatError, ChatPlatform, GuildId, MessageRef, ModerationAction,
        OutboundMessage, VoiceError, VoiceGateway, VoiceStatus,
    },
    state::{
        AppState, Collaborators, SharedState,
        playback::{CompletionHandle, Track},
    },
};

/// Chat platform that records every outbound action.
#[derive(Default)]
pub struct RecordingChat {
    pub sent: Mutex<Vec<(ChannelId, MessageRef, OutboundMessage)>>,
    pub edits: Mutex<Vec<(MessageRef, OutboundMessage)>>,
    pub deleted: Mutex<Vec<MessageRef>>,
    pub ephemeral: Mutex<Vec<(String, String)>>,
    pub moderation: Mutex<Vec<ModerationAction>>,
}

impl RecordingChat {
    /// Plain-text contents of every sent message, in order.
    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, _, message)| message.content.clone())
            .collect()
    }

    /// Embed titles of every sent message, in order.
    pub fn embed_titles(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, _, message)| message.embed.as_ref().map(|e| e.title.clone()))
            .collect()
    }

    pub fn last_sent(&self) -> Option<(ChannelId, MessageRef, OutboundMessage)> {
        self.sent.lock().unwrap().last().cloned()
    }

    pub fn ephemeral_texts(&self) -> Vec<String> {
        self.ephemeral
            .lock()
            .unwrap()
            .iter()
            .map(|(_, content)| content.clone())
            .collect()
    }
}

impl ChatPlatform for RecordingChat {
    fn send(
        &self,
        channel: ChannelId,
        message: OutboundMessage,
    ) -> BoxFuture<'_, Result<MessageRef, ChatError>> {
        let message_ref = Uuid::new_v4();
        self.sent
            .lock()
            .unwrap()
            .push((channel, message_ref, message));
        Box::pin(future::ready(Ok(message_ref)))
    }

    fn edit(
        &self,
        _channel: ChannelId,
        message: MessageRef,
        update: OutboundMessage,
    ) -> BoxFuture<'_, Result<(), ChatError>> {
        self.edits.lock().unwrap().push((message, update));
        Box::pin(future::ready(Ok(())))
    }

    fn delete(
        &self,
        _channel: ChannelId,
        message: MessageRef,
    ) -> BoxFuture<'_, Result<(), ChatError>> {
        self.deleted.lock().unwrap().push(message);
        Box::pin(future::ready(Ok(())))
    }

    fn reply_ephemeral(
        &self,
        interaction: String,
        content: String,
    ) -> BoxFuture<'_, Result<(), ChatError>> {
        self.ephemeral.lock().unwrap().push((interaction, content));
        Box::pin(future::ready(Ok(())))
    }

    fn moderate(&self, action: ModerationAction) -> BoxFuture<'_, Result<(), ChatError>> {
        self.moderation.lock().unwrap().push(action);
        Box::pin(future::ready(Ok(())))
    }
}

/// Voice gateway keeping status in memory; tests end tracks with [`FakeVoice::finish`].
#[derive(Default)]
pub struct FakeVoice {
    status: DashMap<GuildId, VoiceStatus>,
    completions: DashMap<GuildId, CompletionHandle>,
    played: Mutex<Vec<String>>,
    broken: Mutex<HashSet<String>>,
}

impl FakeVoice {
    pub fn connected(guild: GuildId, channel: ChannelId) -> Self {
        let voice = Self::default();
        voice.status.insert(
            guild,
            VoiceStatus {
                channel: Some(channel),
                ..VoiceStatus::default()
            },
        );
        voice
    }

    /// Titles that started streaming, in order.
    pub fn played(&self) -> Vec<String> {
        self.played.lock().unwrap().clone()
    }

    /// Make `play` fail immediately for the given title.
    pub fn break_track(&self, title: &str) {
        self.broken.lock().unwrap().insert(title.to_string());
    }

    /// End the current track the way the audio backend would.
    pub fn finish(&self, guild: GuildId, error: Option<&str>) {
        if let Some(mut status) = self.status.get_mut(&guild) {
            status.playing = false;
            status.paused = false;
        }
        let (_, handle) = self
            .completions
            .remove(&guild)
            .expect("no track is playing");
        handle.complete(error.map(str::to_string)).unwrap();
    }
}

impl VoiceGateway for FakeVoice {
    fn connect(&self, guild: GuildId, channel: ChannelId) -> BoxFuture<'_, Result<(), VoiceError>> {
        self.status.entry(guild).or_default().channel = Some(channel);
        Box::pin(future::ready(Ok(())))
    }

    fn disconnect(&self, guild: GuildId) -> BoxFuture<'_, Result<(), VoiceError>> {
        self.completions.remove(&guild);
        let result = self
            .status
            .remove(&guild)
            .map(|_| ())
            .ok_or(VoiceError::NotInVoice);
        Box::pin(future::ready(result))
    }

    fn status(&self, guild: GuildId) -> VoiceStatus {
        self.status.get(&guild).map(|s| *s).unwrap_or_default()
    }

    fn play(
        &self,
        guild: GuildId,
        track: &Track,
        on_complete: CompletionHandle,
    ) -> Result<(), VoiceError> {
        let mut status = self.status.get_mut(&guild).ok_or(VoiceError::NotInVoice)?;
        if status.is_busy() {
            return Err(VoiceError::AlreadyPlaying);
        }
        if self.broken.lock().unwrap().contains(&track.title) {
            return Err(VoiceError::NothingPlaying);
        }
        status.playing = true;
        self.played.lock().unwrap().push(track.title.clone());
        self.completions.insert(guild, on_complete);
        Ok(())
    }

    fn pause(&self, guild: GuildId) -> Result<(), VoiceError> {
        let mut status = self.status.get_mut(&guild).ok_or(VoiceError::NotInVoice)?;
        if !status.playing {
            return Err(VoiceError::NothingPlaying);
        }
        status.playing = false;
        status.paused = true;
        Ok(())
    }

    fn resume(&self, guild: GuildId) -> Result<(), VoiceError> {
        let mut status = self.status.get_mut(&guild).ok_or(VoiceError::NotInVoice)?;
        if !status.paused {
            return Err(VoiceError::NothingPlaying);
        }
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
        Ok(())
    }
}

/// Text generator replaying canned responses in order.
#[derive(Default)]
pub struct ScriptedGenerator {
    responses: Mutex<Vec<Result<String, GenerationError>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn replying(response: impl Into<String>) -> Self {
        Self::scripted(vec![Ok(response.into())])
    }

    pub fn scripted(mut responses: Vec<Result<String, GenerationError>>) -> Self {
        responses.reverse();
        Self {
            responses: Mutex::new(responses),
            prompts: Mutex::default(),
        }
    }
}

impl TextGenerator for ScriptedGenerator {
    fn generate(&self, prompt: String) -> BoxFuture<'static, Result<String, GenerationError>> {
        self.prompts.lock().unwrap().push(prompt);
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop()
            .unwrap_or(Err(GenerationError::EmptyResponse));
        Box::pin(future::ready(next))
    }
}

/// Metadata service answering every lookup with the same track.
pub struct FixedMetadata(pub TrackInfo);

impl TrackMetadata for FixedMetadata {
    fn track_info(&self, _track_id: String) -> BoxFuture<'static, Result<TrackInfo, MetadataError>> {
        Box::pin(future::ready(Ok(self.0.clone())))
    }
}

/// Media resolver echoing the query as title and recording every query.
#[derive(Default)]
pub struct EchoResolver {
    pub queries: Mutex<Vec<String>>,
}

impl MediaResolver for EchoResolver {
    fn resolve(&self, query: String) -> BoxFuture<'static, Result<ResolvedMedia, ResolveError>> {
        self.queries.lock().unwrap().push(query.clone());
        let result = if query.is_empty() {
            Err(ResolveError::NoResults(query))
        } else {
            Ok(ResolvedMedia {
                source_uri: format!("https://media.example/{}", query.replace(' ', "-")),
                title: query,
            })
        };
        Box::pin(future::ready(result))
    }
}

/// Score store kept in memory.
#[derive(Default)]
pub struct MemoryScoreStore {
    ledger: Arc<Mutex<ScoreLedger>>,
}

impl MemoryScoreStore {
    pub fn with(ledger: ScoreLedger) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(ledger)),
        }
    }

    pub fn snapshot(&self) -> ScoreLedger {
        self.ledger.lock().unwrap().clone()
    }
}

impl ScoreStore for MemoryScoreStore {
    fn load(&self) -> BoxFuture<'static, ScoreLedger> {
        Box::pin(future::ready(self.snapshot()))
    }

    fn save(&self, ledger: ScoreLedger) -> BoxFuture<'static, StorageResult<()>> {
        *self.ledger.lock().unwrap() = ledger;
        Box::pin(future::ready(Ok(())))
    }
}

/// Fakes wired into an [`AppState`], with handles kept for assertions.
pub struct TestHarness {
    pub state: SharedState,
    pub chat: Arc<RecordingChat>,
    pub voice: Arc<FakeVoice>,
    pub scores: Arc<MemoryScoreStore>,
    pub resolver: Arc<EchoResolver>,
}

/// Builder for [`TestHarness`].
pub struct HarnessBuilder {
    config: AppConfig,
    voice: FakeVoice,
    scores: MemoryScoreStore,
    text_generator: Option<Arc<dyn TextGenerator>>,
    track_metadata: Option<Arc<dyn TrackMetadata>>,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            voice: FakeVoice::default(),
            scores: MemoryScoreStore::default(),
            text_generator: None,
            track_metadata: None,
        }
    }
}

impl HarnessBuilder {
    pub fn config(mut self, f: impl FnOnce(&mut AppConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn voice(mut self, voice: FakeVoice) -> Self {
        self.voice = voice;
        self
    }

    pub fn scores(mut self, ledger: ScoreLedger) -> Self {
        self.scores = MemoryScoreStore::with(ledger);
        self
    }

    pub fn generator(mut self, generator: impl TextGenerator + 'static) -> Self {
        self.text_generator = Some(Arc::new(generator));
        self
    }

    pub fn metadata(mut self, metadata: impl TrackMetadata + 'static) -> Self {
        self.track_metadata = Some(Arc::new(metadata));
        self
    }

    /// Build the state and spawn its playback scheduler; requires a tokio runtime.
    pub fn build(self) -> TestHarness {
        let chat = Arc::new(RecordingChat::default());
        let voice = Arc::new(self.voice);
        let scores = Arc::new(self.scores);
        let resolver = Arc::new(EchoResolver::default());

        let (state, scheduler) = AppState::new(
            self.config,
            Collaborators {
                chat: chat.clone(),
                voice: voice.clone(),
                scores: scores.clone(),
                text_generator: self.text_generator,
                track_metadata: self.track_metadata,
                media_resolver: resolver.clone(),
                bridge: None,
            },
        );
        tokio::spawn(scheduler.run());

        TestHarness {
            state,
            chat,
            voice,
            scores,
            resolver,
        }
    }
}

pub fn harness() -> HarnessBuilder {
    HarnessBuilder::default()
}
