/// Per-user adventure progress.
pub mod adventure;
/// Known guild channels and members.
pub mod directory;
/// Per-guild track queues.
pub mod playback;
/// Quiz questions, answers and scoring.
pub mod quiz;
/// Waiters for a user's next chat message.
pub mod replies;
/// Active sessions keyed by user.
pub mod session;
mod sse;
/// Button views awaiting a single choice.
pub mod views;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    clients::{MediaResolver, TextGenerator, TrackMetadata},
    config::AppConfig,
    dao::score_store::ScoreStore,
    platform::{ChatPlatform, VoiceGateway, bridge::Bridge},
    services::playback_service::{PlaybackHandle, PlaybackScheduler},
};

pub use self::sse::SseHub;
use self::{directory::Directory, replies::ReplyWaiters, session::SessionStore, views::ChoiceViews};

/// State handle shared across routes, services and background tasks.
pub type SharedState = Arc<AppState>;

const ACTIVITY_CAPACITY: usize = 32;

/// External services the bot core is wired to.
pub struct Collaborators {
    /// Text side of the platform.
    pub chat: Arc<dyn ChatPlatform>,
    /// Voice side of the platform.
    pub voice: Arc<dyn VoiceGateway>,
    /// Persisted win ledger.
    pub scores: Arc<dyn ScoreStore>,
    /// `None` when no API key is configured.
    pub text_generator: Option<Arc<dyn TextGenerator>>,
    /// `None` when no catalogue credentials are configured.
    pub track_metadata: Option<Arc<dyn TrackMetadata>>,
    /// Turns a track reference into a streamable URL.
    pub media_resolver: Arc<dyn MediaResolver>,
    /// Present when chat and voice are served by the WebSocket bridge.
    pub bridge: Option<Arc<Bridge>>,
}

/// Central application state: sessions, views, reply waiters and collaborator handles.
pub struct AppState {
    config: Arc<AppConfig>,
    sessions: SessionStore,
    views: ChoiceViews,
    replies: ReplyWaiters,
    directory: Directory,
    activity: SseHub,
    ledger_gate: Mutex<()>,
    playback: PlaybackHandle,
    collaborators: Collaborators,
}

impl AppState {
    /// Build the shared state together with the playback scheduler the caller must spawn.
    pub fn new(config: AppConfig, collaborators: Collaborators) -> (SharedState, PlaybackScheduler) {
        let activity = SseHub::new(ACTIVITY_CAPACITY);
        let (playback, scheduler) = PlaybackScheduler::new(
            collaborators.chat.clone(),
            collaborators.voice.clone(),
            activity.clone(),
            config.handoff_deadline,
        );

        let state = Arc::new(Self {
            config: Arc::new(config),
            sessions: SessionStore::new(),
            views: ChoiceViews::new(),
            replies: ReplyWaiters::new(),
            directory: Directory::new(),
            activity,
            ledger_gate: Mutex::new(()),
            playback,
            collaborators,
        });

        (state, scheduler)
    }

    /// Loaded configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Active adventure and quiz sessions.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Live adventure choice messages.
    pub fn views(&self) -> &ChoiceViews {
        &self.views
    }

    /// Pending quiz answer waits.
    pub fn replies(&self) -> &ReplyWaiters {
        &self.replies
    }

    /// Guild channel and member cache.
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Broadcast hub used for the activity SSE stream.
    pub fn activity(&self) -> &SseHub {
        &self.activity
    }

    /// Serializes ledger read-modify-write cycles within the process.
    pub fn ledger_gate(&self) -> &Mutex<()> {
        &self.ledger_gate
    }

    /// Handle to the playback scheduler.
    pub fn playback(&self) -> &PlaybackHandle {
        &self.playback
    }

    /// Chat platform used for every outbound message.
    pub fn chat(&self) -> &dyn ChatPlatform {
        self.collaborators.chat.as_ref()
    }

    /// Voice gateway used by the scheduler.
    pub fn voice(&self) -> &dyn VoiceGateway {
        self.collaborators.voice.as_ref()
    }

    /// Win ledger.
    pub fn scores(&self) -> &dyn ScoreStore {
        self.collaborators.scores.as_ref()
    }

    /// Text generator, when configured.
    pub fn text_generator(&self) -> Option<Arc<dyn TextGenerator>> {
        self.collaborators.text_generator.clone()
    }

    /// Track catalogue, when configured.
    pub fn track_metadata(&self) -> Option<Arc<dyn TrackMetadata>> {
        self.collaborators.track_metadata.clone()
    }

    /// Media resolver.
    pub fn media_resolver(&self) -> Arc<dyn MediaResolver> {
        self.collaborators.media_resolver.clone()
    }

    /// WebSocket bridge, when chat and voice are served through it.
    pub fn bridge(&self) -> Option<&Arc<Bridge>> {
        self.collaborators.bridge.as_ref()
    }

    /// Degraded while no platform gateway is attached to the bridge.
    pub fn is_degraded(&self) -> bool {
        self.bridge().is_some_and(|bridge| !bridge.is_attached())
    }
}
