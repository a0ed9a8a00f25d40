use std::{
    collections::VecDeque,
    thread,
    time::{Duration, Instant},
};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use utoipa::ToSchema;

use crate::platform::{ChannelId, GuildId, VoiceError};

/// Interval between two hand-off attempts while the scheduler inbox is full.
const HANDOFF_RETRY_INTERVAL: Duration = Duration::from_millis(5);

/// Resolved, playable unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Track {
    /// Direct media URI handed to the audio backend.
    pub source_uri: String,
    /// Display title.
    pub title: String,
}

/// FIFO of pending tracks for one guild, plus the text channel playback updates go to.
#[derive(Debug, Clone)]
pub struct PlaybackQueue {
    /// Text channel that receives "now playing" messages.
    pub announce_channel: ChannelId,
    pending: VecDeque<Track>,
}

impl PlaybackQueue {
    /// Empty queue announcing into `announce_channel`.
    pub fn new(announce_channel: ChannelId) -> Self {
        Self {
            announce_channel,
            pending: VecDeque::new(),
        }
    }

    /// Append at the back.
    pub fn push(&mut self, track: Track) {
        self.pending.push_back(track);
    }

    /// Take the next track.
    pub fn pop(&mut self) -> Option<Track> {
        self.pending.pop_front()
    }

    /// Drop every pending track, returning how many were discarded.
    pub fn drain(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    /// Number of pending tracks.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending tracks, next first.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.pending.iter()
    }
}

/// What happened to an enqueued track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The player was idle and the track started right away.
    Started,
    /// The track waits behind others; `position` is 1-based.
    Queued {
        /// Place in line, the next track being 1.
        position: usize,
    },
}

/// Pending tracks and player activity of one guild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct QueueSnapshot {
    /// A track is streaming.
    pub playing: bool,
    /// The current track is paused.
    pub paused: bool,
    /// Tracks waiting to play, next first.
    pub pending: Vec<Track>,
}

/// Requests processed by the playback scheduler task.
#[derive(Debug)]
pub enum PlaybackCommand {
    /// Queue a track, starting it when the player is idle.
    Enqueue {
        /// Target guild.
        guild: GuildId,
        /// Text channel for announcements.
        channel: ChannelId,
        /// Track to queue.
        track: Track,
        /// Receives where the track landed.
        reply: oneshot::Sender<Result<EnqueueOutcome, VoiceError>>,
    },
    /// The audio backend finished (or failed) the current track.
    TrackFinished {
        /// Guild whose player went idle.
        guild: GuildId,
        /// Backend failure, if any.
        error: Option<String>,
    },
    /// Halt the current track; the queue advances through its completion.
    Skip {
        /// Target guild.
        guild: GuildId,
        /// Fails when nothing is playing.
        reply: oneshot::Sender<Result<(), VoiceError>>,
    },
    /// Drain the queue and leave voice; replies with the number of discarded tracks.
    Stop {
        /// Target guild.
        guild: GuildId,
        /// Receives the discarded count.
        reply: oneshot::Sender<Result<usize, VoiceError>>,
    },
    /// The voice connection dropped underneath us.
    Disconnected {
        /// Guild that lost its voice connection.
        guild: GuildId,
    },
    /// Report pending tracks and player activity.
    Snapshot {
        /// Target guild.
        guild: GuildId,
        /// Receives the snapshot.
        reply: oneshot::Sender<QueueSnapshot>,
    },
}

/// Why a completion could not be handed back to the scheduler.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandOffError {
    /// The scheduler inbox is closed.
    #[error("playback scheduler has shut down")]
    SchedulerClosed,
    /// The inbox stayed full for the whole deadline.
    #[error("playback scheduler did not accept the completion within {0:?}")]
    DeadlineExceeded(Duration),
}

/// One-shot callback given to the audio backend for a single track.
///
/// It may be fired from any thread. Firing blocks the caller until the scheduler inbox has
/// accepted the continuation or the deadline passes; it never waits for the continuation
/// itself to run. Do not fire it from inside an async task, use `spawn_blocking`.
#[derive(Debug)]
pub struct CompletionHandle {
    guild: GuildId,
    inbox: mpsc::Sender<PlaybackCommand>,
    deadline: Duration,
}

impl CompletionHandle {
    /// Handle that reports into `inbox`, giving up after `deadline`.
    pub fn new(guild: GuildId, inbox: mpsc::Sender<PlaybackCommand>, deadline: Duration) -> Self {
        Self {
            guild,
            inbox,
            deadline,
        }
    }

    /// Guild the track plays in.
    pub fn guild(&self) -> GuildId {
        self.guild
    }

    /// Report the end of the track, `error` carrying the backend failure if any.
    pub fn complete(self, error: Option<String>) -> Result<(), HandOffError> {
        let started = Instant::now();
        let mut command = PlaybackCommand::TrackFinished {
            guild: self.guild,
            error,
        };

        loop {
            match self.inbox.try_send(command) {
                Ok(()) => return Ok(()),
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    return Err(HandOffError::SchedulerClosed);
                }
                Err(mpsc::error::TrySendError::Full(returned)) => {
                    if started.elapsed() >= self.deadline {
                        return Err(HandOffError::DeadlineExceeded(self.deadline));
                    }
                    command = returned;
                    thread::sleep(HANDOFF_RETRY_INTERVAL);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str) -> Track {
        Track {
            source_uri: format!("https://cdn.example/{title}.webm"),
            title: title.into(),
        }
    }

    #[test]
    fn queue_is_fifo() {
        let mut queue = PlaybackQueue::new(ChannelId(1));
        queue.push(track("t1"));
        queue.push(track("t2"));
        queue.push(track("t3"));

        let order: Vec<_> = std::iter::from_fn(|| queue.pop()).map(|t| t.title).collect();
        assert_eq!(order, ["t1", "t2", "t3"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn drain_discards_everything() {
        let mut queue = PlaybackQueue::new(ChannelId(1));
        queue.push(track("a"));
        queue.push(track("b"));
        assert_eq!(queue.drain(), 2);
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn completion_is_accepted_by_open_inbox() {
        let (tx, mut rx) = mpsc::channel(1);
        let handle = CompletionHandle::new(GuildId(9), tx, Duration::from_millis(50));

        handle.complete(Some("decoder crashed".into())).unwrap();

        match rx.try_recv().unwrap() {
            PlaybackCommand::TrackFinished { guild, error } => {
                assert_eq!(guild, GuildId(9));
                assert_eq!(error.as_deref(), Some("decoder crashed"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn completion_gives_up_when_inbox_stays_full() {
        let (tx, _rx) = mpsc::channel(1);
        tx.try_send(PlaybackCommand::Disconnected { guild: GuildId(1) })
            .unwrap();
        let deadline = Duration::from_millis(20);
        let handle = CompletionHandle::new(GuildId(1), tx, deadline);

        assert_eq!(
            handle.complete(None),
            Err(HandOffError::DeadlineExceeded(deadline))
        );
    }

    #[test]
    fn completion_reports_closed_scheduler() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle = CompletionHandle::new(GuildId(1), tx, Duration::from_millis(20));
        assert_eq!(handle.complete(None), Err(HandOffError::SchedulerClosed));
    }
}
