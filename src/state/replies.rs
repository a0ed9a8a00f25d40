use std::time::Duration;

use dashmap::DashMap;
use tokio::{sync::oneshot, time::timeout};

use crate::platform::{ChannelId, UserId};

/// Pending "next message from this user in this channel" waits.
#[derive(Debug, Default)]
pub struct ReplyWaiters {
    waiting: DashMap<(UserId, ChannelId), oneshot::Sender<String>>,
}

impl ReplyWaiters {
    /// No pending waits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the next message of `user` in `channel`; `None` when `limit` elapses first.
    pub async fn wait_for(&self, user: UserId, channel: ChannelId, limit: Duration) -> Option<String> {
        let (tx, rx) = oneshot::channel();
        self.waiting.insert((user, channel), tx);

        match timeout(limit, rx).await {
            Ok(Ok(content)) => Some(content),
            Ok(Err(_)) | Err(_) => {
                self.waiting
                    .remove_if(&(user, channel), |_, pending| pending.is_closed());
                None
            }
        }
    }

    /// Hand `content` to a waiter; false when nobody was waiting for it.
    pub fn deliver(&self, user: UserId, channel: ChannelId, content: &str) -> bool {
        match self.waiting.remove(&(user, channel)) {
            Some((_, tx)) => tx.send(content.to_string()).is_ok(),
            None => false,
        }
    }

    /// Whether a wait is pending for `user` in `channel`.
    pub fn is_waiting(&self, user: UserId, channel: ChannelId) -> bool {
        self.waiting.contains_key(&(user, channel))
    }
}
