use dashmap::DashMap;
use thiserror::Error;

use crate::{
    platform::{ChannelId, MessageRef, UserId},
    state::adventure::AdventureStage,
};

/// Live two-button choice message, owned by the user who started the adventure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChoiceView {
    /// User allowed to click.
    pub owner: UserId,
    /// Channel the view was posted in.
    pub channel: ChannelId,
    /// Stage whose choices the buttons offer.
    pub stage: AdventureStage,
}

/// Why a click was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClaimError {
    /// Already used or timed out.
    #[error("this choice is no longer available")]
    Expired,
    /// Clicked by a user other than the owner.
    #[error("this choice belongs to someone else")]
    NotOwner,
}

/// Choice views awaiting a click, keyed by the message carrying the buttons.
#[derive(Debug, Default)]
pub struct ChoiceViews {
    views: DashMap<MessageRef, ChoiceView>,
}

impl ChoiceViews {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `view` until it is claimed or expires.
    pub fn register(&self, message: MessageRef, view: ChoiceView) {
        self.views.insert(message, view);
    }

    /// Consume the view for a click by `user`. Clicks by anyone else leave it in place.
    pub fn claim(&self, message: MessageRef, user: UserId) -> Result<ChoiceView, ClaimError> {
        let owner = self
            .views
            .get(&message)
            .map(|view| view.owner)
            .ok_or(ClaimError::Expired)?;
        if owner != user {
            return Err(ClaimError::NotOwner);
        }
        self.views
            .remove_if(&message, |_, view| view.owner == user)
            .map(|(_, view)| view)
            .ok_or(ClaimError::Expired)
    }

    /// Drop the view if it is still waiting at `stage`, returning it.
    ///
    /// A message is re-registered with the next stage after every click, so a stale
    /// expiry for an earlier stage leaves the live view alone.
    pub fn expire(&self, message: MessageRef, stage: AdventureStage) -> Option<ChoiceView> {
        self.views
            .remove_if(&message, |_, view| view.stage == stage)
            .map(|(_, view)| view)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn view(owner: u64) -> ChoiceView {
        ChoiceView {
            owner: UserId(owner),
            channel: ChannelId(5),
            stage: AdventureStage::Crossroads,
        }
    }

    #[test]
    fn only_owner_can_claim_and_only_once() {
        let views = ChoiceViews::new();
        let message = Uuid::new_v4();
        views.register(message, view(1));

        assert_eq!(views.claim(message, UserId(2)), Err(ClaimError::NotOwner));
        assert_eq!(views.claim(message, UserId(1)), Ok(view(1)));
        assert_eq!(views.claim(message, UserId(1)), Err(ClaimError::Expired));
    }

    #[test]
    fn expired_view_cannot_be_claimed() {
        let views = ChoiceViews::new();
        let message = Uuid::new_v4();
        views.register(message, view(1));

        assert_eq!(
            views.expire(message, AdventureStage::Crossroads),
            Some(view(1))
        );
        assert_eq!(views.expire(message, AdventureStage::Crossroads), None);
        assert_eq!(views.claim(message, UserId(1)), Err(ClaimError::Expired));
    }

    #[test]
    fn stale_expiry_keeps_reregistered_view() {
        let views = ChoiceViews::new();
        let message = Uuid::new_v4();
        views.register(message, view(1));
        views.claim(message, UserId(1)).unwrap();
        views.register(
            message,
            ChoiceView {
                stage: AdventureStage::Forest,
                ..view(1)
            },
        );

        assert_eq!(views.expire(message, AdventureStage::Crossroads), None);
        assert!(views.claim(message, UserId(1)).is_ok());
    }
}
