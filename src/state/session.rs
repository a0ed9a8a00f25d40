use dashmap::{DashMap, mapref::entry::Entry};
use thiserror::Error;

use crate::{
    platform::UserId,
    state::{
        adventure::AdventureStage,
        quiz::{AnswerGrade, QuizSession, QuizStep},
    },
};

/// Interactive state of one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    /// Walking the branching story, currently at the given stage.
    Adventure(AdventureStage),
    /// Answering generated questions.
    Quiz(QuizSession),
}

impl Session {
    /// Short label used in logs and messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Session::Adventure(_) => "adventure",
            Session::Quiz(_) => "quiz",
        }
    }
}

/// Errors raised by [`SessionStore`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The user already has a session.
    #[error("a session is already active for this user")]
    AlreadyActive,
}

/// One active session per user identity.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<UserId, Session>,
}

impl SessionStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `session` for `user` unless one already exists.
    pub fn start(&self, user: UserId, session: Session) -> Result<(), SessionError> {
        match self.sessions.entry(user) {
            Entry::Occupied(_) => Err(SessionError::AlreadyActive),
            Entry::Vacant(slot) => {
                slot.insert(session);
                Ok(())
            }
        }
    }

    /// Copy of the user's session.
    pub fn get(&self, user: UserId) -> Option<Session> {
        self.sessions.get(&user).map(|entry| entry.value().clone())
    }

    /// Whether the user has any session.
    pub fn contains(&self, user: UserId) -> bool {
        self.sessions.contains_key(&user)
    }

    /// Remove the user's session; idempotent.
    pub fn end(&self, user: UserId) -> Option<Session> {
        self.sessions.remove(&user).map(|(_, session)| session)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Move an adventure from `from` to `to`; false when the session is elsewhere or gone.
    pub fn advance_adventure(&self, user: UserId, from: AdventureStage, to: AdventureStage) -> bool {
        match self.sessions.get_mut(&user) {
            Some(mut entry) if *entry.value() == Session::Adventure(from) => {
                *entry.value_mut() = Session::Adventure(to);
                true
            }
            _ => false,
        }
    }

    /// End the session only if it is still an adventure sitting at `stage`.
    pub fn end_if_at_stage(&self, user: UserId, stage: AdventureStage) -> bool {
        self.sessions
            .remove_if(&user, |_, session| *session == Session::Adventure(stage))
            .is_some()
    }

    /// Swap whatever the user has for a fresh quiz.
    pub fn begin_quiz(&self, user: UserId, quiz: QuizSession) {
        self.sessions.insert(user, Session::Quiz(quiz));
    }

    /// Next step of the user's quiz, `None` when no quiz is running.
    pub fn quiz_step(&self, user: UserId) -> Option<QuizStep> {
        match self.sessions.get(&user)?.value() {
            Session::Quiz(quiz) => Some(quiz.step()),
            Session::Adventure(_) => None,
        }
    }

    /// Grade a reply for the user's current quiz question.
    pub fn answer_quiz(&self, user: UserId, reply: &str) -> Option<AnswerGrade> {
        let mut entry = self.sessions.get_mut(&user)?;
        match entry.value_mut() {
            Session::Quiz(quiz) => quiz.answer(reply),
            Session::Adventure(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::quiz::QuizQuestion;

    const ALICE: UserId = UserId(1);
    const BOB: UserId = UserId(2);

    #[test]
    fn second_start_is_rejected_without_mutation() {
        let store = SessionStore::new();
        store
            .start(ALICE, Session::Adventure(AdventureStage::Forest))
            .unwrap();

        let err = store
            .start(ALICE, Session::Adventure(AdventureStage::Crossroads))
            .unwrap_err();
        assert_eq!(err, SessionError::AlreadyActive);
        assert_eq!(
            store.get(ALICE),
            Some(Session::Adventure(AdventureStage::Forest))
        );
    }

    #[test]
    fn users_are_keyed_independently() {
        let store = SessionStore::new();
        store
            .start(ALICE, Session::Adventure(AdventureStage::Crossroads))
            .unwrap();
        store
            .start(BOB, Session::Adventure(AdventureStage::Crossroads))
            .unwrap();
        assert_eq!(store.len(), 2);

        store.end(ALICE);
        assert!(!store.contains(ALICE));
        assert!(store.contains(BOB));
    }

    #[test]
    fn end_is_idempotent() {
        let store = SessionStore::new();
        assert_eq!(store.end(ALICE), None);
        store
            .start(ALICE, Session::Adventure(AdventureStage::Crossroads))
            .unwrap();
        assert!(store.end(ALICE).is_some());
        assert_eq!(store.end(ALICE), None);
        assert!(store.is_empty());
    }

    #[test]
    fn advance_requires_matching_stage() {
        let store = SessionStore::new();
        store
            .start(ALICE, Session::Adventure(AdventureStage::Crossroads))
            .unwrap();

        assert!(!store.advance_adventure(ALICE, AdventureStage::Forest, AdventureStage::Village));
        assert!(store.advance_adventure(
            ALICE,
            AdventureStage::Crossroads,
            AdventureStage::Forest
        ));
        assert_eq!(
            store.get(ALICE),
            Some(Session::Adventure(AdventureStage::Forest))
        );
    }

    #[test]
    fn reaper_only_removes_stale_stage() {
        let store = SessionStore::new();
        store
            .start(ALICE, Session::Adventure(AdventureStage::Forest))
            .unwrap();

        assert!(!store.end_if_at_stage(ALICE, AdventureStage::Crossroads));
        assert!(store.contains(ALICE));
        assert!(store.end_if_at_stage(ALICE, AdventureStage::Forest));
        assert!(!store.contains(ALICE));
    }

    #[test]
    fn quiz_replaces_adventure_and_tracks_answers() {
        let store = SessionStore::new();
        store
            .start(ALICE, Session::Adventure(AdventureStage::Village))
            .unwrap();
        assert_eq!(store.quiz_step(ALICE), None);

        store.begin_quiz(
            ALICE,
            QuizSession::new(vec![QuizQuestion::new("Capital of France?", "paris")]),
        );
        let grade = store.answer_quiz(ALICE, " Paris ").unwrap();
        assert!(grade.correct);
        assert!(matches!(
            store.quiz_step(ALICE),
            Some(QuizStep::Finished(outcome)) if outcome.score == 1
        ));
    }
}
