use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;

use crate::{
    clients::error::{GenerationError, MetadataError, ResolveError},
    dao::storage::StorageError,
    platform::{ChatError, VoiceError},
    state::{session::SessionError, views::ClaimError},
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The user already has a session running.
    #[error("a game is already in progress for this user")]
    AlreadyActive,
    /// Someone other than the session owner pressed a choice.
    #[error("this interaction belongs to another user")]
    NotYourSession,
    /// The choice view was already used or timed out.
    #[error("this choice has expired")]
    ChoiceExpired,
    /// A collaborator is not configured.
    #[error("{0} is not configured")]
    ServiceUnavailable(&'static str),
    /// A collaborator refused the request.
    #[error("generation failed: {detail}")]
    GenerationFailed {
        /// HTTP status, when the failure came with one.
        status: Option<u16>,
        /// Failure description.
        detail: String,
    },
    /// A collaborator answered with something we could not understand.
    #[error("malformed output: {0}")]
    MalformedOutput(String),
    /// The query could not be turned into a playable track.
    #[error("could not resolve track: {0}")]
    ResolutionError(String),
    /// A track link was given but the metadata service is not configured.
    #[error("{0} links are not supported")]
    CapabilityDisabled(&'static str),
    /// No qualifying follow-up event arrived in time.
    #[error("operation timed out")]
    Timeout,
    /// The audio backend failed.
    #[error("playback error: {0}")]
    Playback(String),
    /// The bot has no voice connection in this guild.
    #[error("not connected to a voice channel")]
    NotConnected,
    /// Invalid input provided by the user.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The author lacks the permission needed for the command.
    #[error("missing permission: {0}")]
    PermissionDenied(&'static str),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// The score ledger could not be written.
    #[error("storage failure")]
    Storage(#[from] StorageError),
    /// The chat platform could not be reached.
    #[error("chat platform failure")]
    Chat(#[from] ChatError),
}

impl ServiceError {
    /// Text shown to the user in chat when an operation fails.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::AlreadyActive => {
                "You're in the middle of a game already, finish that one first!".into()
            }
            ServiceError::NotYourSession => "This isn't your adventure, mate!".into(),
            ServiceError::ChoiceExpired => "That choice has expired.".into(),
            ServiceError::ServiceUnavailable(what) => {
                format!("Oops, the {what} isn't set up by the bot owner yet.")
            }
            ServiceError::GenerationFailed {
                status: Some(status),
                detail,
            } => format!("The old man got a headache and couldn't think. Error: {status}\n`{detail}`"),
            ServiceError::GenerationFailed { status: None, detail } => {
                format!("Couldn't reach the AI's brain. Try again later.\nDetail: `{detail}`")
            }
            ServiceError::MalformedOutput(_) => {
                "The AI answered with gibberish. Try again later.".into()
            }
            ServiceError::ResolutionError(detail) => {
                format!("Couldn't find anything playable: `{detail}`")
            }
            ServiceError::CapabilityDisabled(what) => {
                format!("{what} links aren't enabled on this bot.")
            }
            ServiceError::Timeout => "Time's up! The quiz is cancelled.".into(),
            ServiceError::Playback(detail) => format!("Playback error: `{detail}`"),
            ServiceError::NotConnected => "I'm not in a voice channel.".into(),
            ServiceError::InvalidInput(message) => message.clone(),
            ServiceError::PermissionDenied(permission) => {
                format!("You need the `{permission}` permission for that.")
            }
            ServiceError::NotFound(message) => message.clone(),
            ServiceError::Storage(_) => "Couldn't save the scores, sorry.".into(),
            ServiceError::Chat(_) => "The chat platform is unreachable right now.".into(),
        }
    }
}

impl From<SessionError> for ServiceError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::AlreadyActive => ServiceError::AlreadyActive,
        }
    }
}

impl From<ClaimError> for ServiceError {
    fn from(err: ClaimError) -> Self {
        match err {
            ClaimError::Expired => ServiceError::ChoiceExpired,
            ClaimError::NotOwner => ServiceError::NotYourSession,
        }
    }
}

impl From<VoiceError> for ServiceError {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::NotInVoice => ServiceError::NotConnected,
            VoiceError::Disconnected => ServiceError::Chat(ChatError::Disconnected),
            VoiceError::NothingPlaying => {
                ServiceError::InvalidInput("Nothing is playing right now.".into())
            }
            VoiceError::AlreadyPlaying => ServiceError::Playback(err.to_string()),
        }
    }
}

impl From<GenerationError> for ServiceError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::RequestStatus { status, body } => ServiceError::GenerationFailed {
                status: Some(status.as_u16()),
                detail: body,
            },
            GenerationError::RequestSend { source } => ServiceError::GenerationFailed {
                status: None,
                detail: source.to_string(),
            },
            GenerationError::DecodeResponse { .. } | GenerationError::EmptyResponse => {
                ServiceError::MalformedOutput(err.to_string())
            }
        }
    }
}

impl From<MetadataError> for ServiceError {
    fn from(err: MetadataError) -> Self {
        ServiceError::ResolutionError(err.to_string())
    }
}

impl From<ResolveError> for ServiceError {
    fn from(err: ResolveError) -> Self {
        ServiceError::ResolutionError(err.to_string())
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::AlreadyActive
            | ServiceError::NotYourSession
            | ServiceError::ChoiceExpired
            | ServiceError::NotConnected => AppError::Conflict(err.to_string()),
            ServiceError::ServiceUnavailable(_)
            | ServiceError::CapabilityDisabled(_)
            | ServiceError::Timeout
            | ServiceError::Chat(_) => AppError::ServiceUnavailable(err.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
