//! Error types shared by the outbound service clients.

use reqwest::StatusCode;
use thiserror::Error;

/// Failures while asking the text-generation service.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The request could not be sent or the connection broke.
    #[error("failed to reach the text generation service")]
    RequestSend {
        /// Transport failure.
        #[source]
        source: reqwest::Error,
    },
    /// The service answered with a non-success status.
    #[error("text generation service returned {status}")]
    RequestStatus {
        /// Status returned.
        status: StatusCode,
        /// Response body, kept for the logs.
        body: String,
    },
    /// The response body was not the expected JSON document.
    #[error("failed to decode text generation response")]
    DecodeResponse {
        /// Decoding failure.
        #[source]
        source: reqwest::Error,
    },
    /// The response carried no candidate text.
    #[error("text generation response contained no text")]
    EmptyResponse,
}

/// Failures while looking up track metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The request could not be sent.
    #[error("failed to send metadata request to `{path}`")]
    RequestSend {
        /// Catalogue path requested.
        path: String,
        /// Transport failure.
        #[source]
        source: reqwest::Error,
    },
    /// The catalogue answered with a non-success status.
    #[error("unexpected metadata response status {status} for `{path}`")]
    RequestStatus {
        /// Catalogue path requested.
        path: String,
        /// Status returned.
        status: StatusCode,
    },
    /// The response body was not the expected JSON document.
    #[error("failed to decode metadata response for `{path}`")]
    DecodeResponse {
        /// Catalogue path requested.
        path: String,
        /// Decoding failure.
        #[source]
        source: reqwest::Error,
    },
    /// The track has no artist listed.
    #[error("track `{0}` has no artist")]
    MissingArtist(String),
}

/// Failures while turning a query into a playable source.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The resolver executable could not be started.
    #[error("failed to start `{program}`")]
    Spawn {
        /// Executable that failed to start.
        program: String,
        /// Spawn failure.
        #[source]
        source: std::io::Error,
    },
    /// The resolver exited unsuccessfully.
    #[error("media resolution exited with {status}: {stderr}")]
    Exit {
        /// Exit status as printed by the OS.
        status: String,
        /// Captured standard error.
        stderr: String,
    },
    /// The resolver did not finish in time and was killed.
    #[error("media resolution timed out")]
    TimedOut,
    /// The resolver printed something other than the expected JSON.
    #[error("failed to parse media resolution output")]
    Parse(#[source] serde_json::Error),
    /// Nothing matched the query.
    #[error("no results for `{0}`")]
    NoResults(String),
    /// The match carries no streamable URL.
    #[error("resolved entry has no playable url")]
    MissingSource,
}
