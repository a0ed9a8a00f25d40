//! Outbound service clients: text generation, music metadata and media resolution.

pub mod error;
/// Gemini text generation.
pub mod gemini;
/// Spotify track metadata.
pub mod spotify;
/// yt-dlp media resolution.
pub mod ytdlp;

use futures::future::BoxFuture;

use self::error::{GenerationError, MetadataError, ResolveError};

/// Free-form text generation from a single prompt.
pub trait TextGenerator: Send + Sync {
    /// Complete `prompt`, returning the generated text.
    fn generate(&self, prompt: String) -> BoxFuture<'static, Result<String, GenerationError>>;
}

/// Name and primary artist of a catalogue track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    /// Track title.
    pub name: String,
    /// Primary artist.
    pub artist: String,
}

/// Catalogue lookup for links pasted by users.
pub trait TrackMetadata: Send + Sync {
    /// Look up a catalogue track by id.
    fn track_info(&self, track_id: String) -> BoxFuture<'static, Result<TrackInfo, MetadataError>>;
}

/// Playable source found for a search string or URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    /// Direct media URL.
    pub source_uri: String,
    /// Title reported by the source.
    pub title: String,
}

/// Turns queries into streamable sources.
pub trait MediaResolver: Send + Sync {
    /// Find a streamable source for a URL or search string.
    fn resolve(&self, query: String) -> BoxFuture<'static, Result<ResolvedMedia, ResolveError>>;
}
