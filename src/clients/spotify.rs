use std::{
    sync::{Arc, LazyLock},
    time::{Duration, Instant},
};

use futures::future::BoxFuture;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use super::{TrackInfo, TrackMetadata, error::MetadataError};

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE_URL: &str = "https://api.spotify.com/v1";
/// Tokens are refreshed this long before Spotify says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

static TRACK_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://open\.spotify\.com/(?:intl-[a-zA-Z-]+/)?track/([A-Za-z0-9]+)")
        .expect("track link pattern is valid")
});

/// Extract the track identifier from a Spotify track link.
pub fn parse_track_link(query: &str) -> Option<&str> {
    TRACK_LINK
        .captures(query.trim())
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str())
}

/// Client credentials for the Spotify Web API.
#[derive(Debug, Clone)]
pub struct SpotifyCredentials {
    /// Application client id.
    pub client_id: String,
    /// Application client secret.
    pub client_secret: String,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// [`TrackMetadata`] backed by the Spotify Web API, caching the client-credentials token.
#[derive(Clone)]
pub struct SpotifyClient {
    client: Client,
    credentials: Arc<SpotifyCredentials>,
    token: Arc<Mutex<Option<AccessToken>>>,
}

impl SpotifyClient {
    /// Client that fetches a token on first use.
    pub fn new(client: Client, credentials: SpotifyCredentials) -> Self {
        Self {
            client,
            credentials: Arc::new(credentials),
            token: Arc::new(Mutex::new(None)),
        }
    }

    /// Return a cached bearer token, fetching a new one through the client-credentials flow.
    async fn access_token(&self) -> Result<String, MetadataError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard
            .as_ref()
            .filter(|token| token.expires_at > Instant::now())
        {
            return Ok(token.value.clone());
        }

        let response = self
            .client
            .post(TOKEN_URL)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|source| MetadataError::RequestSend {
                path: TOKEN_URL.into(),
                source,
            })?;

        if response.status() != StatusCode::OK {
            return Err(MetadataError::RequestStatus {
                path: TOKEN_URL.into(),
                status: response.status(),
            });
        }

        let payload = response
            .json::<TokenResponse>()
            .await
            .map_err(|source| MetadataError::DecodeResponse {
                path: TOKEN_URL.into(),
                source,
            })?;

        let lifetime = Duration::from_secs(payload.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        debug!(lifetime_secs = lifetime.as_secs(), "refreshed spotify access token");
        guard.replace(AccessToken {
            value: payload.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(payload.access_token)
    }

    async fn fetch_track(&self, track_id: String) -> Result<TrackInfo, MetadataError> {
        let token = self.access_token().await?;
        let path = format!("{API_BASE_URL}/tracks/{track_id}");

        let response = self
            .client
            .get(&path)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|source| MetadataError::RequestSend {
                path: path.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(MetadataError::RequestStatus {
                path,
                status: response.status(),
            });
        }

        let track = response
            .json::<TrackResponse>()
            .await
            .map_err(|source| MetadataError::DecodeResponse {
                path: path.clone(),
                source,
            })?;
        track.into_info(&track_id)
    }
}

impl TrackMetadata for SpotifyClient {
    fn track_info(&self, track_id: String) -> BoxFuture<'static, Result<TrackInfo, MetadataError>> {
        let client = self.clone();
        Box::pin(async move { client.fetch_track(track_id).await })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct TrackResponse {
    name: String,
    #[serde(default)]
    artists: Vec<ArtistResponse>,
}

#[derive(Debug, Deserialize)]
struct ArtistResponse {
    name: String,
}

impl TrackResponse {
    fn into_info(self, track_id: &str) -> Result<TrackInfo, MetadataError> {
        let artist = self
            .artists
            .into_iter()
            .next()
            .ok_or_else(|| MetadataError::MissingArtist(track_id.to_string()))?;
        Ok(TrackInfo {
            name: self.name,
            artist: artist.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_links_are_recognised() {
        assert_eq!(
            parse_track_link("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC?si=abc"),
            Some("4uLU6hMCjMI75M1A2tKUQC")
        );
        assert_eq!(
            parse_track_link("https://open.spotify.com/intl-id/track/0VjIjW4GlUZAMYd2vXMi3b"),
            Some("0VjIjW4GlUZAMYd2vXMi3b")
        );
    }

    #[test]
    fn other_queries_are_not_track_links() {
        assert_eq!(parse_track_link("never gonna give you up"), None);
        assert_eq!(
            parse_track_link("https://open.spotify.com/album/1DFixLWuPkv3KT3TnV35m3"),
            None
        );
        assert_eq!(parse_track_link("https://youtu.be/dQw4w9WgXcQ"), None);
    }

    #[test]
    fn primary_artist_is_first_listed() {
        let track: TrackResponse = serde_json::from_value(serde_json::json!({
            "name": "Bohemian Rhapsody",
            "artists": [{"name": "Queen"}, {"name": "Someone Else"}]
        }))
        .unwrap();
        assert_eq!(
            track.into_info("x").unwrap(),
            TrackInfo {
                name: "Bohemian Rhapsody".into(),
                artist: "Queen".into()
            }
        );
    }
}
