use tracing::{debug, info};

use crate::{
    clients::spotify::parse_track_link,
    error::ServiceError,
    state::{SharedState, playback::Track},
};

/// Turn a search string or link into a playable [`Track`].
///
/// Catalogue track links are rewritten to `"<title> <artist>"` before searching. Lookups run
/// on their own task so a slow resolution never holds up the caller's executor thread.
pub async fn resolve(state: &SharedState, query: &str) -> Result<Track, ServiceError> {
    let mut query = query.trim().to_string();
    if query.is_empty() {
        return Err(ServiceError::InvalidInput(format!(
            "Usage: `{}play <song title or link>`",
            state.config().command_prefix
        )));
    }

    if let Some(track_id) = parse_track_link(&query).map(str::to_string) {
        let metadata = state
            .track_metadata()
            .ok_or(ServiceError::CapabilityDisabled("Spotify"))?;
        let lookup = tokio::spawn(metadata.track_info(track_id.clone()));
        let info = lookup
            .await
            .map_err(|err| ServiceError::ResolutionError(err.to_string()))??;
        debug!(track_id = %track_id, name = %info.name, artist = %info.artist, "track link rewritten");
        query = format!("{} {}", info.name, info.artist);
    }

    let resolution = tokio::spawn(state.media_resolver().resolve(query.clone()));
    let media = resolution
        .await
        .map_err(|err| ServiceError::ResolutionError(err.to_string()))??;
    info!(query = %query, title = %media.title, "track resolved");

    Ok(Track {
        source_uri: media.source_uri,
        title: media.title,
    })
}
