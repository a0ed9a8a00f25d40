use rand::seq::IndexedRandom;
use tracing::{info, warn};

use crate::{
    error::ServiceError,
    platform::{ChannelId, OutboundMessage},
    state::SharedState,
};

/// Post one GIF picked at random from `gifs`; nothing when the list is empty.
pub async fn post_random_gif(state: &SharedState, channel: ChannelId, gifs: &[String]) {
    let Some(gif) = gifs.choose(&mut rand::rng()).cloned() else {
        return;
    };
    if let Err(err) = state.chat().send(channel, OutboundMessage::text(gif)).await {
        warn!(channel = %channel, error = %err, "failed to post reaction gif");
    }
}

/// Tell the channel why an operation failed.
///
/// Timeouts are abandonment rather than failure and are only logged at `info`.
pub async fn report_error(state: &SharedState, channel: ChannelId, err: &ServiceError) {
    if matches!(err, ServiceError::Timeout) {
        info!(channel = %channel, "operation abandoned after timeout");
    } else {
        warn!(channel = %channel, error = %err, "operation failed");
    }
    if let Err(send_err) = state
        .chat()
        .send(channel, OutboundMessage::text(err.user_message()))
        .await
    {
        warn!(channel = %channel, error = %send_err, "failed to report error to channel");
    }
}
