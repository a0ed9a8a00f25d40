use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::{
    dto::sse::{Handshake, ServerEvent},
    state::SharedState,
};

/// Subscribe to the activity feed and greet the new listener.
pub fn subscribe_activity(state: &SharedState) -> broadcast::Receiver<ServerEvent> {
    let receiver = state.activity().subscribe();
    let handshake = Handshake {
        stream: "activity".into(),
        message: "activity stream connected".into(),
        degraded: state.is_degraded(),
    };
    match ServerEvent::json(Some("handshake".to_string()), &handshake) {
        Ok(event) => state.activity().broadcast(event),
        Err(err) => warn!(error = %err, "failed to encode handshake"),
    }
    receiver
}

/// Convert a broadcast receiver into an SSE response, forwarding events until the client
/// disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            let mut event = Event::default().data(payload.data);
                            if let Some(name) = payload.event {
                                event = event.event(name);
                            }
                            if tx.send(Ok(event)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(skipped, "activity listener lagged");
                        }
                    }
                }
            }
        }
        info!("activity SSE stream disconnected");
    });

    Sse::new(ReceiverStream::new(rx)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::harness;

    #[tokio::test]
    async fn new_listener_receives_handshake() {
        let h = harness().build();
        let mut receiver = subscribe_activity(&h.state);

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some("handshake"));
        let payload: serde_json::Value = serde_json::from_str(&event.data).unwrap();
        assert_eq!(payload["stream"], "activity");
        assert_eq!(payload["degraded"], false);
    }
}
