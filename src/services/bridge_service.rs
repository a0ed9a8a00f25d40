use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::bridge::{BridgeInbound, BridgeOutbound, ButtonClick, InboundMessage},
    platform::GuildId,
    services::{adventure_service, command_service, reactions},
    state::{SharedState, adventure::CHOICE_ID_PREFIX},
};

const HELLO_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle the full lifecycle of a platform gateway connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let Some(bridge) = state.bridge().cloned() else {
        warn!("gateway connection refused: chat is not served by the bridge");
        return;
    };

    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Writer task keeps outbound frames flowing while inbound frames are awaited.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let first_frame = match tokio::time::timeout(HELLO_TIMEOUT, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) => {
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Ok(_))) => {
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Err(err))) => {
            warn!(error = %err, "gateway receive error");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(None) | Err(_) => {
            warn!("gateway hello timed out");
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let gateway = match BridgeInbound::from_json_str(&first_frame) {
        Ok(BridgeInbound::Hello { gateway }) => gateway,
        Ok(_) => {
            warn!("first gateway frame was not hello");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Err(err) => {
            warn!(error = %err, "failed to parse gateway hello");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let connection = bridge.attach(outbound_tx.clone());
    info!(%gateway, %connection, "platform gateway attached");

    match serde_json::to_string(&BridgeOutbound::Welcome { connection }) {
        Ok(payload) => {
            if outbound_tx.send(Message::Text(payload.into())).is_err() {
                release(&state, connection).await;
                finalize(writer_task, outbound_tx).await;
                return;
            }
        }
        Err(err) => warn!(error = %err, "failed to encode welcome frame"),
    }

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match BridgeInbound::from_json_str(&text) {
                Ok(frame) => dispatch(&state, frame).await,
                Err(err) => warn!(%connection, error = %err, "failed to parse gateway frame"),
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(%connection, "gateway closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) | Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(%connection, error = %err, "gateway websocket error");
                break;
            }
        }
    }

    release(&state, connection).await;
    finalize(writer_task, outbound_tx).await;
}

/// Detach the connection and drop the queues of every guild whose voice state went with it.
pub async fn release(state: &SharedState, connection: Uuid) {
    let Some(bridge) = state.bridge() else {
        return;
    };
    for guild in bridge.detach(connection) {
        state.playback().disconnected(guild).await;
    }
}

/// Route one inbound gateway frame.
///
/// Chat work runs on its own task so a long quiz or a slow resolution never blocks the
/// frames behind it.
pub async fn dispatch(state: &SharedState, frame: BridgeInbound) {
    match frame {
        BridgeInbound::Hello { gateway } => {
            warn!(%gateway, "ignoring duplicate hello");
        }
        BridgeInbound::Message(message) => on_message(state, message),
        BridgeInbound::Button(click) => on_button(state, click),
        BridgeInbound::TrackFinished { guild, error } => on_track_finished(state, guild, error),
        BridgeInbound::VoiceDisconnected { guild } => {
            if let Some(bridge) = state.bridge() {
                // The scheduler tears the queue down; a pending completion no longer matters.
                let _ = bridge.voice_disconnected(guild);
            }
            info!(guild = %guild, "voice connection dropped by the platform");
            state.playback().disconnected(guild).await;
        }
        BridgeInbound::GuildSnapshot(snapshot) => {
            debug!(guild = %snapshot.id, name = %snapshot.name, "guild snapshot cached");
            state.directory().remember_guild(snapshot);
        }
        BridgeInbound::Unknown => debug!("ignoring unknown gateway frame"),
    }
}

fn on_message(state: &SharedState, message: InboundMessage) {
    // A pending quiz question claims the reply before it can be read as a command.
    if state
        .replies()
        .deliver(message.author.id, message.channel, &message.content)
    {
        return;
    }
    tokio::spawn(command_service::handle_message(state.clone(), message));
}

fn on_button(state: &SharedState, click: ButtonClick) {
    if !click.custom_id.starts_with(CHOICE_ID_PREFIX) {
        debug!(custom_id = %click.custom_id, "ignoring foreign button");
        return;
    }
    let state = state.clone();
    tokio::spawn(async move {
        let channel = click.channel;
        if let Err(err) = adventure_service::handle_click(&state, click).await {
            reactions::report_error(&state, channel, &err).await;
        }
    });
}

fn on_track_finished(state: &SharedState, guild: GuildId, error: Option<String>) {
    let Some(handle) = state.bridge().and_then(|bridge| bridge.track_finished(guild)) else {
        debug!(guild = %guild, "track end without a pending completion");
        return;
    };
    // The hand-off may block until the scheduler inbox has room.
    tokio::task::spawn_blocking(move || {
        if let Err(err) = handle.complete(error) {
            warn!(guild = %guild, error = %err, "track completion was lost");
        }
    });
}

/// Ensure the writer task winds down before the socket handler returns.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
