//! Media-stream WebSocket handler
//!
//! One connection is one phone call. After the upgrade the handler opens the
//! speech-AI session for the requested agent, then wires both sockets to a
//! [`CallRelay`] through four tasks: a reader and a writer per leg. The
//! relay returns when either leg goes away; its outbound channels close, the
//! writers send close frames, and the readers are aborted.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::core::agents::AgentConfig;
use crate::core::realtime::{ClientEvent, ServerEvent, UpstreamSocket};
use crate::core::session::{
    CHANNEL_BUFFER_SIZE, CallRelay, CallSession, InterruptionController, RelayInput,
};
use crate::core::telephony::{TelephonyCommand, TelephonyEvent};
use crate::handlers::voice::AgentQuery;
use crate::state::AppState;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

/// How long writers get to flush and close after the relay ends.
const WRITER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Media-stream WebSocket handler
///
/// Unknown or missing agent ids use the default agent.
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<AgentQuery>,
) -> Response {
    let agent = state
        .agents
        .lookup(query.agent_or(state.agents.default_id()));

    let call_id = uuid::Uuid::new_v4();
    info!(agent = %agent.id, %call_id, "Media stream connection upgrade requested");

    ws.max_message_size(MAX_WS_MESSAGE_SIZE).on_upgrade(move |socket| {
        handle_media_stream(socket, state, agent).instrument(info_span!("call", %call_id))
    })
}

/// Run one call over an accepted telephony socket.
async fn handle_media_stream(socket: WebSocket, state: Arc<AppState>, agent: Arc<AgentConfig>) {
    info!(agent = %agent.id, "Telephony client connected");

    let (mut telephony_sink, telephony_stream) = socket.split();

    let upstream = match state.connector.open_session(&agent).await {
        Ok(handle) => handle,
        Err(e) => {
            error!(agent = %agent.id, "Speech-AI session negotiation failed: {}", e);
            // Hanging up lets the platform continue with the fallback markup.
            let _ = telephony_sink.send(Message::Close(None)).await;
            return;
        }
    };
    debug!(session = %upstream.session_label, "Speech-AI session negotiated");

    let (upstream_sink, upstream_stream) = upstream.socket.split();

    let (input_tx, input_rx) = mpsc::channel::<RelayInput>(CHANNEL_BUFFER_SIZE);
    let (upstream_tx, upstream_rx) = mpsc::channel::<ClientEvent>(CHANNEL_BUFFER_SIZE);
    let (telephony_tx, telephony_rx) = mpsc::channel::<TelephonyCommand>(CHANNEL_BUFFER_SIZE);

    let telephony_reader = tokio::spawn(read_telephony(telephony_stream, input_tx.clone()));
    let upstream_reader = tokio::spawn(read_upstream(upstream_stream, input_tx));
    let telephony_writer = tokio::spawn(write_telephony(telephony_sink, telephony_rx));
    let upstream_writer = tokio::spawn(write_upstream(upstream_sink, upstream_rx));

    let relay = CallRelay::new(
        CallSession::new(agent),
        InterruptionController::new(state.config.log_timing_math),
        upstream_tx,
        telephony_tx,
    );
    let session = relay.run(input_rx).await;

    // The relay dropped both senders, so the writers drain and close.
    if !shutdown_writers([telephony_writer, upstream_writer], WRITER_SHUTDOWN_TIMEOUT).await {
        warn!("Timed out closing call sockets");
    }
    telephony_reader.abort();
    upstream_reader.abort();

    info!(
        stream_sid = ?session.stream_id(),
        call_sid = ?session.call_sid(),
        agent = %session.agent().id,
        "Call ended"
    );
}

/// Wait up to `limit` for the writers to finish, aborting any still running.
///
/// Returns `false` when the limit was hit.
async fn shutdown_writers(mut writers: [JoinHandle<()>; 2], limit: Duration) -> bool {
    let [first, second] = &mut writers;
    let drained = tokio::time::timeout(limit, async {
        let _ = tokio::join!(first, second);
    })
    .await
    .is_ok();

    if !drained {
        for writer in &writers {
            writer.abort();
        }
    }
    drained
}

// ===== Readers =====

async fn read_telephony(mut stream: SplitStream<WebSocket>, tx: mpsc::Sender<RelayInput>) {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => match TelephonyEvent::parse(text.as_str()) {
                Ok(event) => {
                    if tx.send(RelayInput::Telephony(event)).await.is_err() {
                        return;
                    }
                }
                Err(e) => warn!("Skipping malformed telephony frame: {}", e),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Telephony WebSocket error: {}", e);
                break;
            }
        }
    }
    info!("Telephony client disconnected");
    let _ = tx.send(RelayInput::TelephonyClosed).await;
}

async fn read_upstream(
    mut stream: SplitStream<UpstreamSocket>,
    tx: mpsc::Sender<RelayInput>,
) {
    while let Some(message) = stream.next().await {
        match message {
            Ok(UpstreamMessage::Text(text)) => match ServerEvent::parse(text.as_str()) {
                Ok(event) => {
                    if tx.send(RelayInput::Upstream(event)).await.is_err() {
                        return;
                    }
                }
                Err(e) => warn!("Skipping malformed speech-AI frame: {}", e),
            },
            Ok(UpstreamMessage::Close(frame)) => {
                info!("Speech-AI WebSocket closed by server: {:?}", frame);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                error!("Speech-AI WebSocket error: {}", e);
                break;
            }
        }
    }
    let _ = tx.send(RelayInput::UpstreamClosed).await;
}

// ===== Writers =====

async fn write_telephony(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<TelephonyCommand>,
) {
    while let Some(command) = rx.recv().await {
        let json = match command.to_json() {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize telephony command: {}", e);
                continue;
            }
        };
        if let Err(e) = sink.send(Message::Text(json.into())).await {
            warn!("Failed to send to telephony: {}", e);
            return;
        }
    }
    let _ = sink.send(Message::Close(None)).await;
}

async fn write_upstream(
    mut sink: SplitSink<UpstreamSocket, UpstreamMessage>,
    mut rx: mpsc::Receiver<ClientEvent>,
) {
    while let Some(event) = rx.recv().await {
        let json = match event.to_json() {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize {}: {}", event.event_type(), e);
                continue;
            }
        };
        if let Err(e) = sink.send(UpstreamMessage::Text(json.into())).await {
            warn!("Failed to send to speech-AI service: {}", e);
            return;
        }
    }
    let _ = sink.send(UpstreamMessage::Close(None)).await;
}
