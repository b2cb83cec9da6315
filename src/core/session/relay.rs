//! Duplex relay actor.
//!
//! Each call runs four tasks around one actor:
//!
//! ```text
//!  telephony reader ──┐                      ┌──> upstream writer
//!                     ├─> RelayInput ─> CallRelay
//!  upstream reader  ──┘                      └──> telephony writer
//! ```
//!
//! The readers only parse frames; the actor owns the [`CallSession`] and
//! handles inputs strictly in arrival order, so an interruption is complete
//! (truncate sent, clear sent, session reset) before the next audio delta
//! is looked at.
//!
//! # States
//! `AwaitingStart -> Active -> Closed`. Caller audio is only forwarded while
//! `Active`; either leg closing moves the relay to `Closed`, which ends
//! [`CallRelay::run`] and drops both outbound channels.

use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::core::audio;
use crate::core::realtime::{ClientEvent, ServerEvent};
use crate::core::session::interrupt::InterruptionController;
use crate::core::session::state::{CallSession, DeltaDisposition};
use crate::core::telephony::{TelephonyCommand, TelephonyEvent};

/// Buffer size of the per-call channels.
pub const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Input to the relay actor, tagged by the leg it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayInput {
    /// Parsed telephony event
    Telephony(TelephonyEvent),
    /// Telephony socket closed or failed
    TelephonyClosed,
    /// Parsed speech-AI event
    Upstream(ServerEvent),
    /// Speech-AI socket closed or failed
    UpstreamClosed,
}

/// Relay lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Connected, waiting for the telephony `start` event
    AwaitingStart,
    /// Stream started; audio flows both ways
    Active,
    /// One leg is gone; the call is over
    Closed,
}

impl RelayState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingStart => "awaiting_start",
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }
}

/// The state-owning actor of one call.
pub struct CallRelay {
    session: CallSession,
    state: RelayState,
    controller: InterruptionController,
    upstream_tx: mpsc::Sender<ClientEvent>,
    telephony_tx: mpsc::Sender<TelephonyCommand>,
}

impl CallRelay {
    pub fn new(
        session: CallSession,
        controller: InterruptionController,
        upstream_tx: mpsc::Sender<ClientEvent>,
        telephony_tx: mpsc::Sender<TelephonyCommand>,
    ) -> Self {
        Self {
            session,
            state: RelayState::AwaitingStart,
            controller,
            upstream_tx,
            telephony_tx,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn session(&self) -> &CallSession {
        &self.session
    }

    /// Process inputs until the relay closes. Returns the final session.
    pub async fn run(mut self, mut inputs: mpsc::Receiver<RelayInput>) -> CallSession {
        while self.state != RelayState::Closed {
            match inputs.recv().await {
                Some(input) => self.handle(input).await,
                None => self.close("all relay inputs ended"),
            }
        }
        self.session
    }

    /// Process one input.
    pub async fn handle(&mut self, input: RelayInput) {
        if self.state == RelayState::Closed {
            trace!("Relay closed, ignoring {:?}", input);
            return;
        }

        match input {
            RelayInput::Telephony(event) => self.on_telephony_event(event).await,
            RelayInput::TelephonyClosed => self.close("telephony leg disconnected"),
            RelayInput::Upstream(event) => self.on_upstream_event(event).await,
            RelayInput::UpstreamClosed => self.close("speech-AI leg disconnected"),
        }
    }

    // ===== Telephony -> speech-AI =====

    async fn on_telephony_event(&mut self, event: TelephonyEvent) {
        match event {
            TelephonyEvent::Connected { protocol } => {
                debug!(protocol = ?protocol, "Telephony socket connected");
            }
            TelephonyEvent::Start { start } => {
                info!(
                    stream_sid = %start.stream_sid,
                    call_sid = ?start.call_sid,
                    "Incoming stream has started"
                );
                let greeting_due = self.session.start_stream(start.stream_sid, start.call_sid);
                self.state = RelayState::Active;

                if greeting_due {
                    let greeting = self.session.agent().greeting.clone();
                    debug!(agent = %self.session.agent().id, "Sending greeting");
                    for event in ClientEvent::greeting(greeting) {
                        self.send_upstream(event).await;
                    }
                }
            }
            TelephonyEvent::Media { media } => {
                if self.state != RelayState::Active {
                    trace!("Dropping caller audio received before stream start");
                    return;
                }
                if let Some(timestamp) = media.timestamp {
                    self.session.record_media_timestamp(timestamp);
                }
                match audio::inbound_payload(&media.payload) {
                    Ok(audio) => {
                        self.send_upstream(ClientEvent::InputAudioBufferAppend { audio })
                            .await
                    }
                    Err(e) => warn!("Skipping caller audio chunk: {}", e),
                }
            }
            TelephonyEvent::Mark { mark } => match self.session.acknowledge_mark() {
                Some(token) => trace!(
                    token,
                    name = ?mark.map(|m| m.name),
                    pending = self.session.pending_ack_count(),
                    "Mark acknowledged"
                ),
                None => trace!("Mark received with no pending acknowledgements"),
            },
            TelephonyEvent::Stop => {
                info!(stream_sid = ?self.session.stream_id(), "Telephony stream stopped");
                self.close("telephony stream stopped");
            }
            TelephonyEvent::Unknown => {
                trace!("Ignoring unknown telephony event");
            }
        }
    }

    // ===== Speech-AI -> telephony =====

    async fn on_upstream_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::AudioDelta { item_id, delta, .. } => {
                let payload = match audio::outbound_payload(&delta) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(item_id = ?item_id, "Skipping assistant audio chunk: {}", e);
                        return;
                    }
                };

                match self.session.accept_audio_delta(item_id.as_deref()) {
                    DeltaDisposition::Relay { stream_sid, ack } => {
                        trace!(item_id = ?item_id, ack, "Relaying assistant audio");
                        self.send_telephony(TelephonyCommand::media(stream_sid.clone(), payload))
                            .await;
                        self.send_telephony(TelephonyCommand::response_mark(stream_sid))
                            .await;
                    }
                    DeltaDisposition::NoListener => {
                        debug!(item_id = ?item_id, "Dropping assistant audio, stream not started");
                    }
                    DeltaDisposition::Stale => {
                        trace!(
                            item_id = ?item_id,
                            epoch = self.session.epoch(),
                            "Discarding audio of interrupted item"
                        );
                    }
                }
            }
            ServerEvent::AudioDone { item_id, .. } => {
                debug!(item_id = %item_id, "Assistant audio complete");
                self.session.mark_audio_done(&item_id);
            }
            ServerEvent::SpeechStarted { audio_start_ms, .. } => {
                info!(audio_start_ms, "Received event: input_audio_buffer.speech_started");
                if let Some(commands) = self.controller.on_speech_started(&mut self.session) {
                    self.send_upstream(commands.truncate).await;
                    if let Some(clear) = commands.clear {
                        self.send_telephony(clear).await;
                    }
                }
            }
            ServerEvent::SpeechStopped { audio_end_ms, .. } => {
                info!(audio_end_ms, "Received event: input_audio_buffer.speech_stopped");
                self.send_upstream(ClientEvent::InputAudioBufferCommit).await;
                self.send_upstream(ClientEvent::ResponseCreate).await;
            }
            ServerEvent::Error { error } => {
                warn!(
                    code = ?error.code,
                    error_type = ?error.error_type,
                    "Received event: error: {}",
                    error.message
                );
            }
            ServerEvent::SessionCreated { .. }
            | ServerEvent::InputAudioBufferCommitted { .. }
            | ServerEvent::ResponseContentDone { .. }
            | ServerEvent::ResponseDone { .. }
            | ServerEvent::RateLimitsUpdated { .. } => {
                info!("Received event: {}", event.event_type());
            }
            ServerEvent::SessionUpdated { .. } | ServerEvent::ConversationItemTruncated { .. } => {
                debug!("Received event: {}", event.event_type());
            }
            ServerEvent::Other => {
                trace!("Ignoring upstream event");
            }
        }
    }

    // ===== Outbound =====

    async fn send_upstream(&mut self, event: ClientEvent) {
        let event_type = event.event_type();
        if self.upstream_tx.send(event).await.is_err() {
            debug!("Speech-AI writer gone, dropping {}", event_type);
            self.close("speech-AI writer stopped");
        }
    }

    async fn send_telephony(&mut self, command: TelephonyCommand) {
        if self.telephony_tx.send(command).await.is_err() {
            debug!("Telephony writer gone, dropping command");
            self.close("telephony writer stopped");
        }
    }

    fn close(&mut self, reason: &str) {
        if self.state != RelayState::Closed {
            info!(
                stream_sid = ?self.session.stream_id(),
                from = self.state.as_str(),
                "Relay closing: {}",
                reason
            );
            self.state = RelayState::Closed;
        }
    }
}
