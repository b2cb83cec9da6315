//! Mock speech-AI server
//!
//! Accepts a single realtime WebSocket session, records every client event it
//! receives and lets the test push server events back to the relay.

#![allow(dead_code)]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

/// Default wait for any expected event.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Handshake details captured from the relay's connection.
#[derive(Debug, Clone)]
pub struct HandshakeInfo {
    pub uri: String,
    pub authorization: Option<String>,
    pub openai_beta: Option<String>,
}

pub struct MockUpstream {
    /// Base URL to configure as the realtime endpoint
    pub url: String,
    received: mpsc::UnboundedReceiver<Value>,
    outgoing: Option<mpsc::UnboundedSender<String>>,
    handshake: Option<oneshot::Receiver<HandshakeInfo>>,
}

impl MockUpstream {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (received_tx, received_rx) = mpsc::unbounded_channel::<Value>();
        let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<String>();
        let (handshake_tx, handshake_rx) = oneshot::channel::<HandshakeInfo>();

        tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };

            let callback = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
                let header = |name: &str| {
                    request
                        .headers()
                        .get(name)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string)
                };
                let _ = handshake_tx.send(HandshakeInfo {
                    uri: request.uri().to_string(),
                    authorization: header("authorization"),
                    openai_beta: header("openai-beta"),
                });
                Ok(response)
            };

            let Ok(ws) = accept_hdr_async(stream, callback).await else {
                return;
            };
            let (mut write, mut read) = ws.split();

            loop {
                tokio::select! {
                    incoming = read.next() => match incoming {
                        Some(Ok(Message::Text(text))) => {
                            let value: Value = serde_json::from_str(text.as_str()).unwrap();
                            if received_tx.send(value).is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    },
                    outgoing = outgoing_rx.recv() => match outgoing {
                        Some(frame) => {
                            if write.send(Message::Text(frame.into())).await.is_err() {
                                break;
                            }
                        }
                        None => {
                            let _ = write.send(Message::Close(None)).await;
                            break;
                        }
                    },
                }
            }
        });

        Self {
            url: format!("ws://{}/v1/realtime", addr),
            received: received_rx,
            outgoing: Some(outgoing_tx),
            handshake: Some(handshake_rx),
        }
    }

    /// Handshake of the first (and only) connection.
    pub async fn handshake(&mut self) -> HandshakeInfo {
        let rx = self.handshake.take().expect("handshake already taken");
        tokio::time::timeout(EVENT_TIMEOUT, rx)
            .await
            .expect("timed out waiting for handshake")
            .expect("mock closed before handshake")
    }

    /// Push a server event to the relay.
    pub fn send(&self, event: Value) {
        self.send_raw(&event.to_string());
    }

    /// Push an arbitrary text frame, valid JSON or not.
    pub fn send_raw(&self, frame: &str) {
        self.outgoing
            .as_ref()
            .expect("mock already closed")
            .send(frame.to_string())
            .expect("mock connection gone");
    }

    /// Close the upstream connection from the server side.
    pub fn close(&mut self) {
        self.outgoing = None;
    }

    /// Next client event received from the relay.
    pub async fn next_event(&mut self) -> Value {
        tokio::time::timeout(EVENT_TIMEOUT, self.received.recv())
            .await
            .expect("timed out waiting for client event")
            .expect("upstream connection closed")
    }

    /// Next client event whose type is not `input_audio_buffer.append`.
    pub async fn next_control_event(&mut self) -> Value {
        loop {
            let event = self.next_event().await;
            if event["type"] != "input_audio_buffer.append" {
                return event;
            }
        }
    }

    /// Wait until the relay closes the upstream connection.
    pub async fn wait_closed(&mut self) {
        let closed = tokio::time::timeout(EVENT_TIMEOUT, async {
            while self.received.recv().await.is_some() {}
        })
        .await;
        assert!(closed.is_ok(), "upstream connection was not closed");
    }

    /// Assert nothing arrives within `wait`.
    pub async fn assert_silent(&mut self, wait: Duration) {
        if let Ok(Some(event)) = tokio::time::timeout(wait, self.received.recv()).await {
            panic!("unexpected client event: {}", event);
        }
    }
}
