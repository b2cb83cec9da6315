//! Base traits and types for the speech-AI leg.
//!
//! The relay talks to the hosted speech service through a single duplex
//! WebSocket per call. [`UpstreamConnector`] is the seam between the relay
//! and whichever service implementation opens that socket and negotiates
//! the session.

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::core::agents::AgentConfig;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur on the speech-AI leg.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

impl From<tokio_tungstenite::tungstenite::Error> for RealtimeError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        RealtimeError::WebSocketError(e.to_string())
    }
}

impl From<serde_json::Error> for RealtimeError {
    fn from(e: serde_json::Error) -> Self {
        RealtimeError::SerializationError(e.to_string())
    }
}

// =============================================================================
// Upstream Session
// =============================================================================

/// WebSocket stream type of an upstream session.
pub type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A negotiated speech-AI session, ready to relay audio.
///
/// The session configuration has already been sent when a handle exists;
/// the initial greeting has not.
pub struct UpstreamHandle {
    /// The open WebSocket
    pub socket: UpstreamSocket,
    /// Provider session identifier for logging, if known
    pub session_label: String,
}

impl std::fmt::Debug for UpstreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamHandle")
            .field("session_label", &self.session_label)
            .finish_non_exhaustive()
    }
}

/// Opens and configures speech-AI sessions.
#[async_trait]
pub trait UpstreamConnector: Send + Sync {
    /// Open the upstream connection and send the session configuration for
    /// the given agent. No greeting is sent.
    async fn open_session(&self, agent: &AgentConfig) -> RealtimeResult<UpstreamHandle>;

    /// Provider information for diagnostics.
    fn provider_info(&self) -> serde_json::Value;
}
