//! Telephony leg.
//!
//! The telephony platform streams call audio over a WebSocket as JSON
//! events carrying base64 G.711 u-law at 8kHz. This module holds:
//!
//! - [`messages`]: inbound events and outbound commands of the media stream
//! - [`twiml`]: the markup that answers an inbound call and points the
//!   platform at the media-stream endpoint
//! - [`client`]: the REST client that places an outbound call

pub mod client;
pub mod messages;
pub mod twiml;

use thiserror::Error;

pub use client::{TwilioClient, TwilioCredentials};
pub use messages::{MarkPayload, MediaPayload, StreamStart, TelephonyCommand, TelephonyEvent};
pub use twiml::{incoming_call_twiml, media_stream_url};

/// Name attached to every mark sent after an audio chunk.
pub const RESPONSE_MARK_NAME: &str = "responsePart";

/// Errors on the telephony side.
#[derive(Debug, Error)]
pub enum TelephonyError {
    /// Frame could not be decoded
    #[error("Malformed telephony frame: {0}")]
    MalformedFrame(#[from] serde_json::Error),

    /// A URL could not be built from configuration or request data
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Required telephony configuration is missing
    #[error("Missing telephony configuration: {0}")]
    MissingConfiguration(String),

    /// Transport failure talking to the REST API
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The REST API answered with a non-success status
    #[error("Telephony API error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// Result type for telephony operations.
pub type TelephonyResult<T> = Result<T, TelephonyError>;
