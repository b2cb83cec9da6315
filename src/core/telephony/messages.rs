//! Media stream message types.
//!
//! Inbound events arrive as `{"event": "<kind>", ...}` text frames. Only the
//! fields the relay reads are modelled; everything else is ignored.
//!
//! # Inbound events
//! - `connected` - socket established, no stream yet
//! - `start` - stream started, carries `streamSid`
//! - `media` - one chunk of caller audio
//! - `mark` - a previously sent mark finished playing
//! - `stop` - stream ended
//!
//! # Outbound commands
//! - `media` - one chunk of audio to play
//! - `mark` - acknowledgement request for the audio sent before it
//! - `clear` - drop all buffered audio not yet played

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use super::{RESPONSE_MARK_NAME, TelephonyResult};

// =============================================================================
// Inbound Events
// =============================================================================

/// Events received from the telephony platform.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyEvent {
    /// Socket connected
    Connected {
        /// Protocol name
        #[serde(default)]
        protocol: Option<String>,
    },

    /// Stream started
    Start {
        /// Stream metadata
        start: StreamStart,
    },

    /// Caller audio
    Media {
        /// Audio chunk
        media: MediaPayload,
    },

    /// Mark played back
    Mark {
        /// Mark details
        #[serde(default)]
        mark: Option<MarkPayload>,
    },

    /// Stream stopped
    Stop,

    /// Any other event
    #[serde(other)]
    Unknown,
}

impl TelephonyEvent {
    /// Parse a JSON text frame.
    pub fn parse(text: &str) -> TelephonyResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Event name for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Start { .. } => "start",
            Self::Media { .. } => "media",
            Self::Mark { .. } => "mark",
            Self::Stop => "stop",
            Self::Unknown => "unknown",
        }
    }
}

/// Metadata of a started stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStart {
    /// Stream identifier used in every outbound command
    pub stream_sid: String,

    /// Call the stream belongs to
    #[serde(default)]
    pub call_sid: Option<String>,

    /// `<Parameter>` values from the answering markup
    #[serde(default)]
    pub custom_parameters: HashMap<String, String>,
}

/// Audio carried by a media event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaPayload {
    /// Base64 u-law audio
    pub payload: String,

    /// Milliseconds since stream start; the platform sends it as a string
    #[serde(default, deserialize_with = "deserialize_timestamp", skip_serializing)]
    pub timestamp: Option<u64>,
}

/// Mark name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkPayload {
    pub name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrInt {
    Int(u64),
    Str(String),
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<StringOrInt>::deserialize(deserializer)? {
        None => Ok(None),
        Some(StringOrInt::Int(ms)) => Ok(Some(ms)),
        Some(StringOrInt::Str(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

// =============================================================================
// Outbound Commands
// =============================================================================

/// Commands sent to the telephony platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyCommand {
    /// Play audio
    Media {
        /// Target stream
        #[serde(rename = "streamSid")]
        stream_sid: String,
        /// Audio chunk
        media: MediaPayload,
    },

    /// Request a playback acknowledgement
    Mark {
        /// Target stream
        #[serde(rename = "streamSid")]
        stream_sid: String,
        /// Mark details
        mark: MarkPayload,
    },

    /// Flush buffered audio
    Clear {
        /// Target stream
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

impl TelephonyCommand {
    pub fn media(stream_sid: impl Into<String>, payload: String) -> Self {
        Self::Media {
            stream_sid: stream_sid.into(),
            media: MediaPayload {
                payload,
                timestamp: None,
            },
        }
    }

    /// The mark that follows every relayed audio chunk.
    pub fn response_mark(stream_sid: impl Into<String>) -> Self {
        Self::Mark {
            stream_sid: stream_sid.into(),
            mark: MarkPayload {
                name: RESPONSE_MARK_NAME.to_string(),
            },
        }
    }

    pub fn clear(stream_sid: impl Into<String>) -> Self {
        Self::Clear {
            stream_sid: stream_sid.into(),
        }
    }

    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> TelephonyResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
