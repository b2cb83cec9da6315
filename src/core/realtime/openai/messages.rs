//! OpenAI Realtime API WebSocket message types.
//!
//! Only the slice of the protocol the call relay speaks is modelled here.
//! All events are JSON-encoded and carried as WebSocket text frames.
//!
//! # Protocol Overview
//!
//! Client events (sent to server):
//! - session.update - Configure voice, prompt, formats and turn detection
//! - input_audio_buffer.append - Append caller audio to the buffer
//! - input_audio_buffer.commit - Commit the buffered caller audio
//! - conversation.item.create - Add a user message (the greeting)
//! - conversation.item.truncate - Cut an assistant item at the heard offset
//! - response.create - Generate a response
//!
//! Server events (received from server):
//! - session.created / session.updated
//! - input_audio_buffer.speech_started / speech_stopped / committed
//! - response.audio.delta / response.audio.done
//! - response.content.done / response.done
//! - conversation.item.truncated
//! - rate_limits.updated
//! - error
//!
//! Any other server event type decodes to [`ServerEvent::Other`].

use serde::{Deserialize, Serialize};

use super::config::{Modality, OpenAIRealtimeAudioFormat, OpenAIRealtimeVoice};
use crate::core::realtime::base::RealtimeResult;

// =============================================================================
// Session Configuration
// =============================================================================

/// Session configuration sent in `session.update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Turn detection configuration
    pub turn_detection: TurnDetection,

    /// Input audio format
    pub input_audio_format: OpenAIRealtimeAudioFormat,

    /// Output audio format
    pub output_audio_format: OpenAIRealtimeAudioFormat,

    /// Voice for audio output
    pub voice: OpenAIRealtimeVoice,

    /// System instructions for the assistant
    pub instructions: String,

    /// Response modalities
    pub modalities: Vec<Modality>,

    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Turn detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Server-side voice activity detection
    #[serde(rename = "server_vad")]
    ServerVad {
        /// Activation threshold (0.0 - 1.0)
        #[serde(skip_serializing_if = "Option::is_none")]
        threshold: Option<f32>,
        /// Audio kept before detected speech, in ms
        #[serde(skip_serializing_if = "Option::is_none")]
        prefix_padding_ms: Option<u32>,
        /// Silence that ends a caller turn, in ms
        #[serde(skip_serializing_if = "Option::is_none")]
        silence_duration_ms: Option<u32>,
        /// Whether the server starts a response on its own when a turn ends
        #[serde(skip_serializing_if = "Option::is_none")]
        create_response: Option<bool>,
    },
}

impl TurnDetection {
    /// Server VAD with service defaults, leaving response creation to the client.
    pub fn server_vad() -> Self {
        Self::ServerVad {
            threshold: None,
            prefix_padding_ms: None,
            silence_duration_ms: None,
            create_response: Some(false),
        }
    }
}

// =============================================================================
// Conversation Items
// =============================================================================

/// Conversation item added with `conversation.item.create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationItem {
    /// Item type, always "message" here
    #[serde(rename = "type")]
    pub item_type: String,

    /// Speaker role
    pub role: String,

    /// Content parts
    pub content: Vec<ContentPart>,
}

impl ConversationItem {
    /// A user message carrying plain text.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            item_type: "message".to_string(),
            role: "user".to_string(),
            content: vec![ContentPart::InputText { text: text.into() }],
        }
    }
}

/// Content part of a conversation item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    /// Text typed by the user
    #[serde(rename = "input_text")]
    InputText {
        /// Text content
        text: String,
    },
}

// =============================================================================
// Client Events
// =============================================================================

/// Client events sent to the OpenAI Realtime API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update session configuration
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: SessionConfig,
    },

    /// Append audio to input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64-encoded PCM16 audio
        audio: String,
    },

    /// Commit input audio buffer
    #[serde(rename = "input_audio_buffer.commit")]
    InputAudioBufferCommit,

    /// Create conversation item
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate {
        /// Item to create
        item: ConversationItem,
    },

    /// Truncate an assistant audio item
    #[serde(rename = "conversation.item.truncate")]
    ConversationItemTruncate {
        /// Assistant item being cut
        item_id: String,
        /// Content part index within the item
        content_index: u32,
        /// Playback offset the caller actually heard, in ms
        audio_end_ms: u64,
    },

    /// Create response
    #[serde(rename = "response.create")]
    ResponseCreate,
}

impl ClientEvent {
    /// Truncate the first content part of `item_id` at `audio_end_ms`.
    pub fn truncate(item_id: impl Into<String>, audio_end_ms: u64) -> Self {
        Self::ConversationItemTruncate {
            item_id: item_id.into(),
            content_index: 0,
            audio_end_ms,
        }
    }

    /// The two events that make the assistant speak first.
    pub fn greeting(text: impl Into<String>) -> [Self; 2] {
        [
            Self::ConversationItemCreate {
                item: ConversationItem::user_text(text),
            },
            Self::ResponseCreate,
        ]
    }

    /// Wire name of this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SessionUpdate { .. } => "session.update",
            Self::InputAudioBufferAppend { .. } => "input_audio_buffer.append",
            Self::InputAudioBufferCommit => "input_audio_buffer.commit",
            Self::ConversationItemCreate { .. } => "conversation.item.create",
            Self::ConversationItemTruncate { .. } => "conversation.item.truncate",
            Self::ResponseCreate => "response.create",
        }
    }

    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> RealtimeResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// =============================================================================
// Server Events
// =============================================================================

/// Error details carried by an `error` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error type
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,

    /// Error code
    #[serde(default)]
    pub code: Option<String>,

    /// Human-readable message
    #[serde(default)]
    pub message: String,

    /// Client event that caused the error
    #[serde(default)]
    pub event_id: Option<String>,
}

/// Server events received from the OpenAI Realtime API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Error occurred
    #[serde(rename = "error")]
    Error {
        /// Error details
        #[serde(default)]
        error: ApiError,
    },

    /// Session created
    #[serde(rename = "session.created")]
    SessionCreated {
        /// Session object
        #[serde(default)]
        session: serde_json::Value,
    },

    /// Session updated
    #[serde(rename = "session.updated")]
    SessionUpdated {
        /// Session object
        #[serde(default)]
        session: serde_json::Value,
    },

    /// Caller started speaking
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted {
        /// Audio start timestamp in ms
        #[serde(default)]
        audio_start_ms: u64,
        /// Item ID
        #[serde(default)]
        item_id: Option<String>,
    },

    /// Caller stopped speaking
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped {
        /// Audio end timestamp in ms
        #[serde(default)]
        audio_end_ms: u64,
        /// Item ID
        #[serde(default)]
        item_id: Option<String>,
    },

    /// Input buffer committed
    #[serde(rename = "input_audio_buffer.committed")]
    InputAudioBufferCommitted {
        /// Item created from the committed audio
        #[serde(default)]
        item_id: Option<String>,
    },

    /// Chunk of synthesized speech
    #[serde(rename = "response.audio.delta")]
    AudioDelta {
        /// Response ID
        #[serde(default)]
        response_id: Option<String>,
        /// Assistant item the audio belongs to
        #[serde(default)]
        item_id: Option<String>,
        /// Base64-encoded PCM16 audio
        delta: String,
    },

    /// Synthesized speech for an item is complete
    #[serde(rename = "response.audio.done")]
    AudioDone {
        /// Response ID
        #[serde(default)]
        response_id: Option<String>,
        /// Assistant item that finished
        item_id: String,
    },

    /// Content part complete
    #[serde(rename = "response.content.done")]
    ResponseContentDone {
        /// Item ID
        #[serde(default)]
        item_id: Option<String>,
    },

    /// Response complete
    #[serde(rename = "response.done")]
    ResponseDone {
        /// Response object
        #[serde(default)]
        response: serde_json::Value,
    },

    /// Assistant item truncated
    #[serde(rename = "conversation.item.truncated")]
    ConversationItemTruncated {
        /// Item ID
        item_id: String,
        /// Offset the item was cut at
        #[serde(default)]
        audio_end_ms: u64,
    },

    /// Rate limits updated
    #[serde(rename = "rate_limits.updated")]
    RateLimitsUpdated {
        /// Current limits
        #[serde(default)]
        rate_limits: serde_json::Value,
    },

    /// Any event type the relay does not act on
    #[serde(other)]
    Other,
}

impl ServerEvent {
    /// Parse a JSON text frame.
    pub fn parse(text: &str) -> RealtimeResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Wire name of this event, `"other"` for the catch-all.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Error { .. } => "error",
            Self::SessionCreated { .. } => "session.created",
            Self::SessionUpdated { .. } => "session.updated",
            Self::SpeechStarted { .. } => "input_audio_buffer.speech_started",
            Self::SpeechStopped { .. } => "input_audio_buffer.speech_stopped",
            Self::InputAudioBufferCommitted { .. } => "input_audio_buffer.committed",
            Self::AudioDelta { .. } => "response.audio.delta",
            Self::AudioDone { .. } => "response.audio.done",
            Self::ResponseContentDone { .. } => "response.content.done",
            Self::ResponseDone { .. } => "response.done",
            Self::ConversationItemTruncated { .. } => "conversation.item.truncated",
            Self::RateLimitsUpdated { .. } => "rate_limits.updated",
            Self::Other => "other",
        }
    }
}
