//! OpenAI Realtime API module.
//!
//! # Supported Models
//!
//! - `gpt-4o-realtime-preview-2024-10-01` - October 2024 version (default)
//! - `gpt-4o-realtime-preview` - rolling preview alias
//! - `gpt-4o-realtime-preview-2024-12-17` - December 2024 version
//! - `gpt-4o-mini-realtime-preview` - Mini model for lower latency
//!
//! # Supported Voices
//!
//! alloy, ash, ballad, coral, echo, sage, shimmer, verse
//!
//! # Audio Format
//!
//! The relay negotiates PCM 16-bit signed little-endian at 24kHz in both
//! directions and does the G.711 conversion itself.

mod client;
mod config;
pub mod messages;

pub use client::OpenAIRealtimeConnector;
pub use config::{
    DEFAULT_TEMPERATURE, Modality, OPENAI_REALTIME_SAMPLE_RATE, OPENAI_REALTIME_URL,
    OpenAIRealtimeAudioFormat, OpenAIRealtimeModel, OpenAIRealtimeVoice, TEMPERATURE_RANGE,
};
pub use messages::{ClientEvent, ConversationItem, ServerEvent, SessionConfig, TurnDetection};
