//! Speech-AI leg.
//!
//! This module owns everything that talks to the hosted realtime speech
//! service: the error type, the [`UpstreamConnector`] seam used by the relay,
//! and the OpenAI Realtime implementation (protocol messages, model and voice
//! enums, session negotiation).
//!
//! # Audio Format
//!
//! PCM 16-bit signed little-endian at 24kHz in both directions.

mod base;
pub mod openai;

pub use base::{
    RealtimeError, RealtimeResult, UpstreamConnector, UpstreamHandle, UpstreamSocket,
};
pub use openai::{
    ClientEvent, DEFAULT_TEMPERATURE, Modality, OPENAI_REALTIME_SAMPLE_RATE, OPENAI_REALTIME_URL,
    OpenAIRealtimeAudioFormat, OpenAIRealtimeConnector, OpenAIRealtimeModel, OpenAIRealtimeVoice,
    ServerEvent, SessionConfig, TEMPERATURE_RANGE, TurnDetection,
};
