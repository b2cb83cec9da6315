//! Audio transcoding between the telephony leg and the speech-AI leg.
//!
//! # Formats
//!
//! - Telephony leg: G.711 μ-law, 8-bit, 8 kHz, mono
//! - Speech-AI leg: PCM 16-bit signed little-endian, 24 kHz, mono
//!
//! Each direction is a pure composition of a codec step and a resampling
//! step. Nothing is carried between chunks, so the same input always yields
//! the same output.
//!
//! ```rust
//! use callrelay_gateway::core::audio::{inbound_transform, outbound_transform};
//!
//! let ulaw = vec![0xFFu8; 160]; // 20 ms of silence at 8 kHz
//! let pcm24 = inbound_transform(&ulaw);
//! assert_eq!(pcm24.len(), 160 * 3 * 2);
//!
//! let back = outbound_transform(&pcm24).unwrap();
//! assert_eq!(back.len(), ulaw.len());
//! ```

pub mod mulaw;
pub mod resample;

use base64::prelude::*;
use thiserror::Error;

use crate::core::realtime::OPENAI_REALTIME_SAMPLE_RATE;

/// Sample rate of the telephony media stream.
pub const TELEPHONY_SAMPLE_RATE: u32 = 8000;

/// Sample rate of the speech-AI audio leg.
pub const REALTIME_SAMPLE_RATE: u32 = OPENAI_REALTIME_SAMPLE_RATE;

/// Fixed ratio between the two sample rates (24 kHz / 8 kHz).
pub const RESAMPLE_RATIO: usize = 3;

const _: () = assert!(REALTIME_SAMPLE_RATE == TELEPHONY_SAMPLE_RATE * RESAMPLE_RATIO as u32);

/// Errors raised while converting an audio chunk.
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// Linear PCM buffer that is not a whole number of 16-bit samples
    #[error("PCM buffer of {len} bytes is not a whole number of 16-bit samples")]
    PartialSample { len: usize },

    /// Payload was not valid base64
    #[error("Invalid base64 audio payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// Result type for transcoding operations.
pub type TranscodeResult<T> = Result<T, TranscodeError>;

/// Convert μ-law 8 kHz bytes into PCM16 24 kHz bytes.
pub fn inbound_transform(ulaw: &[u8]) -> Vec<u8> {
    let pcm8 = mulaw::decode(ulaw);
    resample::samples_to_bytes(&resample::sample_and_hold(&pcm8))
}

/// Convert PCM16 24 kHz bytes into μ-law 8 kHz bytes.
///
/// A buffer holding a partial trailing sample is rejected outright rather
/// than converted up to the last whole sample.
pub fn outbound_transform(pcm24: &[u8]) -> TranscodeResult<Vec<u8>> {
    let samples = resample::bytes_to_samples(pcm24)?;
    Ok(mulaw::encode(&resample::decimate(&samples)))
}

/// Base64 wrapper around [`inbound_transform`] for JSON-framed payloads.
pub fn inbound_payload(b64_ulaw: &str) -> TranscodeResult<String> {
    let ulaw = BASE64_STANDARD.decode(b64_ulaw)?;
    Ok(BASE64_STANDARD.encode(inbound_transform(&ulaw)))
}

/// Base64 wrapper around [`outbound_transform`] for JSON-framed payloads.
pub fn outbound_payload(b64_pcm24: &str) -> TranscodeResult<String> {
    let pcm24 = BASE64_STANDARD.decode(b64_pcm24)?;
    Ok(BASE64_STANDARD.encode(outbound_transform(&pcm24)?))
}
