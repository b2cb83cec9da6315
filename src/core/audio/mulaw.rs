//! G.711 μ-law companding.
//!
//! Telephony media streams carry 8-bit μ-law samples. These helpers convert
//! between μ-law bytes and 16-bit signed linear PCM, one sample at a time,
//! using the classic bias-and-segment encoding.

/// Bias added to the magnitude before segment lookup.
const BIAS: i32 = 0x84;

/// Largest magnitude that survives the bias without overflowing 15 bits.
const CLIP: i32 = 32635;

/// Encode one linear PCM sample as a μ-law byte.
#[inline]
pub fn encode_sample(sample: i16) -> u8 {
    let mut magnitude = sample as i32;
    let sign = if magnitude < 0 {
        magnitude = -magnitude;
        0x80
    } else {
        0x00
    };

    magnitude = magnitude.min(CLIP) + BIAS;

    // (magnitude >> 7) is in 1..=255, so the segment is its highest set bit.
    let segment = 7 - ((magnitude >> 7) as u8).leading_zeros() as i32;
    let mantissa = (magnitude >> (segment + 3)) & 0x0F;

    !((sign | (segment << 4) | mantissa) as u8)
}

/// Decode one μ-law byte into a linear PCM sample.
#[inline]
pub fn decode_sample(byte: u8) -> i16 {
    let byte = !byte;
    let segment = ((byte >> 4) & 0x07) as i32;
    let mantissa = (byte & 0x0F) as i32;

    let magnitude = (((mantissa << 3) + BIAS) << segment) - BIAS;
    if byte & 0x80 != 0 {
        -magnitude as i16
    } else {
        magnitude as i16
    }
}

/// Encode a slice of linear PCM samples.
pub fn encode(samples: &[i16]) -> Vec<u8> {
    samples.iter().copied().map(encode_sample).collect()
}

/// Decode a slice of μ-law bytes.
pub fn decode(bytes: &[u8]) -> Vec<i16> {
    bytes.iter().copied().map(decode_sample).collect()
}
