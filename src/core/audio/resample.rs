//! Integer-ratio sample rate conversion.
//!
//! Both directions are deliberately naive: decimation keeps every Nth sample
//! with no anti-alias filter, and interpolation is a zero-order hold that
//! repeats each sample N times. The ratio is a fixed system constant.

use super::{RESAMPLE_RATIO, TranscodeError, TranscodeResult};

/// Interpret little-endian bytes as 16-bit PCM samples.
///
/// Fails if the buffer is not a whole number of samples.
pub fn bytes_to_samples(bytes: &[u8]) -> TranscodeResult<Vec<i16>> {
    if bytes.len() % 2 != 0 {
        return Err(TranscodeError::PartialSample { len: bytes.len() });
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Serialize 16-bit PCM samples as little-endian bytes.
pub fn samples_to_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// Keep every [`RESAMPLE_RATIO`]th sample, starting with the first.
pub fn decimate(samples: &[i16]) -> Vec<i16> {
    samples.iter().step_by(RESAMPLE_RATIO).copied().collect()
}

/// Repeat every sample [`RESAMPLE_RATIO`] times.
pub fn sample_and_hold(samples: &[i16]) -> Vec<i16> {
    let mut out = Vec::with_capacity(samples.len() * RESAMPLE_RATIO);
    for &sample in samples {
        out.extend(std::iter::repeat_n(sample, RESAMPLE_RATIO));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_to_samples_little_endian() {
        let samples = bytes_to_samples(&[0x01, 0x00, 0xFF, 0xFF, 0x00, 0x80]).unwrap();
        assert_eq!(samples, vec![1, -1, i16::MIN]);
    }

    #[test]
    fn test_bytes_to_samples_rejects_partial_sample() {
        match bytes_to_samples(&[0x01, 0x02, 0x03]) {
            Err(TranscodeError::PartialSample { len }) => assert_eq!(len, 3),
            other => panic!("Expected PartialSample error, got {other:?}"),
        }
    }

    #[test]
    fn test_decimate_keeps_every_third_sample() {
        let samples = [10, 11, 12, 20, 21, 22, 30, 31, 32];
        assert_eq!(decimate(&samples), vec![10, 20, 30]);
    }

    #[test]
    fn test_decimate_unaligned_tail_keeps_leading_sample() {
        let samples = [10, 11, 12, 20];
        assert_eq!(decimate(&samples), vec![10, 20]);
    }

    #[test]
    fn test_sample_and_hold_repeats() {
        assert_eq!(sample_and_hold(&[1, -2]), vec![1, 1, 1, -2, -2, -2]);
    }

    #[test]
    fn test_sample_count_is_consistent_both_ways() {
        let samples: Vec<i16> = (0..300).map(|i| (i * 7) as i16).collect();
        assert_eq!(decimate(&sample_and_hold(&samples)).len(), samples.len());
        assert_eq!(sample_and_hold(&decimate(&samples)).len(), samples.len());
        assert_eq!(decimate(&sample_and_hold(&samples)), samples);
    }

    #[test]
    fn test_samples_to_bytes() {
        assert_eq!(samples_to_bytes(&[1, -1]), vec![0x01, 0x00, 0xFF, 0xFF]);
    }
}
