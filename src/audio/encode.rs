//! PCM codecs for the Gemini wire formats.
//!
//! Outbound microphone frames are sent as base64 little-endian 16-bit PCM;
//! inbound synthesized speech arrives the same way. These helpers convert
//! between that representation and the `f32` samples used everywhere else.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

/// Convert `f32` samples in `[-1.0, 1.0]` to little-endian 16-bit PCM bytes.
///
/// Out-of-range samples are clamped rather than wrapped.
pub fn f32_to_pcm16_bytes(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert little-endian 16-bit PCM bytes back to `f32` samples.
///
/// A trailing odd byte (malformed payload) is ignored.
pub fn pcm16_bytes_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect()
}

/// Base64-encode a 16 kHz mono frame for the live session.
pub fn encode_live_frame(samples: &[f32]) -> String {
    BASE64.encode(f32_to_pcm16_bytes(samples))
}

/// Decode a base64 PCM payload (synthesized speech) into `f32` samples.
pub fn decode_pcm_payload(data: &str) -> Result<Vec<f32>, base64::DecodeError> {
    Ok(pcm16_bytes_to_f32(&BASE64.decode(data)?))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
