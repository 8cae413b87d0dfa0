//! Audio input pipeline — microphone capture → downmix/resample → PCM encode.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → AudioChunk (mpsc) → stereo_to_mono
//!           → resample_to_16k → f32_to_pcm16_bytes → base64 → live session
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tokio::sync::mpsc;
//! use resume_architect::audio::{AudioCapture, AudioChunk};
//!
//! let (tx, mut rx) = mpsc::unbounded_channel::<AudioChunk>();
//! let capture = AudioCapture::new().unwrap();
//! let _handle = capture.start(tx).unwrap(); // drop handle → stops stream
//! ```

pub mod capture;
pub mod encode;
pub mod resample;

pub use capture::{AudioCapture, AudioChunk, CaptureError, StreamHandle};
pub use encode::{decode_pcm_payload, encode_live_frame, f32_to_pcm16_bytes, pcm16_bytes_to_f32};
pub use resample::{resample_to_16k, stereo_to_mono};
