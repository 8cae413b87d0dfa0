//! Live voice capture over the bidirectional transcription session.
//!
//! This module provides:
//! * [`LiveCaptureSession`] — owns the microphone stream and the websocket
//!   for one recording: open → streaming → closed, at most one alive.
//! * `protocol` — the BidiGenerateContent wire messages (outbound setup and
//!   audio frames, inbound transcript events).
//! * [`LiveError`] — error variants for session setup and streaming.

pub mod protocol;
pub mod session;

pub use protocol::{LiveEvent, MediaChunk, RealtimeInputMessage, SetupMessage};
pub use session::{LiveCaptureSession, LiveError};
