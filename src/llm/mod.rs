//! Generative chat client for the Gemini API.
//!
//! This module provides:
//! * [`ChatModel`] — async trait implemented by all chat backends.
//! * [`GeminiChat`] — the hosted Gemini backend: streamed, search-grounded
//!   replies over SSE (`streamGenerateContent?alt=sse`).
//! * [`StreamFragment`] — one incremental piece of a reply (optional text
//!   delta + batch of grounding citations).
//! * [`SseLineBuffer`] / [`parse_fragment`] — the SSE wire decoding layer.
//! * [`LlmError`] — error variants for chat operations.
//!
//! The stream is delivered over a `tokio::sync::mpsc` channel so consumers
//! (the orchestrator) iterate fragments with plain `recv().await`, and mock
//! backends in tests are just pre-loaded channels.

pub mod client;
pub mod prompt;
pub mod sse;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{ChatModel, FragmentReceiver, GeminiChat, LlmError, StreamFragment};
pub use prompt::{build_stream_request, SYSTEM_INSTRUCTION};
pub use sse::{parse_fragment, SseLineBuffer};
