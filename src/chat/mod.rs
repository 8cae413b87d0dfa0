//! Chat data model and streamed-response accumulation.
//!
//! This module provides:
//! * [`ChatMessage`] / [`Role`] / [`Citation`] — the append-only transcript
//!   data model.
//! * [`ResponseAccumulator`] — merges the model's incremental fragments into
//!   one continuously updated message, deduplicating citations by URI.
//! * [`FALLBACK_REPLY`] — the fixed message shown when a stream fails.

pub mod accumulator;
pub mod message;

pub use accumulator::{ResponseAccumulator, FALLBACK_REPLY};
pub use message::{ChatMessage, Citation, Role};
