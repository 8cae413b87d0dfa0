//! Streamed-response accumulator.
//!
//! Consumes the fragments yielded by a model stream and maintains the full
//! message-so-far: the concatenation of every text delta in delivery order
//! plus the URI-deduplicated citation list. Observers always receive the
//! complete accumulated state, never a bare delta.
//!
//! Citation merge policy: first-seen insertion order, the latest fragment's
//! title overwriting the stored entry for the same URI. Citations with an
//! empty URI are dropped.

use crate::chat::message::Citation;
use crate::llm::StreamFragment;

/// Fixed reply shown when the model stream fails.
///
/// The partial text accumulated before the failure is discarded — a clear
/// error beats a truncated, possibly misleading partial answer.
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error. Please try again.";

// ---------------------------------------------------------------------------
// ResponseAccumulator
// ---------------------------------------------------------------------------

/// Builds one model message out of an incremental fragment sequence.
///
/// Lifecycle: [`apply`](Self::apply) per fragment, then exactly one of
/// [`finalize`](Self::finalize) (stream exhausted) or [`fail`](Self::fail)
/// (stream error). After either, the accumulator rejects further fragments.
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    full_text: String,
    citations: Vec<Citation>,
    finalized: bool,
}

impl ResponseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one fragment into the accumulated message.
    ///
    /// Fragments arriving after finalization are ignored (the stream task may
    /// still be flushing when a failure already finalized the message).
    pub fn apply(&mut self, fragment: &StreamFragment) {
        if self.finalized {
            return;
        }
        if let Some(delta) = &fragment.text {
            self.full_text.push_str(delta);
        }
        for citation in &fragment.citations {
            self.merge_citation(citation);
        }
    }

    /// Insert-or-overwrite by URI, preserving first-seen ordering.
    fn merge_citation(&mut self, citation: &Citation) {
        if citation.uri.is_empty() {
            return;
        }
        match self.citations.iter_mut().find(|c| c.uri == citation.uri) {
            Some(existing) => existing.title = citation.title.clone(),
            None => self.citations.push(citation.clone()),
        }
    }

    /// Mark the stream as exhausted; the message stops mutating.
    pub fn finalize(&mut self) {
        self.finalized = true;
    }

    /// Replace the accumulated message with [`FALLBACK_REPLY`] and finalize.
    pub fn fail(&mut self) {
        self.full_text.clear();
        self.full_text.push_str(FALLBACK_REPLY);
        self.citations.clear();
        self.finalized = true;
    }

    /// The complete message-so-far.
    pub fn text(&self) -> &str {
        &self.full_text
    }

    /// The deduplicated citation list in first-seen order.
    pub fn citations(&self) -> &[Citation] {
        &self.citations
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
