//! SSE wire decoding for `streamGenerateContent?alt=sse`.
//!
//! The response body is a server-sent-event stream; each event is a single
//! `data: {json}` line. [`SseLineBuffer`] reassembles complete lines out of
//! arbitrary byte chunks (network chunk boundaries fall anywhere, including
//! inside a multi-byte character), and [`parse_fragment`] extracts the text
//! delta and grounding citations from one event payload.

use serde_json::Value;

use crate::chat::Citation;
use crate::llm::client::{LlmError, StreamFragment};

// ---------------------------------------------------------------------------
// SseLineBuffer
// ---------------------------------------------------------------------------

/// Reassembles `data:` payload lines from raw byte chunks.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk; returns every complete `data:` payload it
    /// finished. Non-data lines (event names, comments, blank separators) are
    /// discarded.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(newline) = self.pending.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=newline).collect();
            line.pop(); // the newline itself
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            let line = String::from_utf8_lossy(&line);
            if let Some(payload) = line.strip_prefix("data:") {
                let payload = payload.trim_start();
                if !payload.is_empty() {
                    payloads.push(payload.to_string());
                }
            }
        }
        payloads
    }
}

// ---------------------------------------------------------------------------
// Fragment parsing
// ---------------------------------------------------------------------------

/// Decode one SSE event payload into a [`StreamFragment`].
///
/// Text is the concatenation of every `candidates[0].content.parts[*].text`;
/// citations come from `groundingMetadata.groundingChunks[*].web`. Chunks
/// without a URI are skipped; a missing title falls back to the URI.
pub fn parse_fragment(payload: &str) -> Result<StreamFragment, LlmError> {
    let root: Value =
        serde_json::from_str(payload).map_err(|e| LlmError::Parse(e.to_string()))?;

    let candidate = root
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first());

    let mut text = String::new();
    if let Some(parts) = candidate
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
    {
        for part in parts {
            if let Some(t) = part.get("text").and_then(|t| t.as_str()) {
                text.push_str(t);
            }
        }
    }

    let mut citations = Vec::new();
    if let Some(chunks) = candidate
        .and_then(|c| c.get("groundingMetadata"))
        .and_then(|m| m.get("groundingChunks"))
        .and_then(|c| c.as_array())
    {
        for chunk in chunks {
            let Some(web) = chunk.get("web") else {
                continue;
            };
            let Some(uri) = web.get("uri").and_then(|u| u.as_str()) else {
                continue;
            };
            let title = web
                .get("title")
                .and_then(|t| t.as_str())
                .unwrap_or(uri)
                .to_string();
            citations.push(Citation {
                title,
                uri: uri.to_string(),
            });
        }
    }

    Ok(StreamFragment {
        text: if text.is_empty() { None } else { Some(text) },
        citations,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
