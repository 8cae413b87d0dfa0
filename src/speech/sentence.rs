//! Incremental sentence-boundary detection over streamed text.
//!
//! Text deltas arrive in arbitrary splits — a sentence terminator can land in
//! the middle of a fragment or be the only character of one. The splitter
//! buffers deltas and emits each sentence exactly once, as soon as its
//! terminator (`.`, `?` or `!`) has arrived, regardless of fragment
//! boundaries.

/// Characters that end a sentence.
const TERMINATORS: [char; 3] = ['.', '?', '!'];

// ---------------------------------------------------------------------------
// SentenceSplitter
// ---------------------------------------------------------------------------

/// Per-turn pending-sentence buffer.
///
/// [`push`](Self::push) returns the complete sentences finished by a delta;
/// [`flush`](Self::flush) drains whatever remains when the stream ends.
#[derive(Debug, Default)]
pub struct SentenceSplitter {
    buffer: String,
}

impl SentenceSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text delta and extract every sentence it completed.
    ///
    /// Each extracted sentence includes its terminator and is trimmed;
    /// whitespace-only sentences are dropped.
    pub fn push(&mut self, delta: &str) -> Vec<String> {
        self.buffer.push_str(delta);

        let mut sentences = Vec::new();
        while let Some(idx) = self.buffer.find(TERMINATORS) {
            // Terminators are ASCII, so idx + 1 is a char boundary. A run of
            // terminators ("..." / "?!") belongs to one sentence.
            let mut end = idx + 1;
            while self.buffer[end..].starts_with(TERMINATORS) {
                end += 1;
            }
            let rest = self.buffer.split_off(end);
            let sentence = std::mem::replace(&mut self.buffer, rest);
            let sentence = sentence.trim();
            if is_speakable(sentence) {
                sentences.push(sentence.to_string());
            }
        }
        sentences
    }

    /// Drain the remaining buffer as a final sentence, if non-empty.
    pub fn flush(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        let rest = rest.trim();
        if is_speakable(rest) {
            Some(rest.to_string())
        } else {
            None
        }
    }

    /// Discard any buffered text without emitting it.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// A sentence worth synthesizing contains something besides whitespace and
/// punctuation terminators.
fn is_speakable(sentence: &str) -> bool {
    sentence
        .chars()
        .any(|c| !c.is_whitespace() && !TERMINATORS.contains(&c))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
