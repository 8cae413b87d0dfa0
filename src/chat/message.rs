//! Transcript data model.

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Who produced a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Wire name used in Gemini request bodies.
    pub fn wire_name(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

// ---------------------------------------------------------------------------
// Citation
// ---------------------------------------------------------------------------

/// A search-grounding source reference attached to model output.
///
/// Identity is the `uri`; two citations with the same URI are the same
/// source, and the later one's title wins on merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub title: String,
    pub uri: String,
}

// ---------------------------------------------------------------------------
// ChatMessage
// ---------------------------------------------------------------------------

/// One entry in the visible chat history.
///
/// The history is append-only. Only the most recent model message mutates,
/// and only while its stream is active: `content` grows monotonically and
/// `sources` grows monotonically with URI dedup.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub sources: Vec<Citation>,
}

impl ChatMessage {
    /// A finished user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            sources: Vec::new(),
        }
    }

    /// A finished model message without sources.
    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
            sources: Vec::new(),
        }
    }

    /// An empty model message that a stream will fill in.
    pub fn model_placeholder() -> Self {
        Self::model("")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
