//! Turn status and shared application state.
//!
//! [`AppState`] is the single source of truth for everything the UI needs:
//! the chat history, the assembled resume, the active section, the recording
//! flag and live transcript, and the turn status.
//!
//! [`SharedState`] is a type alias for `Arc<Mutex<AppState>>` — cheap to
//! clone and safe to share across threads. The orchestrator task is the sole
//! writer; the egui update loop reads it each frame.

use std::sync::{Arc, Mutex};

use crate::chat::ChatMessage;
use crate::config::AppConfig;
use crate::resume::ResumeData;
use crate::section::Section;

// ---------------------------------------------------------------------------
// TurnStatus
// ---------------------------------------------------------------------------

/// Whether a turn is currently in flight.
///
/// ```text
/// AwaitingInput ──user submits──▶ Thinking
/// Thinking ──stream ends or fails──▶ AwaitingInput
/// ```
///
/// While `Thinking`, new submissions and new recordings are rejected — the
/// turn-handling routine is the only writer of the history, and the gate is
/// what guarantees it has no concurrent self.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnStatus {
    /// Ready for the next user submission.
    #[default]
    AwaitingInput,
    /// A model stream is being consumed.
    Thinking,
}

impl TurnStatus {
    /// Returns `true` while a turn is in flight.
    ///
    /// The UI uses this to disable the input field, send button and mic.
    pub fn is_busy(&self) -> bool {
        matches!(self, TurnStatus::Thinking)
    }

    /// A short human-readable label for the status row.
    pub fn label(&self) -> &'static str {
        match self {
            TurnStatus::AwaitingInput => "Ready",
            TurnStatus::Thinking => "Thinking",
        }
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Shared application state — the single source of truth for the UI.
pub struct AppState {
    /// Current turn status.
    pub status: TurnStatus,

    /// Append-only chat history. Seeded with the Introduction prompt; only
    /// the newest model message mutates, and only while its stream runs.
    pub chat: Vec<ChatMessage>,

    /// Finalized resume content per section.
    pub resume: ResumeData,

    /// The section the conversation is currently on (mirrors the tracker).
    pub section: Section,

    /// Whether finalized model sentences are spoken automatically.
    pub auto_speak: bool,

    /// Whether a live capture session is open.
    pub recording: bool,

    /// Running transcript of the current recording, mirrored into the input
    /// field in real time.
    pub live_transcript: String,

    /// Application configuration (read-only after startup).
    pub config: AppConfig,
}

impl AppState {
    /// Create a new `AppState` with the chat seeded by the Introduction
    /// prompt.
    pub fn new(config: AppConfig) -> Self {
        let auto_speak = config.speech.auto_speak;
        Self {
            status: TurnStatus::AwaitingInput,
            chat: vec![ChatMessage::model(Section::Introduction.prompt())],
            resume: ResumeData::new(),
            section: Section::Introduction,
            auto_speak,
            recording: false,
            live_transcript: String::new(),
            config,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// SharedState
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`AppState`].
///
/// Cheap to clone (`Arc` clone).  Lock with `.lock().unwrap()` for a short
/// critical section; do **not** hold the lock across `.await` points.
pub type SharedState = Arc<Mutex<AppState>>;

/// Construct a new [`SharedState`] wrapping a fresh [`AppState`].
pub fn new_shared_state(config: AppConfig) -> SharedState {
    Arc::new(Mutex::new(AppState::new(config)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
