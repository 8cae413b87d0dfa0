//! Top-level chat/voice orchestration.
//!
//! This module wires user intents to the section flow, the model stream, the
//! speech queue and the live capture session, and exposes the shared state
//! the UI reads every frame.
//!
//! # Architecture
//!
//! ```text
//! ChatCommand (mpsc)                live transcript deltas (mpsc)
//!        │                                     │
//!        ▼                                     ▼
//! ChatOrchestrator::run()  ← async tokio task, sole writer of SharedState
//!        │
//!        ├─ SubmitText      → SectionTracker → advance | stream reply
//!        ├─ ToggleRecording → LiveCaptureSession open/close
//!        ├─ SetAutoSpeak    → flag in SharedState
//!        └─ PlayMessage     → SpeechQueue (clear pending, then speak)
//!
//! SharedState (Arc<Mutex<AppState>>) ←─── read by egui update() each frame
//! ```

pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{ChatCommand, ChatOrchestrator};
pub use state::{new_shared_state, AppState, SharedState, TurnStatus};
