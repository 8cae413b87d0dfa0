//! Resume Architect — a voice-enabled, chat-driven resume builder.
//!
//! The application walks the user through a resume section-by-section in a
//! chat conversation with the Gemini API, streams each reply into the visible
//! history, speaks completed sentences aloud while the stream is still
//! running, accepts voice input over a live transcription session, and
//! renders the assembled resume as a live preview with markdown export.
//!
//! # Architecture
//!
//! ```text
//! egui UI (app) ──ChatCommand (mpsc)──▶ ChatOrchestrator  ← async tokio task
//!      ▲                                    │
//!      │ reads each frame                   ├─ section::SectionTracker   (advance / converse)
//!      └── SharedState (Arc<Mutex>) ◀───────┤
//!                                           ├─ llm::GeminiChat           (SSE fragment stream)
//!                                           ├─ chat::ResponseAccumulator (text + citations)
//!                                           ├─ speech::SpeechQueue       (sentence TTS pipeline)
//!                                           └─ live::LiveCaptureSession  (mic → websocket)
//! ```
//!
//! The orchestrator is the sole writer of [`orchestrator::AppState`]; the UI
//! and the hotkey listener only submit intents over the command channel.

pub mod app;
pub mod audio;
pub mod chat;
pub mod config;
pub mod hotkey;
pub mod live;
pub mod llm;
pub mod orchestrator;
pub mod resume;
pub mod section;
pub mod speech;
