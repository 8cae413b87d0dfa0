//! Global hotkey listener for the recording toggle, backed by `rdev`.
//!
//! # Design
//!
//! `rdev::listen()` is a blocking OS-level call that never returns while the
//! process is alive.  It must run on a **dedicated OS thread** — it cannot be
//! used inside a tokio task.
//!
//! [`HotkeyListener::start`] spawns that dedicated thread and returns a
//! [`HotkeyListener`] handle.  Dropping the handle sets a stop flag so the
//! callback silently discards further events.  The underlying thread will
//! continue to exist until the process exits (rdev has no graceful shutdown
//! API), but it will consume no meaningful CPU while blocked waiting for
//! keyboard events.
//!
//! # Usage
//!
//! ```no_run
//! use tokio::sync::mpsc;
//! use resume_architect::hotkey::{parse_key, HotkeyEvent, HotkeyListener};
//!
//! let (tx, mut rx) = mpsc::channel(16);
//! let key = parse_key("F9").expect("unknown key");
//! let _listener = HotkeyListener::start(key, tx);
//!
//! // In your async loop:
//! // while let Some(ev) = rx.recv().await { ... }
//! ```

pub mod listener;

pub use listener::HotkeyListener;

// ---------------------------------------------------------------------------
// HotkeyEvent
// ---------------------------------------------------------------------------

/// Events emitted by the hotkey listener thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    /// The recording-toggle key was pressed.
    ToggleRecording,
}

// ---------------------------------------------------------------------------
// parse_key
// ---------------------------------------------------------------------------

/// Map a config key name (e.g. `"F9"`) to an [`rdev::Key`].
///
/// Returns `None` for unrecognised names; the caller falls back to the
/// default binding.
pub fn parse_key(name: &str) -> Option<rdev::Key> {
    match name.trim().to_ascii_uppercase().as_str() {
        "F1" => Some(rdev::Key::F1),
        "F2" => Some(rdev::Key::F2),
        "F3" => Some(rdev::Key::F3),
        "F4" => Some(rdev::Key::F4),
        "F5" => Some(rdev::Key::F5),
        "F6" => Some(rdev::Key::F6),
        "F7" => Some(rdev::Key::F7),
        "F8" => Some(rdev::Key::F8),
        "F9" => Some(rdev::Key::F9),
        "F10" => Some(rdev::Key::F10),
        "F11" => Some(rdev::Key::F11),
        "F12" => Some(rdev::Key::F12),
        _ => None,
    }
}
