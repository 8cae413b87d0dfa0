//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// GeminiConfig
// ---------------------------------------------------------------------------

/// Settings for the hosted Gemini services (chat, speech synthesis, live
/// transcription).
///
/// The API key is resolved in two steps: the `GEMINI_API_KEY` environment
/// variable always wins, then the value stored in `settings.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key stored in the settings file. `None` means "environment only".
    pub api_key: Option<String>,
    /// Model used for the streamed, search-grounded chat replies.
    pub chat_model: String,
    /// Model used for text-to-speech synthesis.
    pub tts_model: String,
    /// Model used for the bidirectional live transcription session.
    pub live_model: String,
    /// Prebuilt voice name for speech synthesis.
    pub voice: String,
    /// Maximum seconds to wait for a speech-synthesis response.
    ///
    /// The chat generation stream intentionally has no timeout — a hung
    /// stream stalls that turn until the service gives up.
    pub synthesis_timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            chat_model: "gemini-2.5-flash".into(),
            tts_model: "gemini-2.5-flash-preview-tts".into(),
            live_model: "gemini-2.5-flash-native-audio-preview-09-2025".into(),
            voice: "Kore".into(),
            synthesis_timeout_secs: 30,
        }
    }
}

impl GeminiConfig {
    /// Environment variable consulted before the settings file.
    pub const API_KEY_ENV: &'static str = "GEMINI_API_KEY";

    /// Resolve the effective API key: environment first, then config file.
    ///
    /// Returns `None` when neither source provides a non-empty key; the
    /// application still launches, and each request surfaces its own error.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Ok(key) = std::env::var(Self::API_KEY_ENV) {
            if !key.trim().is_empty() {
                return Some(key);
            }
        }
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .map(|k| k.to_string())
    }
}

// ---------------------------------------------------------------------------
// SpeechConfig
// ---------------------------------------------------------------------------

/// Settings for sentence-level speech output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Speak every finalized model sentence automatically.
    pub auto_speak: bool,
    /// Sample rate assumed for synthesized PCM when the service response does
    /// not carry an explicit rate (Hz).
    pub playback_sample_rate: u32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            auto_speak: true,
            playback_sample_rate: 24_000,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for microphone capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate the live transcription service expects (must be 16 000).
    pub sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self { sample_rate: 16_000 }
    }
}

// ---------------------------------------------------------------------------
// HotkeyConfig
// ---------------------------------------------------------------------------

/// Global hotkey bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotkeyConfig {
    /// Key that toggles voice recording on/off (e.g. `"F9"`).
    pub toggle_recording_key: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            toggle_recording_key: "F9".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// Window appearance and behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Last saved window position `(x, y)` in screen pixels.  `None` means
    /// let the OS / window manager pick a position on first launch.
    pub window_position: Option<(f32, f32)>,
    /// Dark colour scheme.
    pub dark_mode: bool,
    /// Show the resume preview panel beside the chat.
    pub show_preview: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_position: None,
            dark_mode: true,
            show_preview: true,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use resume_architect::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Gemini service settings (models, voice, API key).
    pub gemini: GeminiConfig,
    /// Speech output settings.
    pub speech: SpeechConfig,
    /// Microphone capture settings.
    pub audio: AudioConfig,
    /// Global hotkey bindings.
    pub hotkey: HotkeyConfig,
    /// Window settings.
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Verify that a default `AppConfig` can be serialised to TOML and
    /// deserialised back without any data loss.
    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        // GeminiConfig
        assert_eq!(original.gemini.api_key, loaded.gemini.api_key);
        assert_eq!(original.gemini.chat_model, loaded.gemini.chat_model);
        assert_eq!(original.gemini.tts_model, loaded.gemini.tts_model);
        assert_eq!(original.gemini.live_model, loaded.gemini.live_model);
        assert_eq!(original.gemini.voice, loaded.gemini.voice);

        // SpeechConfig
        assert_eq!(original.speech.auto_speak, loaded.speech.auto_speak);
        assert_eq!(
            original.speech.playback_sample_rate,
            loaded.speech.playback_sample_rate
        );

        // AudioConfig
        assert_eq!(original.audio.sample_rate, loaded.audio.sample_rate);

        // HotkeyConfig / UiConfig
        assert_eq!(
            original.hotkey.toggle_recording_key,
            loaded.hotkey.toggle_recording_key
        );
        assert_eq!(original.ui.dark_mode, loaded.ui.dark_mode);
        assert_eq!(original.ui.show_preview, loaded.ui.show_preview);
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        let default = AppConfig::default();

        assert_eq!(config.gemini.chat_model, default.gemini.chat_model);
        assert_eq!(config.speech.auto_speak, default.speech.auto_speak);
        assert_eq!(config.audio.sample_rate, default.audio.sample_rate);
        assert_eq!(
            config.hotkey.toggle_recording_key,
            default.hotkey.toggle_recording_key
        );
    }

    /// Verify default values match the documented service contract.
    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert!(cfg.gemini.api_key.is_none());
        assert_eq!(cfg.gemini.chat_model, "gemini-2.5-flash");
        assert_eq!(cfg.gemini.voice, "Kore");
        assert!(cfg.speech.auto_speak);
        assert_eq!(cfg.speech.playback_sample_rate, 24_000);
        assert_eq!(cfg.audio.sample_rate, 16_000);
        assert_eq!(cfg.hotkey.toggle_recording_key, "F9");
        assert!(cfg.ui.dark_mode);
    }

    /// Verify that modified non-default values survive a round trip.
    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.gemini.api_key = Some("test-key".into());
        cfg.gemini.chat_model = "gemini-2.5-pro".into();
        cfg.gemini.voice = "Puck".into();
        cfg.speech.auto_speak = false;
        cfg.hotkey.toggle_recording_key = "F10".into();
        cfg.ui.window_position = Some((100.0, 200.0));
        cfg.ui.dark_mode = false;

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.gemini.api_key, Some("test-key".into()));
        assert_eq!(loaded.gemini.chat_model, "gemini-2.5-pro");
        assert_eq!(loaded.gemini.voice, "Puck");
        assert!(!loaded.speech.auto_speak);
        assert_eq!(loaded.hotkey.toggle_recording_key, "F10");
        assert_eq!(loaded.ui.window_position, Some((100.0, 200.0)));
        assert!(!loaded.ui.dark_mode);
    }

    /// A key in the settings file is returned when the environment variable
    /// is absent. (The env-wins half is not exercised here because tests run
    /// in parallel and `set_var` is process-global.)
    #[test]
    fn resolve_api_key_falls_back_to_file() {
        let cfg = GeminiConfig {
            api_key: Some("file-key".into()),
            ..GeminiConfig::default()
        };
        if std::env::var(GeminiConfig::API_KEY_ENV).is_err() {
            assert_eq!(cfg.resolve_api_key(), Some("file-key".into()));
        }
    }

    /// Blank keys are treated as absent.
    #[test]
    fn resolve_api_key_ignores_blank() {
        let cfg = GeminiConfig {
            api_key: Some("   ".into()),
            ..GeminiConfig::default()
        };
        if std::env::var(GeminiConfig::API_KEY_ENV).is_err() {
            assert_eq!(cfg.resolve_api_key(), None);
        }
    }
}
