//! Application entry point — Resume Architect.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create the tokio runtime.
//! 4. Build the Gemini chat backend and the speech queue (synthesizer +
//!    rodio playback sink).
//! 5. Create the shared state and the command channel.
//! 6. Spawn the chat orchestrator on the tokio runtime.
//! 7. Spawn the hotkey listener thread and its forwarding task.
//! 8. Run [`eframe::run_native`] — blocks the main thread until the window
//!    is closed.

use std::sync::Arc;

use eframe::egui;
use tokio::sync::mpsc;

use resume_architect::{
    app::ResumeArchitectApp,
    config::{AppConfig, GeminiConfig},
    hotkey::{parse_key, HotkeyEvent, HotkeyListener},
    llm::{ChatModel, GeminiChat},
    orchestrator::{new_shared_state, ChatCommand, ChatOrchestrator},
    speech::{AudioSink, GeminiTts, RodioSink, SpeechQueue, SpeechSynthesizer},
};

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let mut vp = egui::ViewportBuilder::default()
        .with_inner_size([960.0, 640.0])
        .with_min_inner_size([480.0, 360.0]);

    if let Some((x, y)) = config.ui.window_position {
        vp = vp.with_position(egui::pos2(x, y));
    }

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> eframe::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Resume Architect starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    if config.gemini.resolve_api_key().is_none() {
        log::warn!(
            "No Gemini API key found — set {} or add api_key to settings.toml. \
             Chat, speech and recording will report errors until a key is provided.",
            GeminiConfig::API_KEY_ENV
        );
    }

    // 3. Tokio runtime (streaming, synthesis and the live session all run here)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    // 4. Gemini services + speech queue
    let chat: Arc<dyn ChatModel> = Arc::new(GeminiChat::from_config(&config.gemini));
    let synth: Arc<dyn SpeechSynthesizer> = Arc::new(GeminiTts::from_config(
        &config.gemini,
        config.speech.playback_sample_rate,
    ));
    let sink: Arc<dyn AudioSink> = Arc::new(RodioSink::new());
    let speech = SpeechQueue::new(synth, sink);

    // 5. Shared state + command channel
    let state = new_shared_state(config.clone());
    let (command_tx, command_rx) = mpsc::channel::<ChatCommand>(16);

    // 6. Orchestrator task
    {
        let orchestrator = ChatOrchestrator::new(
            Arc::clone(&state),
            chat,
            speech.clone(),
            &config.gemini,
        );
        rt.spawn(orchestrator.run(command_rx));
    }

    // 7. Hotkey listener: forward toggle presses to the orchestrator.
    let hotkey_key = parse_key(&config.hotkey.toggle_recording_key).unwrap_or(rdev::Key::F9);
    let (hotkey_tx, mut hotkey_rx) = mpsc::channel::<HotkeyEvent>(16);
    let _hotkey_listener = HotkeyListener::start(hotkey_key, hotkey_tx);
    {
        let command_tx = command_tx.clone();
        rt.spawn(async move {
            while let Some(HotkeyEvent::ToggleRecording) = hotkey_rx.recv().await {
                if command_tx.send(ChatCommand::ToggleRecording).await.is_err() {
                    break;
                }
            }
        });
    }

    // 8. Run the egui app (blocks until the window is closed)
    let app = ResumeArchitectApp::new(
        Arc::clone(&state),
        command_tx,
        speech,
        config.ui.dark_mode,
        config.ui.show_preview,
    );
    let options = native_options(&config);

    eframe::run_native(
        "Resume Architect",
        options,
        Box::new(move |_cc| Ok(Box::new(app))),
    )
}
