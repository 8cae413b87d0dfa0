//! The chat/voice orchestrator — drives every turn from user intent to
//! finalized reply.
//!
//! [`ChatOrchestrator`] owns all mutable conversation state and responds to
//! [`ChatCommand`]s received over a `tokio::sync::mpsc` channel.
//!
//! # Turn flow
//!
//! ```text
//! ChatCommand::SubmitText
//!   ├─ empty / turn in flight        → rejected, no side effect
//!   ├─ advance keyword (not Done)    → capture last reply into ResumeData,
//!   │                                  move forward, append next prompt
//!   └─ otherwise                     → stream model reply:
//!         fragment → accumulator → publish full text + citations
//!                  → sentence splitter → speech queue   (auto-speak)
//!         stream end  → finalize, flush tail sentence
//!         stream fail → fixed fallback reply, status reset
//!
//! ChatCommand::ToggleRecording
//!   ├─ session open  → close it, submit non-empty transcript as a turn
//!   └─ session closed → open microphone + websocket; failure reverts toggle
//! ```
//!
//! The orchestrator is the sole writer of [`SharedState`]; user input is
//! rejected while a turn is in flight, so the history never has concurrent
//! writers.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::chat::{ChatMessage, ResponseAccumulator, Role};
use crate::config::GeminiConfig;
use crate::live::LiveCaptureSession;
use crate::llm::ChatModel;
use crate::section::{SectionTracker, TurnIntent};
use crate::speech::{SentenceSplitter, SpeechQueue};

use super::state::{SharedState, TurnStatus};

// ---------------------------------------------------------------------------
// ChatCommand
// ---------------------------------------------------------------------------

/// Intents sent from the UI (and the hotkey listener) to the orchestrator.
#[derive(Debug, Clone)]
pub enum ChatCommand {
    /// Submit a user message through the normal turn path.
    SubmitText(String),
    /// Start or stop voice recording.
    ToggleRecording,
    /// Enable or disable auto-speak.
    SetAutoSpeak(bool),
    /// Speak one model message on demand (clears the pending speech queue
    /// first).
    PlayMessage(usize),
}

// ---------------------------------------------------------------------------
// ChatOrchestrator
// ---------------------------------------------------------------------------

/// Drives the complete chat/voice loop.
///
/// Create with [`ChatOrchestrator::new`], then call [`run`](Self::run) inside
/// a tokio task.
pub struct ChatOrchestrator {
    state: SharedState,
    model: Arc<dyn ChatModel>,
    speech: SpeechQueue,
    tracker: SectionTracker,
    live: Option<LiveCaptureSession>,
    live_model: String,
    api_key: Option<String>,
    transcript_tx: mpsc::UnboundedSender<String>,
    transcript_rx: Option<mpsc::UnboundedReceiver<String>>,
}

impl ChatOrchestrator {
    /// Create a new orchestrator.
    ///
    /// # Arguments
    ///
    /// * `state`  — shared application state (also read by the UI).
    /// * `model`  — chat backend (e.g. `GeminiChat`).
    /// * `speech` — speech queue (shares its clone with the UI for the
    ///   speaking indicator).
    /// * `gemini` — service config for the live session.
    pub fn new(
        state: SharedState,
        model: Arc<dyn ChatModel>,
        speech: SpeechQueue,
        gemini: &GeminiConfig,
    ) -> Self {
        let (transcript_tx, transcript_rx) = mpsc::unbounded_channel();
        Self {
            state,
            model,
            speech,
            tracker: SectionTracker::new(),
            live: None,
            live_model: gemini.live_model.clone(),
            api_key: gemini.resolve_api_key(),
            transcript_tx,
            transcript_rx: Some(transcript_rx),
        }
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run the orchestrator until `command_rx` is closed.
    ///
    /// This is an `async fn` and should be spawned as a tokio task from
    /// `main()`.
    pub async fn run(mut self, mut command_rx: mpsc::Receiver<ChatCommand>) {
        let mut transcript_rx = self
            .transcript_rx
            .take()
            .expect("run is called exactly once");

        loop {
            tokio::select! {
                cmd = command_rx.recv() => match cmd {
                    Some(ChatCommand::SubmitText(text)) => self.handle_submit(text).await,
                    Some(ChatCommand::ToggleRecording) => {
                        self.handle_toggle_recording(&mut transcript_rx).await;
                    }
                    Some(ChatCommand::SetAutoSpeak(enabled)) => self.handle_set_auto_speak(enabled),
                    Some(ChatCommand::PlayMessage(index)) => self.handle_play_message(index),
                    None => break,
                },
                Some(delta) = transcript_rx.recv() => {
                    let mut st = self.state.lock().unwrap();
                    if st.recording {
                        st.live_transcript.push_str(&delta);
                    }
                }
            }
        }

        if let Some(session) = self.live.take() {
            session.close().await;
        }
        log::info!("orchestrator: command channel closed, shutting down");
    }

    // -----------------------------------------------------------------------
    // Submit
    // -----------------------------------------------------------------------

    /// Handle one user submission: gate, classify, then either advance the
    /// section or stream a model reply.
    async fn handle_submit(&mut self, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            // Malformed/empty submission: rejected before any side effect.
            return;
        }

        {
            let st = self.state.lock().unwrap();
            if st.status.is_busy() {
                log::warn!("submission rejected: a turn is already in flight");
                return;
            }
        }

        // A submission while recording stops the recording; the submitted
        // text is the mirrored transcript, so nothing extra is sent.
        if let Some(session) = self.live.take() {
            session.close().await;
            let mut st = self.state.lock().unwrap();
            st.recording = false;
            st.live_transcript.clear();
        }

        let (prior, last_model_reply, auto_speak) = {
            let mut st = self.state.lock().unwrap();
            let prior = st.chat.clone();
            let last_reply = st
                .chat
                .iter()
                .rev()
                .find(|m| m.role == Role::Model && !m.content.is_empty())
                .map(|m| m.content.clone());
            st.chat.push(ChatMessage::user(text.clone()));
            st.status = TurnStatus::Thinking;
            (prior, last_reply, st.auto_speak)
        };

        match self.tracker.classify(&text, last_model_reply.as_deref()) {
            TurnIntent::Advance { from, to, captured } => {
                let prompt = to.prompt();
                {
                    let mut st = self.state.lock().unwrap();
                    if let Some(content) = captured {
                        st.resume.insert(from, content);
                    }
                    st.section = to;
                    st.chat.push(ChatMessage::model(prompt));
                    st.status = TurnStatus::AwaitingInput;
                }
                if auto_speak {
                    self.speak_text(prompt);
                }
            }
            TurnIntent::Converse => {
                self.stream_turn(prior, text, auto_speak).await;
            }
        }
    }

    /// Stream one model reply into the placeholder message, feeding the
    /// speech queue sentence-by-sentence while the stream runs.
    async fn stream_turn(&mut self, prior: Vec<ChatMessage>, user_text: String, auto_speak: bool) {
        let section = self.tracker.current();

        self.state
            .lock()
            .unwrap()
            .chat
            .push(ChatMessage::model_placeholder());

        let mut acc = ResponseAccumulator::new();
        let mut splitter = SentenceSplitter::new();

        let mut rx = match self.model.stream_reply(&prior, &user_text, section).await {
            Ok(rx) => rx,
            Err(e) => {
                log::warn!("chat stream failed to start: {e}");
                acc.fail();
                self.publish(&acc);
                self.state.lock().unwrap().status = TurnStatus::AwaitingInput;
                return;
            }
        };

        while let Some(item) = rx.recv().await {
            match item {
                Ok(fragment) => {
                    if auto_speak {
                        if let Some(delta) = &fragment.text {
                            for sentence in splitter.push(delta) {
                                self.speech.enqueue(sentence);
                            }
                        }
                    }
                    acc.apply(&fragment);
                    self.publish(&acc);
                }
                Err(e) => {
                    log::warn!("chat stream failed: {e}");
                    splitter.clear();
                    acc.fail();
                    self.publish(&acc);
                    break;
                }
            }
        }

        if !acc.is_finalized() {
            // Normal exhaustion: finalize and flush the last sentence.
            acc.finalize();
            if auto_speak {
                if let Some(rest) = splitter.flush() {
                    self.speech.enqueue(rest);
                }
            }
        }

        self.state.lock().unwrap().status = TurnStatus::AwaitingInput;
    }

    /// Write the accumulated text and citations into the streaming message.
    fn publish(&self, acc: &ResponseAccumulator) {
        let mut st = self.state.lock().unwrap();
        if let Some(last) = st.chat.last_mut() {
            if last.role == Role::Model {
                last.content = acc.text().to_string();
                last.sources = acc.citations().to_vec();
            }
        }
    }

    // -----------------------------------------------------------------------
    // Recording
    // -----------------------------------------------------------------------

    /// Toggle the live capture session on or off.
    async fn handle_toggle_recording(
        &mut self,
        transcript_rx: &mut mpsc::UnboundedReceiver<String>,
    ) {
        if let Some(session) = self.live.take() {
            session.close().await;

            let transcript = {
                let mut st = self.state.lock().unwrap();
                // Catch deltas that were still queued when the toggle arrived.
                while let Ok(delta) = transcript_rx.try_recv() {
                    st.live_transcript.push_str(&delta);
                }
                st.recording = false;
                std::mem::take(&mut st.live_transcript)
            };

            if !transcript.trim().is_empty() {
                self.handle_submit(transcript).await;
            }
            return;
        }

        {
            let st = self.state.lock().unwrap();
            if st.status.is_busy() {
                log::warn!("recording rejected: a turn is in flight");
                return;
            }
        }

        let Some(api_key) = self.api_key.clone() else {
            log::warn!("recording unavailable: no API key configured");
            return;
        };

        {
            let mut st = self.state.lock().unwrap();
            st.live_transcript.clear();
            st.recording = true;
        }

        match LiveCaptureSession::open(&self.live_model, &api_key, self.transcript_tx.clone())
            .await
        {
            Ok(session) => self.live = Some(session),
            Err(e) => {
                // Microphone denied or session failed: revert the toggle.
                log::warn!("failed to start recording: {e}");
                self.state.lock().unwrap().recording = false;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Speech
    // -----------------------------------------------------------------------

    fn handle_set_auto_speak(&mut self, enabled: bool) {
        self.state.lock().unwrap().auto_speak = enabled;
    }

    /// Speak one model message on demand. Manual playback clears whatever is
    /// still queued first.
    fn handle_play_message(&mut self, index: usize) {
        let content = {
            let st = self.state.lock().unwrap();
            st.chat
                .get(index)
                .filter(|m| m.role == Role::Model && !m.content.is_empty())
                .map(|m| m.content.clone())
        };
        let Some(content) = content else {
            return;
        };

        self.speech.clear_pending();
        self.speak_text(&content);
    }

    /// Split `text` into sentences and enqueue them all.
    fn speak_text(&self, text: &str) {
        let mut splitter = SentenceSplitter::new();
        for sentence in splitter.push(text) {
            self.speech.enqueue(sentence);
        }
        if let Some(rest) = splitter.flush() {
            self.speech.enqueue(rest);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::chat::{Citation, FALLBACK_REPLY};
    use crate::config::AppConfig;
    use crate::llm::{FragmentReceiver, LlmError, StreamFragment};
    use crate::orchestrator::state::new_shared_state;
    use crate::section::Section;
    use crate::speech::playback::{AudioSink, PlaybackError};
    use crate::speech::synth::{SpeechSynthesizer, SynthError};
    use crate::speech::AudioSegment;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Replays a scripted fragment sequence and counts invocations.
    struct ScriptedModel {
        script: Vec<Result<StreamFragment, &'static str>>,
        calls: AtomicUsize,
    }

    impl ScriptedModel {
        fn new(script: Vec<Result<StreamFragment, &'static str>>) -> Self {
            Self {
                script,
                calls: AtomicUsize::new(0),
            }
        }

        fn text(deltas: &[&str]) -> Self {
            Self::new(
                deltas
                    .iter()
                    .map(|d| {
                        Ok(StreamFragment {
                            text: Some(d.to_string()),
                            citations: Vec::new(),
                        })
                    })
                    .collect(),
            )
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn stream_reply(
            &self,
            _history: &[ChatMessage],
            _user_text: &str,
            _section: Section,
        ) -> Result<FragmentReceiver, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = mpsc::channel(8);
            let script: Vec<_> = self
                .script
                .iter()
                .map(|item| match item {
                    Ok(frag) => Ok(frag.clone()),
                    Err(msg) => Err(LlmError::Request(msg.to_string())),
                })
                .collect();
            tokio::spawn(async move {
                for item in script {
                    if tx.send(item).await.is_err() {
                        return;
                    }
                }
            });
            Ok(rx)
        }
    }

    /// Fails before any fragment is produced.
    struct BrokenModel;

    #[async_trait]
    impl ChatModel for BrokenModel {
        async fn stream_reply(
            &self,
            _history: &[ChatMessage],
            _user_text: &str,
            _section: Section,
        ) -> Result<FragmentReceiver, LlmError> {
            Err(LlmError::Request("connection refused".into()))
        }
    }

    /// Instant synthesizer that encodes the sentence into the segment.
    struct InstantSynth;

    #[async_trait]
    impl SpeechSynthesizer for InstantSynth {
        async fn synthesize(&self, text: &str) -> Result<AudioSegment, SynthError> {
            Ok(AudioSegment {
                samples: text.chars().map(|c| c as u32 as f32).collect(),
                sample_rate: 24_000,
            })
        }
    }

    struct RecordingSink {
        played: Arc<Mutex<Vec<String>>>,
    }

    impl AudioSink for RecordingSink {
        fn play(&self, segment: AudioSegment) -> Result<(), PlaybackError> {
            let sentence: String = segment
                .samples
                .iter()
                .filter_map(|&s| char::from_u32(s as u32))
                .collect();
            self.played.lock().unwrap().push(sentence);
            Ok(())
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    struct Harness {
        state: crate::orchestrator::SharedState,
        speech: SpeechQueue,
        played: Arc<Mutex<Vec<String>>>,
        command_tx: mpsc::Sender<ChatCommand>,
        run: tokio::task::JoinHandle<()>,
    }

    fn start(model: Arc<dyn ChatModel>, auto_speak: bool) -> Harness {
        let mut config = AppConfig::default();
        config.speech.auto_speak = auto_speak;
        // Keep the live session path inert in tests.
        config.gemini.api_key = None;

        let state = new_shared_state(config.clone());
        let played = Arc::new(Mutex::new(Vec::new()));
        let speech = SpeechQueue::new(
            Arc::new(InstantSynth),
            Arc::new(RecordingSink {
                played: Arc::clone(&played),
            }),
        );

        let orchestrator = ChatOrchestrator::new(
            Arc::clone(&state),
            model,
            speech.clone(),
            &config.gemini,
        );
        let (command_tx, command_rx) = mpsc::channel(16);
        let run = tokio::spawn(orchestrator.run(command_rx));

        Harness {
            state,
            speech,
            played,
            command_tx,
            run,
        }
    }

    impl Harness {
        async fn finish(self) -> crate::orchestrator::SharedState {
            drop(self.command_tx);
            self.run.await.unwrap();
            self.state
        }

        /// Wait until at least `n` sentences have been played, then until
        /// the queue drains completely.
        async fn wait_for_played(&self, n: usize) {
            for _ in 0..400 {
                if self.played.lock().unwrap().len() >= n && !self.speech.is_busy() {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            panic!("expected {n} played sentences");
        }
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    /// A conversational turn appends the user message and a model reply whose
    /// content is the concatenation of every delta.
    #[tokio::test]
    async fn conversational_turn_accumulates_reply() {
        let harness = start(
            Arc::new(ScriptedModel::text(&["My na", "me is ", "Aria."])),
            false,
        );

        harness
            .command_tx
            .send(ChatCommand::SubmitText("hello there".into()))
            .await
            .unwrap();

        let state = harness.finish().await;
        let st = state.lock().unwrap();
        assert_eq!(st.chat.len(), 3); // intro + user + reply
        assert_eq!(st.chat[1].role, Role::User);
        assert_eq!(st.chat[2].content, "My name is Aria.");
        assert_eq!(st.status, TurnStatus::AwaitingInput);
    }

    /// Citations stream into the visible message, deduplicated by URI.
    #[tokio::test]
    async fn citations_are_published_with_the_reply() {
        let citation = |title: &str, uri: &str| Citation {
            title: title.into(),
            uri: uri.into(),
        };
        let model = ScriptedModel::new(vec![
            Ok(StreamFragment {
                text: Some("Grounded.".into()),
                citations: vec![citation("A", "https://a")],
            }),
            Ok(StreamFragment {
                text: None,
                citations: vec![citation("A+", "https://a"), citation("B", "https://b")],
            }),
        ]);
        let harness = start(Arc::new(model), false);

        harness
            .command_tx
            .send(ChatCommand::SubmitText("tell me".into()))
            .await
            .unwrap();

        let state = harness.finish().await;
        let st = state.lock().unwrap();
        let sources = &st.chat[2].sources;
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].uri, "https://a");
        assert_eq!(sources[0].title, "A+");
    }

    /// An advance keyword stores the prior reply and emits the next section
    /// prompt without calling the model.
    #[tokio::test]
    async fn advance_turn_captures_and_moves_forward() {
        let model = Arc::new(ScriptedModel::text(&["Jane Doe\njane@example.com"]));
        let harness = start(Arc::clone(&model) as Arc<dyn ChatModel>, false);

        // Introduction → Contact (no capture).
        harness
            .command_tx
            .send(ChatCommand::SubmitText("skip".into()))
            .await
            .unwrap();
        // Conversational turn produces the contact draft.
        harness
            .command_tx
            .send(ChatCommand::SubmitText("I'm Jane".into()))
            .await
            .unwrap();
        // Approve: Contact → Summary, draft captured.
        harness
            .command_tx
            .send(ChatCommand::SubmitText("ok".into()))
            .await
            .unwrap();

        let state = harness.finish().await;
        let st = state.lock().unwrap();

        assert_eq!(st.section, Section::Summary);
        assert_eq!(
            st.resume.get(Section::Contact),
            Some("Jane Doe\njane@example.com")
        );
        assert_eq!(
            st.chat.last().unwrap().content,
            Section::Summary.prompt()
        );
        // Only the conversational turn hit the model.
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    /// Empty and whitespace-only submissions have no side effects.
    #[tokio::test]
    async fn empty_submission_is_rejected() {
        let harness = start(Arc::new(ScriptedModel::text(&["unused"])), false);

        harness
            .command_tx
            .send(ChatCommand::SubmitText("   ".into()))
            .await
            .unwrap();

        let state = harness.finish().await;
        let st = state.lock().unwrap();
        assert_eq!(st.chat.len(), 1); // only the seeded introduction
    }

    /// A submission that arrives while a turn is marked in flight is dropped.
    #[tokio::test]
    async fn submission_rejected_while_thinking() {
        let harness = start(Arc::new(ScriptedModel::text(&["unused"])), false);

        harness.state.lock().unwrap().status = TurnStatus::Thinking;
        harness
            .command_tx
            .send(ChatCommand::SubmitText("hello".into()))
            .await
            .unwrap();

        let state = harness.finish().await;
        let st = state.lock().unwrap();
        assert_eq!(st.chat.len(), 1);
    }

    /// A failed stream produces the fixed fallback reply and resets status.
    #[tokio::test]
    async fn stream_failure_yields_fallback_reply() {
        let harness = start(Arc::new(BrokenModel), false);

        harness
            .command_tx
            .send(ChatCommand::SubmitText("hello".into()))
            .await
            .unwrap();

        let state = harness.finish().await;
        let st = state.lock().unwrap();
        assert_eq!(st.chat.last().unwrap().content, FALLBACK_REPLY);
        assert_eq!(st.status, TurnStatus::AwaitingInput);
    }

    /// Mid-stream failure discards the partial text in favor of the fallback.
    #[tokio::test]
    async fn mid_stream_failure_discards_partial_text() {
        let model = ScriptedModel::new(vec![
            Ok(StreamFragment {
                text: Some("half an answ".into()),
                citations: Vec::new(),
            }),
            Err("transport reset"),
        ]);
        let harness = start(Arc::new(model), false);

        harness
            .command_tx
            .send(ChatCommand::SubmitText("hello".into()))
            .await
            .unwrap();

        let state = harness.finish().await;
        let st = state.lock().unwrap();
        assert_eq!(st.chat.last().unwrap().content, FALLBACK_REPLY);
    }

    /// With auto-speak on, streamed sentences are spoken in order, including
    /// the flushed tail.
    #[tokio::test]
    async fn auto_speak_speaks_each_sentence_in_order() {
        let harness = start(
            Arc::new(ScriptedModel::text(&["Hello world. How are y", "ou? Great"])),
            true,
        );

        harness
            .command_tx
            .send(ChatCommand::SubmitText("hi".into()))
            .await
            .unwrap();

        harness.wait_for_played(3).await;
        let played = harness.played.lock().unwrap().clone();
        assert_eq!(played, vec!["Hello world.", "How are you?", "Great"]);

        harness.finish().await;
    }

    /// Manual playback speaks the requested message.
    #[tokio::test]
    async fn play_message_speaks_on_demand() {
        let harness = start(Arc::new(ScriptedModel::text(&["unused"])), false);

        // Message 0 is the seeded introduction prompt.
        harness
            .command_tx
            .send(ChatCommand::PlayMessage(0))
            .await
            .unwrap();

        harness.wait_for_played(1).await;
        assert!(!harness.played.lock().unwrap().is_empty());

        harness.finish().await;
    }

    /// PlayMessage on a user message or bad index is a no-op.
    #[tokio::test]
    async fn play_message_ignores_non_model_targets() {
        let harness = start(Arc::new(ScriptedModel::text(&["Reply."])), false);

        harness
            .command_tx
            .send(ChatCommand::SubmitText("hello".into()))
            .await
            .unwrap();
        // Index 1 is the user message; index 99 does not exist.
        harness
            .command_tx
            .send(ChatCommand::PlayMessage(1))
            .await
            .unwrap();
        harness
            .command_tx
            .send(ChatCommand::PlayMessage(99))
            .await
            .unwrap();

        let played = Arc::clone(&harness.played);
        harness.finish().await;
        assert!(played.lock().unwrap().is_empty());
    }

    /// Auto-speak toggling is reflected in shared state.
    #[tokio::test]
    async fn set_auto_speak_updates_state() {
        let harness = start(Arc::new(ScriptedModel::text(&["unused"])), false);

        harness
            .command_tx
            .send(ChatCommand::SetAutoSpeak(true))
            .await
            .unwrap();

        let state = harness.finish().await;
        assert!(state.lock().unwrap().auto_speak);
    }

    /// Toggling recording without an API key reverts immediately and never
    /// flips the recording flag on.
    #[tokio::test]
    async fn toggle_recording_without_key_stays_off() {
        if std::env::var(crate::config::GeminiConfig::API_KEY_ENV).is_ok() {
            return; // environment provides a key; this path needs none
        }
        let harness = start(Arc::new(ScriptedModel::text(&["unused"])), false);

        harness
            .command_tx
            .send(ChatCommand::ToggleRecording)
            .await
            .unwrap();

        let state = harness.finish().await;
        assert!(!state.lock().unwrap().recording);
    }
}
