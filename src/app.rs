//! Resume Architect — egui/eframe application.
//!
//! # Architecture
//!
//! [`ResumeArchitectApp`] is the top-level [`eframe::App`]. It owns only UI
//! state (the input field, theme and panel toggles); everything else lives in
//! the orchestrator's [`SharedState`], which the update loop reads each frame
//! and never writes. User actions become [`ChatCommand`]s on `command_tx`.
//!
//! # Layout
//!
//! | Region | Content |
//! |--------|---------|
//! | Top panel | Title, active section, auto-speak / theme / preview toggles |
//! | Right panel | Live resume preview + export buttons |
//! | Bottom panel | Mic toggle, input field, send button |
//! | Central panel | Chat history with citations, per-message play, status row |

use std::time::{Duration, Instant};

use eframe::egui;
use tokio::sync::mpsc;

use crate::chat::{ChatMessage, Role};
use crate::orchestrator::{ChatCommand, SharedState, TurnStatus};
use crate::resume::{self, ResumeData};
use crate::section::Section;
use crate::speech::SpeechQueue;

/// How long the export confirmation note stays visible.
const NOTE_DURATION: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// Frame snapshot
// ---------------------------------------------------------------------------

/// Per-frame copy of the shared state, taken under one short lock.
struct Snapshot {
    status: TurnStatus,
    chat: Vec<ChatMessage>,
    resume: ResumeData,
    section: Section,
    auto_speak: bool,
    recording: bool,
    live_transcript: String,
}

// ---------------------------------------------------------------------------
// ResumeArchitectApp
// ---------------------------------------------------------------------------

/// eframe application — chat on the left, live resume preview on the right.
pub struct ResumeArchitectApp {
    /// Orchestrator-owned state, read each frame.
    state: SharedState,
    /// Send user intents to the orchestrator.
    command_tx: mpsc::Sender<ChatCommand>,
    /// Shared speech queue handle, polled for the speaking indicator.
    speech: SpeechQueue,

    // ── UI state ─────────────────────────────────────────────────────────
    /// Contents of the input field.
    input: String,
    /// Dark colour scheme toggle.
    dark_mode: bool,
    /// Whether the preview panel is shown.
    show_preview: bool,
    /// Recording flag seen last frame, to detect the stop edge.
    was_recording: bool,
    /// Transient note after an export action.
    export_note: Option<(String, Instant)>,
}

impl ResumeArchitectApp {
    pub fn new(
        state: SharedState,
        command_tx: mpsc::Sender<ChatCommand>,
        speech: SpeechQueue,
        dark_mode: bool,
        show_preview: bool,
    ) -> Self {
        Self {
            state,
            command_tx,
            speech,
            input: String::new(),
            dark_mode,
            show_preview,
            was_recording: false,
            export_note: None,
        }
    }

    /// Copy the fields the frame needs under one short lock.
    fn snapshot(&self) -> Snapshot {
        let st = self.state.lock().unwrap();
        Snapshot {
            status: st.status,
            chat: st.chat.clone(),
            resume: st.resume.clone(),
            section: st.section,
            auto_speak: st.auto_speak,
            recording: st.recording,
            live_transcript: st.live_transcript.clone(),
        }
    }

    fn send(&self, command: ChatCommand) {
        if self.command_tx.try_send(command).is_err() {
            log::warn!("ui: orchestrator command channel is full or closed");
        }
    }

    fn submit_input(&mut self) {
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return;
        }
        self.send(ChatCommand::SubmitText(text));
        self.input.clear();
    }

    // ── Panels ────────────────────────────────────────────────────────────

    fn draw_top_bar(&mut self, ui: &mut egui::Ui, snap: &Snapshot) {
        ui.horizontal(|ui| {
            ui.heading("AI Resume Architect");
            ui.label(
                egui::RichText::new(format!("— {}", snap.section.title()))
                    .color(ui.visuals().weak_text_color()),
            );

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let preview_label = if self.show_preview { "Chat only" } else { "Preview" };
                if ui.button(preview_label).clicked() {
                    self.show_preview = !self.show_preview;
                }

                let theme_label = if self.dark_mode { "Light" } else { "Dark" };
                if ui.button(theme_label).clicked() {
                    self.dark_mode = !self.dark_mode;
                }

                let speak_label = if snap.auto_speak {
                    "Auto-speak: on"
                } else {
                    "Auto-speak: off"
                };
                if ui.button(speak_label).clicked() {
                    self.send(ChatCommand::SetAutoSpeak(!snap.auto_speak));
                }
            });
        });
    }

    fn draw_chat(&mut self, ui: &mut egui::Ui, snap: &Snapshot) {
        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for (index, message) in snap.chat.iter().enumerate() {
                    self.draw_bubble(ui, index, message);
                }

                if snap.status.is_busy() {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Thinking...");
                    });
                } else if self.speech.is_busy() {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Speaking...");
                    });
                }
            });
    }

    fn draw_bubble(&self, ui: &mut egui::Ui, index: usize, message: &ChatMessage) {
        let is_user = message.role == Role::User;
        let layout = if is_user {
            egui::Layout::right_to_left(egui::Align::Min)
        } else {
            egui::Layout::left_to_right(egui::Align::Min)
        };

        ui.add_space(4.0);
        ui.with_layout(layout, |ui| {
            let fill = if is_user {
                if self.dark_mode {
                    egui::Color32::from_rgb(30, 60, 110)
                } else {
                    egui::Color32::from_rgb(205, 225, 250)
                }
            } else if self.dark_mode {
                egui::Color32::from_rgb(55, 58, 64)
            } else {
                egui::Color32::from_rgb(228, 228, 232)
            };

            egui::Frame::new()
                .fill(fill)
                .corner_radius(egui::CornerRadius::same(6))
                .inner_margin(egui::Margin::same(8))
                .show(ui, |ui| {
                    ui.set_max_width(ui.available_width() * 0.8);
                    ui.vertical(|ui| {
                        ui.label(message.content.as_str());

                        if !message.sources.is_empty() {
                            ui.separator();
                            ui.label(
                                egui::RichText::new("Sources:")
                                    .small()
                                    .color(ui.visuals().weak_text_color()),
                            );
                            for source in &message.sources {
                                let title = if source.title.is_empty() {
                                    source.uri.as_str()
                                } else {
                                    source.title.as_str()
                                };
                                ui.hyperlink_to(egui::RichText::new(title).small(), &source.uri);
                            }
                        }

                        if !is_user && !message.content.is_empty() {
                            if ui
                                .add(egui::Button::new(egui::RichText::new("Play").small()).frame(false))
                                .clicked()
                            {
                                self.send(ChatCommand::PlayMessage(index));
                            }
                        }
                    });
                });
        });
    }

    fn draw_input_row(&mut self, ui: &mut egui::Ui, snap: &Snapshot) {
        let busy = snap.status.is_busy();

        ui.horizontal(|ui| {
            let mic_label = if snap.recording { "Stop" } else { "Mic" };
            let mic_button = egui::Button::new(if snap.recording {
                egui::RichText::new(mic_label).color(egui::Color32::from_rgb(255, 80, 80))
            } else {
                egui::RichText::new(mic_label)
            });
            if ui.add_enabled(!busy, mic_button).clicked() {
                self.send(ChatCommand::ToggleRecording);
            }

            let send_clicked = ui
                .with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let send = ui.add_enabled(
                        !busy && !self.input.trim().is_empty(),
                        egui::Button::new("Send"),
                    );

                    let editor = egui::TextEdit::multiline(&mut self.input)
                        .desired_rows(2)
                        .hint_text("Type or press the mic to talk...")
                        .desired_width(ui.available_width());
                    let response = ui.add_enabled(!busy, editor);

                    // Enter submits; Shift+Enter inserts a newline.
                    let enter = response.has_focus()
                        && ui.input(|i| i.key_pressed(egui::Key::Enter) && !i.modifiers.shift);

                    send.clicked() || enter
                })
                .inner;

            if send_clicked && !busy {
                // The editor already inserted the newline for a plain Enter;
                // trimming in submit_input removes it.
                self.submit_input();
            }
        });
    }

    fn draw_preview(&mut self, ui: &mut egui::Ui, snap: &Snapshot) {
        ui.heading("Resume Preview");
        ui.separator();

        if snap.resume.is_empty() {
            ui.add_space(12.0);
            ui.label(
                egui::RichText::new(
                    "Your resume will appear here as you complete each section.",
                )
                .color(ui.visuals().weak_text_color()),
            );
            return;
        }

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                let name = snap
                    .resume
                    .get(Section::Contact)
                    .and_then(|c| c.lines().next())
                    .unwrap_or("Your Name");
                ui.heading(name);
                ui.add_space(6.0);

                for (section, content) in snap.resume.iter() {
                    ui.label(egui::RichText::new(section.title()).strong());
                    if section == Section::Contact {
                        let body: Vec<&str> = content.lines().skip(1).collect();
                        ui.label(body.join("\n"));
                    } else {
                        ui.label(content);
                    }
                    ui.add_space(8.0);
                }

                ui.separator();
                self.draw_export_buttons(ui, &snap.resume);
            });
    }

    fn draw_export_buttons(&mut self, ui: &mut egui::Ui, resume: &ResumeData) {
        ui.horizontal(|ui| {
            if ui.button("Download resume.md").clicked() {
                let markdown = resume::render_markdown(resume);
                match resume::save_to_file(&markdown) {
                    Ok(path) => {
                        self.export_note =
                            Some((format!("Saved to {}", path.display()), Instant::now()));
                    }
                    Err(e) => {
                        log::warn!("export failed: {e}");
                        self.export_note = Some(("Export failed".into(), Instant::now()));
                    }
                }
            }

            if ui.button("Copy markdown").clicked() {
                let markdown = resume::render_markdown(resume);
                match resume::copy_to_clipboard(&markdown) {
                    Ok(()) => self.export_note = Some(("Copied".into(), Instant::now())),
                    Err(e) => {
                        log::warn!("clipboard export failed: {e}");
                        self.export_note = Some(("Copy failed".into(), Instant::now()));
                    }
                }
            }
        });

        let note_expired = self
            .export_note
            .as_ref()
            .is_some_and(|(_, at)| at.elapsed() >= NOTE_DURATION);
        if note_expired {
            self.export_note = None;
        }
        if let Some((note, _)) = &self.export_note {
            ui.label(
                egui::RichText::new(note.as_str())
                    .small()
                    .color(ui.visuals().weak_text_color()),
            );
        }
    }
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for ResumeArchitectApp {
    /// Called every frame by eframe.  Reads the shared state, mirrors the
    /// live transcript, then renders the panels.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let snap = self.snapshot();

        ctx.set_visuals(if self.dark_mode {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        });

        // --- Live transcript mirroring ------------------------------------
        if snap.recording {
            // The user sees their speech appear in the input field.
            if !snap.live_transcript.is_empty() {
                self.input = snap.live_transcript.clone();
            }
        } else if self.was_recording {
            // Recording just stopped; the transcript was submitted as a turn.
            self.input.clear();
        }
        self.was_recording = snap.recording;

        // --- Repaint scheduling -------------------------------------------
        // Background tasks mutate the shared state without UI events; poll
        // faster while something is moving.
        let busy = snap.status.is_busy() || snap.recording || self.speech.is_busy();
        ctx.request_repaint_after(if busy {
            Duration::from_millis(100)
        } else {
            Duration::from_millis(400)
        });

        // --- Panels --------------------------------------------------------
        egui::TopBottomPanel::top("top-bar").show(ctx, |ui| {
            ui.add_space(4.0);
            self.draw_top_bar(ui, &snap);
            ui.add_space(4.0);
        });

        egui::TopBottomPanel::bottom("input-row").show(ctx, |ui| {
            ui.add_space(6.0);
            self.draw_input_row(ui, &snap);
            ui.add_space(6.0);
        });

        if self.show_preview {
            egui::SidePanel::right("preview")
                .default_width(340.0)
                .show(ctx, |ui| {
                    self.draw_preview(ui, &snap);
                });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_chat(ui, &snap);
        });
    }

    /// Persist the UI toggles on exit (best-effort).
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        let mut config = {
            let st = self.state.lock().unwrap();
            st.config.clone()
        };
        config.ui.dark_mode = self.dark_mode;
        config.ui.show_preview = self.show_preview;
        if let Err(e) = config.save() {
            log::warn!("failed to save settings on exit: {e}");
        }
        log::info!("Resume Architect closing");
    }
}
