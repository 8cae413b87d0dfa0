//! Wire messages for the BidiGenerateContent websocket.
//!
//! Outbound: one [`SetupMessage`] right after connecting, then a
//! [`RealtimeInputMessage`] per encoded microphone frame. Inbound: JSON
//! frames decoded into [`LiveEvent`]s — setup confirmation, partial input
//! transcripts, and turn-complete markers (which this application ignores;
//! recording stops only on the user's toggle).

use serde::Serialize;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Outbound messages
// ---------------------------------------------------------------------------

/// First frame on the wire: declares the model, the audio response modality,
/// and input transcription.
#[derive(Debug, Serialize)]
pub struct SetupMessage {
    setup: Setup,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Setup {
    model: String,
    generation_config: GenerationConfig,
    input_audio_transcription: Empty,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct Empty {}

impl SetupMessage {
    /// `model` is the bare model name; the wire wants the `models/` prefix.
    pub fn new(model: &str) -> Self {
        Self {
            setup: Setup {
                model: format!("models/{model}"),
                generation_config: GenerationConfig {
                    response_modalities: vec!["AUDIO"],
                },
                input_audio_transcription: Empty {},
            },
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("setup message serializes")
    }
}

/// One encoded microphone frame.
#[derive(Debug, Serialize)]
pub struct RealtimeInputMessage {
    #[serde(rename = "realtimeInput")]
    realtime_input: RealtimeInput,
}

#[derive(Debug, Serialize)]
struct RealtimeInput {
    #[serde(rename = "mediaChunks")]
    media_chunks: Vec<MediaChunk>,
}

/// Base64 PCM with its mime type, e.g. `audio/pcm;rate=16000`.
#[derive(Debug, Serialize)]
pub struct MediaChunk {
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub data: String,
}

impl RealtimeInputMessage {
    pub fn audio_frame(base64_pcm: String, sample_rate: u32) -> Self {
        Self {
            realtime_input: RealtimeInput {
                media_chunks: vec![MediaChunk {
                    mime_type: format!("audio/pcm;rate={sample_rate}"),
                    data: base64_pcm,
                }],
            },
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("realtime input serializes")
    }
}

// ---------------------------------------------------------------------------
// Inbound events
// ---------------------------------------------------------------------------

/// Event decoded from one inbound server frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    /// The session accepted the setup message; streaming may begin.
    SetupComplete,
    /// A partial transcript delta of the user's speech.
    InputTranscript(String),
    /// The model considers the current turn finished. Parsed but unused —
    /// this application stops only on the manual toggle.
    TurnComplete,
}

/// Decode one inbound JSON frame into the events it carries.
///
/// Unknown or irrelevant fields are ignored; a frame can in principle carry
/// both a transcript delta and a turn-complete marker.
pub fn parse_server_frame(raw: &str) -> Result<Vec<LiveEvent>, serde_json::Error> {
    let root: Value = serde_json::from_str(raw)?;
    let mut events = Vec::new();

    if root.get("setupComplete").is_some() {
        events.push(LiveEvent::SetupComplete);
    }

    if let Some(content) = root.get("serverContent") {
        if let Some(text) = content
            .get("inputTranscription")
            .and_then(|t| t.get("text"))
            .and_then(|t| t.as_str())
        {
            if !text.is_empty() {
                events.push(LiveEvent::InputTranscript(text.to_string()));
            }
        }

        if content
            .get("turnComplete")
            .and_then(|t| t.as_bool())
            .unwrap_or(false)
        {
            events.push(LiveEvent::TurnComplete);
        }
    }

    Ok(events)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
