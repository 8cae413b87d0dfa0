//! Core `SpeechSynthesizer` trait and the `GeminiTts` implementation.
//!
//! `GeminiTts` posts plain text to `models/{model}:generateContent` with the
//! AUDIO response modality and decodes the returned base64 PCM payload into
//! an [`AudioSegment`].

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use crate::audio::decode_pcm_payload;
use crate::config::GeminiConfig;
use crate::speech::AudioSegment;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

// ---------------------------------------------------------------------------
// SynthError
// ---------------------------------------------------------------------------

/// Errors that can occur during speech synthesis.
#[derive(Debug, Error)]
pub enum SynthError {
    /// No API key in the environment or the settings file.
    #[error("no Gemini API key configured (set GEMINI_API_KEY)")]
    MissingApiKey,

    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("speech synthesis timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("speech API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response carried no audio payload, or it failed to decode.
    #[error("no usable audio in synthesis response: {0}")]
    BadPayload(String),
}

impl From<reqwest::Error> for SynthError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SynthError::Timeout
        } else {
            SynthError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// SpeechSynthesizer trait
// ---------------------------------------------------------------------------

/// Async trait for text-to-speech backends.
///
/// Implementors must be `Send + Sync` so the queue can share them across
/// overlapping synthesis tasks (`Arc<dyn SpeechSynthesizer>`).
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<AudioSegment, SynthError>;
}

// ---------------------------------------------------------------------------
// GeminiTts
// ---------------------------------------------------------------------------

/// Hosted Gemini text-to-speech.
pub struct GeminiTts {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    voice: String,
    fallback_sample_rate: u32,
}

impl GeminiTts {
    /// Build a `GeminiTts` from application config.
    ///
    /// The HTTP client carries the per-request synthesis timeout; sentence
    /// playback would stall behind a hung conversion otherwise.
    pub fn from_config(config: &GeminiConfig, fallback_sample_rate: u32) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.synthesis_timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_key: config.resolve_api_key(),
            model: config.tts_model.clone(),
            voice: config.voice.clone(),
            fallback_sample_rate,
        }
    }

    fn request_body(&self, text: &str) -> Value {
        json!({
            "contents": [{ "parts": [{ "text": text }] }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": self.voice }
                    }
                }
            }
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for GeminiTts {
    async fn synthesize(&self, text: &str) -> Result<AudioSegment, SynthError> {
        let api_key = self.api_key.as_deref().ok_or(SynthError::MissingApiKey)?;
        let url = format!("{BASE_URL}/{model}:generateContent?key={api_key}", model = self.model);

        let response = self
            .client
            .post(&url)
            .json(&self.request_body(text))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SynthError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| SynthError::BadPayload(e.to_string()))?;

        let part = json
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
            .and_then(|p| p.first())
            .and_then(|p| p.get("inlineData"))
            .ok_or_else(|| SynthError::BadPayload("missing inlineData".into()))?;

        let data = part
            .get("data")
            .and_then(|d| d.as_str())
            .ok_or_else(|| SynthError::BadPayload("missing audio data".into()))?;

        let sample_rate = part
            .get("mimeType")
            .and_then(|m| m.as_str())
            .and_then(parse_pcm_rate)
            .unwrap_or(self.fallback_sample_rate);

        let samples =
            decode_pcm_payload(data).map_err(|e| SynthError::BadPayload(e.to_string()))?;

        Ok(AudioSegment {
            samples,
            sample_rate,
        })
    }
}

/// Extract the sample rate from a mime type like `audio/pcm;rate=24000`.
fn parse_pcm_rate(mime: &str) -> Option<u32> {
    mime.split(';')
        .map(str::trim)
        .find_map(|param| param.strip_prefix("rate="))
        .and_then(|rate| rate.parse().ok())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
