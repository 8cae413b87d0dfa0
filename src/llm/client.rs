//! Core `ChatModel` trait and the `GeminiChat` streaming implementation.
//!
//! `GeminiChat` posts to `models/{model}:streamGenerateContent?alt=sse` and
//! forwards decoded fragments over a channel, so the caller iterates the
//! reply with `recv().await` and never touches the wire format.

use async_trait::async_trait;
use futures_util::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::chat::{ChatMessage, Citation};
use crate::config::GeminiConfig;
use crate::llm::prompt::build_stream_request;
use crate::llm::sse::{parse_fragment, SseLineBuffer};
use crate::section::Section;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

// ---------------------------------------------------------------------------
// LlmError
// ---------------------------------------------------------------------------

/// Errors that can occur while streaming a chat reply.
#[derive(Debug, Error)]
pub enum LlmError {
    /// No API key in the environment or the settings file.
    #[error("no Gemini API key configured (set GEMINI_API_KEY)")]
    MissingApiKey,

    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The service answered with a non-success status.
    #[error("Gemini API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// An SSE payload could not be parsed.
    #[error("failed to parse stream fragment: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        LlmError::Request(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// StreamFragment
// ---------------------------------------------------------------------------

/// One incremental piece of a streamed reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamFragment {
    /// Text delta, absent for citation-only fragments.
    pub text: Option<String>,
    /// Grounding citations delivered with this fragment.
    pub citations: Vec<Citation>,
}

/// Receiving end of a reply stream. The channel closing means the stream is
/// exhausted; an `Err` item means it failed (no further items follow).
pub type FragmentReceiver = mpsc::Receiver<Result<StreamFragment, LlmError>>;

// ---------------------------------------------------------------------------
// ChatModel trait
// ---------------------------------------------------------------------------

/// Async trait for streamed chat backends.
///
/// Implementors must be `Send + Sync` so they can be shared across tasks
/// (e.g. wrapped in `Arc<dyn ChatModel>`).
///
/// # Arguments
/// * `history`   – Ordered prior turns (the new user text excluded).
/// * `user_text` – The new user submission.
/// * `section`   – Current resume section, tagged into the instruction.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn stream_reply(
        &self,
        history: &[ChatMessage],
        user_text: &str,
        section: Section,
    ) -> Result<FragmentReceiver, LlmError>;
}

// ---------------------------------------------------------------------------
// GeminiChat
// ---------------------------------------------------------------------------

/// Streamed, search-grounded chat against the hosted Gemini API.
///
/// The HTTP client deliberately has no request timeout: the generation
/// stream runs as long as the service keeps sending. A hung call stalls the
/// turn, which is the documented behaviour.
pub struct GeminiChat {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl GeminiChat {
    /// Build a `GeminiChat` from application config. The API key is resolved
    /// once at construction (environment first, then settings file).
    pub fn from_config(config: &GeminiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.resolve_api_key(),
            model: config.chat_model.clone(),
        }
    }
}

#[async_trait]
impl ChatModel for GeminiChat {
    async fn stream_reply(
        &self,
        history: &[ChatMessage],
        user_text: &str,
        section: Section,
    ) -> Result<FragmentReceiver, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;
        let url = format!(
            "{BASE_URL}/{model}:streamGenerateContent?alt=sse&key={api_key}",
            model = self.model,
        );

        let body = build_stream_request(history, user_text, section);
        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: extract_api_error(&body),
            });
        }

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut lines = SseLineBuffer::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let _ = tx.send(Err(e.into())).await;
                        return;
                    }
                };
                for payload in lines.push(&chunk) {
                    match parse_fragment(&payload) {
                        Ok(fragment) => {
                            if tx.send(Ok(fragment)).await.is_err() {
                                // Receiver dropped; stop reading the stream.
                                return;
                            }
                        }
                        Err(e) => {
                            let _ = tx.send(Err(e)).await;
                            return;
                        }
                    }
                }
            }
            // Channel close signals normal exhaustion.
        });

        Ok(rx)
    }
}

/// Pull `error.message` out of an API error body, falling back to the raw
/// body text.
fn extract_api_error(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            json.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(|m| m.to_string())
        })
        .unwrap_or_else(|| body.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
