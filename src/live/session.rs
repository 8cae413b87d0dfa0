//! The live capture session — one recording from toggle-on to toggle-off.
//!
//! Lifecycle (Closed → Opening → Streaming → Closed):
//!
//! 1. **Opening** — acquire the default microphone, connect the websocket,
//!    send the setup message and wait for the server's confirmation. Any
//!    failure here tears down whatever was acquired and surfaces a
//!    [`LiveError`]; the caller reverts the recording toggle.
//! 2. **Streaming** — a forward task downmixes, resamples and encodes every
//!    microphone chunk and sends it frame-by-frame; a read task decodes
//!    inbound frames and forwards partial-transcript deltas over the
//!    transcript channel.
//! 3. **Closed** — [`LiveCaptureSession::close`] drops the microphone stream
//!    (which ends the forward task and lets it send the websocket close
//!    frame) and stops the reader. The accumulated transcript lives with the
//!    orchestrator, which submits it as a user turn if non-empty.
//!
//! At most one session exists at a time; the orchestrator holds it in an
//! `Option` and toggle semantics guarantee well-formed on/off alternation.

use std::time::Duration;

use futures_util::{SinkExt, Stream, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::audio::{encode_live_frame, resample_to_16k, stereo_to_mono};
use crate::audio::{AudioCapture, AudioChunk, CaptureError};
use crate::live::protocol::{parse_server_frame, LiveEvent, RealtimeInputMessage, SetupMessage};

const WS_BASE: &str = "wss://generativelanguage.googleapis.com/ws/\
                       google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// How long to wait for the server's setup confirmation.
const SETUP_TIMEOUT: Duration = Duration::from_secs(10);

/// How long `close` waits for the forward task to flush and send the
/// websocket close frame.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Wire sample rate for outbound frames.
const FRAME_RATE: u32 = 16_000;

// ---------------------------------------------------------------------------
// LiveError
// ---------------------------------------------------------------------------

/// Errors that can occur while opening or running a live session.
///
/// All variants are recoverable: the orchestrator reverts the recording
/// toggle and logs.
#[derive(Debug, Error)]
pub enum LiveError {
    /// Microphone unavailable (the permission-denied analog on desktop).
    #[error("microphone unavailable: {0}")]
    Microphone(#[from] CaptureError),

    /// The websocket connection could not be established.
    #[error("live session connect failed: {0}")]
    Connect(String),

    /// The server rejected or never confirmed the setup message.
    #[error("live session setup failed: {0}")]
    Setup(String),

    /// The capture worker thread could not be started or died early.
    #[error("live session capture worker failed: {0}")]
    Worker(String),
}

// ---------------------------------------------------------------------------
// CaptureWorker
// ---------------------------------------------------------------------------

/// Owns the cpal stream on a dedicated OS thread.
///
/// `cpal::Stream` is not `Send`, so it cannot live inside the orchestrator's
/// tokio task. The worker thread acquires the device, starts the stream, and
/// then blocks until the stop signal; dropping the worker sends that signal,
/// which releases the microphone.
struct CaptureWorker {
    stop_tx: std::sync::mpsc::Sender<()>,
}

impl Drop for CaptureWorker {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}

/// Spawn the capture thread and wait until the microphone is streaming.
async fn start_capture_worker(
    chunk_tx: mpsc::UnboundedSender<AudioChunk>,
) -> Result<CaptureWorker, LiveError> {
    let (ready_tx, ready_rx) = tokio::sync::oneshot::channel::<Result<(), CaptureError>>();
    let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();

    std::thread::Builder::new()
        .name("live-capture".into())
        .spawn(move || {
            let capture = match AudioCapture::new() {
                Ok(capture) => capture,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let handle = match capture.start(chunk_tx) {
                Ok(handle) => handle,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));

            // Hold the stream until the session signals stop (a disconnect
            // counts too); dropping the handle releases the microphone.
            let _ = stop_rx.recv();
            drop(handle);
        })
        .map_err(|e| LiveError::Worker(e.to_string()))?;

    match ready_rx.await {
        Ok(Ok(())) => Ok(CaptureWorker { stop_tx }),
        Ok(Err(e)) => Err(LiveError::Microphone(e)),
        Err(_) => Err(LiveError::Worker("capture thread exited early".into())),
    }
}

// ---------------------------------------------------------------------------
// LiveCaptureSession
// ---------------------------------------------------------------------------

/// An open recording: owns the microphone stream and both websocket halves
/// (via its background tasks) for its lifetime.
pub struct LiveCaptureSession {
    /// Microphone owner; dropped first on close so the forward task's chunk
    /// channel drains and closes.
    capture_worker: Option<CaptureWorker>,
    forward_task: JoinHandle<()>,
    read_task: JoinHandle<()>,
}

impl LiveCaptureSession {
    /// Open a new session: microphone, websocket, setup handshake, then
    /// streaming. Partial transcripts are delivered over `transcript_tx` as
    /// they arrive.
    pub async fn open(
        model: &str,
        api_key: &str,
        transcript_tx: mpsc::UnboundedSender<String>,
    ) -> Result<Self, LiveError> {
        // -- Opening: microphone access first (the permission gate). The
        // probe device is released immediately; capture proper starts only
        // once the session is confirmed.
        AudioCapture::new().map(drop)?;

        let url = endpoint_url(api_key);
        let (ws, _response) = connect_async(url)
            .await
            .map_err(|e| LiveError::Connect(e.to_string()))?;
        let (mut write, mut read) = ws.split();

        write
            .send(Message::Text(SetupMessage::new(model).to_json()))
            .await
            .map_err(|e| LiveError::Setup(e.to_string()))?;

        wait_for_setup(&mut read).await?;
        log::info!("live session opened ({model})");

        // -- Streaming: mic chunks out, transcript deltas in.
        let (chunk_tx, mut chunk_rx) = mpsc::unbounded_channel::<AudioChunk>();
        let capture_worker = start_capture_worker(chunk_tx).await?;

        let forward_task = tokio::spawn(async move {
            while let Some(chunk) = chunk_rx.recv().await {
                let mono = stereo_to_mono(&chunk.samples, chunk.channels);
                let frame = resample_to_16k(&mono, chunk.sample_rate);
                if frame.is_empty() {
                    continue;
                }
                let message =
                    RealtimeInputMessage::audio_frame(encode_live_frame(&frame), FRAME_RATE);
                if let Err(e) = write.send(Message::Text(message.to_json())).await {
                    log::warn!("live session: frame send failed: {e}");
                    return;
                }
            }
            // Microphone released; say goodbye to the server.
            let _ = write.send(Message::Close(None)).await;
        });

        let read_task = tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                let message = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => continue,
                };
                match parse_server_frame(&message) {
                    Ok(events) => {
                        for event in events {
                            match event {
                                LiveEvent::InputTranscript(delta) => {
                                    if transcript_tx.send(delta).is_err() {
                                        return;
                                    }
                                }
                                // Manual stop only; the model's idea of a
                                // finished turn is ignored.
                                LiveEvent::TurnComplete => {}
                                LiveEvent::SetupComplete => {}
                            }
                        }
                    }
                    Err(e) => log::warn!("live session: undecodable frame: {e}"),
                }
            }
            log::info!("live session closed by server");
        });

        Ok(Self {
            capture_worker: Some(capture_worker),
            forward_task,
            read_task,
        })
    }

    /// Deterministically close the session: release the microphone, let the
    /// forward task flush and send the close frame, stop the reader.
    pub async fn close(mut self) {
        // Dropping the worker stops the cpal stream, which drops the chunk
        // sender and ends the forward task's loop.
        self.capture_worker.take();

        let abort = self.forward_task.abort_handle();
        if tokio::time::timeout(CLOSE_TIMEOUT, self.forward_task)
            .await
            .is_err()
        {
            log::warn!("live session: forward task did not flush in time");
            abort.abort();
        }

        self.read_task.abort();
        log::info!("live session closed");
    }
}

/// Read frames until the server confirms setup.
async fn wait_for_setup<S>(read: &mut S) -> Result<(), LiveError>
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let handshake = async {
        while let Some(frame) = read.next().await {
            let message = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => {
                    return Err(LiveError::Setup("server closed during setup".into()))
                }
                Ok(_) => continue,
                Err(e) => return Err(LiveError::Setup(e.to_string())),
            };
            let events = parse_server_frame(&message)
                .map_err(|e| LiveError::Setup(format!("bad setup frame: {e}")))?;
            if events.contains(&LiveEvent::SetupComplete) {
                return Ok(());
            }
        }
        Err(LiveError::Setup("connection ended during setup".into()))
    };

    tokio::time::timeout(SETUP_TIMEOUT, handshake)
        .await
        .map_err(|_| LiveError::Setup("timed out waiting for confirmation".into()))?
}

/// The BidiGenerateContent endpoint with the API key attached.
fn endpoint_url(api_key: &str) -> String {
    format!("{WS_BASE}?key={api_key}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[test]
    fn endpoint_includes_key_and_service() {
        let url = endpoint_url("abc123");
        assert!(url.starts_with("wss://generativelanguage.googleapis.com/ws/"));
        assert!(url.contains("BidiGenerateContent"));
        assert!(url.ends_with("?key=abc123"));
    }

    /// Setup succeeds as soon as a `setupComplete` frame arrives, even after
    /// unrelated frames.
    #[tokio::test]
    async fn wait_for_setup_accepts_confirmation() {
        let frames = vec![
            Ok(Message::Text(r#"{"serverContent": {}}"#.into())),
            Ok(Message::Text(r#"{"setupComplete": {}}"#.into())),
        ];
        let mut read = stream::iter(frames);
        assert!(wait_for_setup(&mut read).await.is_ok());
    }

    /// A close frame during the handshake is a setup failure.
    #[tokio::test]
    async fn wait_for_setup_rejects_early_close() {
        let frames = vec![Ok(Message::Close(None))];
        let mut read = stream::iter(frames);
        assert!(matches!(
            wait_for_setup(&mut read).await,
            Err(LiveError::Setup(_))
        ));
    }

    /// A stream that ends without confirmation is a setup failure.
    #[tokio::test]
    async fn wait_for_setup_rejects_exhausted_stream() {
        let mut read = stream::iter(Vec::new());
        assert!(matches!(
            wait_for_setup(&mut read).await,
            Err(LiveError::Setup(_))
        ));
    }
}
