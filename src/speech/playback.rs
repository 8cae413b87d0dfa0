//! Audio output — the `AudioSink` trait and its rodio implementation.
//!
//! rodio's `OutputStream` is not `Send`, so [`RodioSink`] owns a dedicated
//! playback thread that opens the default output device once and plays
//! segments it receives over a channel. [`AudioSink::play`] blocks the
//! calling thread until the segment has finished — that blocking call is what
//! the speech queue serializes playback on.

use std::sync::mpsc;
use std::thread;

use thiserror::Error;

use crate::speech::AudioSegment;

// ---------------------------------------------------------------------------
// PlaybackError
// ---------------------------------------------------------------------------

/// Errors that can occur while playing a segment.
#[derive(Debug, Clone, Error)]
pub enum PlaybackError {
    /// No output device, or the platform rejected the stream.
    #[error("audio output unavailable: {0}")]
    DeviceUnavailable(String),

    /// The playback thread is gone.
    #[error("playback worker stopped")]
    WorkerStopped,
}

// ---------------------------------------------------------------------------
// AudioSink trait
// ---------------------------------------------------------------------------

/// Blocking, single-timeline audio output.
///
/// `play` returns only after the segment has been fully played, so a caller
/// that plays segments one at a time gets strict serialization for free.
/// Implementors must be `Send + Sync` (`Arc<dyn AudioSink>`).
pub trait AudioSink: Send + Sync {
    fn play(&self, segment: AudioSegment) -> Result<(), PlaybackError>;
}

// ---------------------------------------------------------------------------
// RodioSink
// ---------------------------------------------------------------------------

type PlayRequest = (AudioSegment, mpsc::Sender<Result<(), PlaybackError>>);

/// Plays segments on the system default output device via rodio.
pub struct RodioSink {
    request_tx: mpsc::Sender<PlayRequest>,
}

impl RodioSink {
    /// Spawn the playback thread.
    ///
    /// The output device is opened lazily on the playback thread the first
    /// time a segment arrives; if the device cannot be opened every `play`
    /// call reports [`PlaybackError::DeviceUnavailable`].
    pub fn new() -> Self {
        let (request_tx, request_rx) = mpsc::channel::<PlayRequest>();

        thread::Builder::new()
            .name("speech-playback".into())
            .spawn(move || playback_loop(request_rx))
            .expect("failed to spawn speech-playback thread");

        Self { request_tx }
    }
}

impl Default for RodioSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSink for RodioSink {
    fn play(&self, segment: AudioSegment) -> Result<(), PlaybackError> {
        let (done_tx, done_rx) = mpsc::channel();
        self.request_tx
            .send((segment, done_tx))
            .map_err(|_| PlaybackError::WorkerStopped)?;
        done_rx.recv().map_err(|_| PlaybackError::WorkerStopped)?
    }
}

/// Body of the playback thread: open the device once, then play requests
/// back-to-back in arrival order.
fn playback_loop(request_rx: mpsc::Receiver<PlayRequest>) {
    // The stream must outlive every sink; the handle is what sinks attach to.
    let mut output: Option<(rodio::OutputStream, rodio::OutputStreamHandle)> = None;

    while let Ok((segment, done_tx)) = request_rx.recv() {
        if output.is_none() {
            match rodio::OutputStream::try_default() {
                Ok(pair) => output = Some(pair),
                Err(e) => {
                    log::warn!("speech-playback: cannot open output device: {e}");
                    let _ = done_tx.send(Err(PlaybackError::DeviceUnavailable(e.to_string())));
                    continue;
                }
            }
        }

        let Some((_stream, handle)) = output.as_ref() else {
            continue;
        };
        let result = match rodio::Sink::try_new(handle) {
            Ok(sink) => {
                let buffer =
                    rodio::buffer::SamplesBuffer::new(1, segment.sample_rate, segment.samples);
                sink.append(buffer);
                sink.sleep_until_end();
                Ok(())
            }
            Err(e) => Err(PlaybackError::DeviceUnavailable(e.to_string())),
        };

        let _ = done_tx.send(result);
    }

    log::debug!("speech-playback: request channel closed, thread exiting");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// A sink that records what it played.
    struct RecordingSink {
        played: Arc<Mutex<Vec<AudioSegment>>>,
    }

    impl AudioSink for RecordingSink {
        fn play(&self, segment: AudioSegment) -> Result<(), PlaybackError> {
            self.played.lock().unwrap().push(segment);
            Ok(())
        }
    }

    #[test]
    fn sink_trait_is_object_safe() {
        let played = Arc::new(Mutex::new(Vec::new()));
        let sink: Arc<dyn AudioSink> = Arc::new(RecordingSink {
            played: Arc::clone(&played),
        });

        let segment = AudioSegment {
            samples: vec![0.0; 8],
            sample_rate: 24_000,
        };
        sink.play(segment.clone()).unwrap();
        assert_eq!(played.lock().unwrap().as_slice(), &[segment]);
    }
}
