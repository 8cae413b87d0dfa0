//! Sentence-boundary speech output.
//!
//! As reply text streams in, [`SentenceSplitter`] carves it into complete
//! sentences; [`SpeechQueue`] converts each sentence to audio without waiting
//! for the previous conversion (synthesis pipelines) while playing the
//! resulting segments strictly in enqueue order on a single timeline.
//!
//! This module provides:
//! * [`SentenceSplitter`] — incremental sentence-boundary scanner.
//! * [`SpeechSynthesizer`] / [`GeminiTts`] — text → PCM segment conversion.
//! * [`AudioSink`] / [`RodioSink`] — blocking, serialized playback.
//! * [`SpeechQueue`] — the submit-ahead / drain-serially coordinator.
//! * [`AudioSegment`] — a decoded mono PCM clip.

pub mod playback;
pub mod queue;
pub mod sentence;
pub mod synth;

pub use playback::{AudioSink, PlaybackError, RodioSink};
pub use queue::SpeechQueue;
pub use sentence::SentenceSplitter;
pub use synth::{GeminiTts, SpeechSynthesizer, SynthError};

// ---------------------------------------------------------------------------
// AudioSegment
// ---------------------------------------------------------------------------

/// A decoded mono audio clip awaiting playback.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    /// Mono PCM samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Sample rate in Hz (synthesized speech arrives at 24 000).
    pub sample_rate: u32,
}

impl AudioSegment {
    /// Clip length in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}
