//! The submit-ahead / drain-serially speech queue.
//!
//! Every enqueued sentence immediately gets its own synthesis task — no
//! conversion waits for the previous one, so synthesis pipelines. Each task
//! resolves an ordered slot (a oneshot per sentence), and a single drain task
//! consumes slots strictly FIFO, playing each resulting segment to completion
//! before touching the next. Synthesis may race; playback may not.
//!
//! At most one drain task runs at a time. A sentence enqueued while a drain
//! is running is simply appended and picked up by that drain; when the last
//! slot has played the drain exits and the queue reports idle.
//!
//! Readiness: the queue is *loading* (busy) from the moment a sentence is
//! enqueued until its segment has finished playing or been skipped — covering
//! outstanding synthesis calls, waiting slots, and active playback with one
//! counter.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::speech::playback::AudioSink;
use crate::speech::synth::SpeechSynthesizer;
use crate::speech::AudioSegment;

// ---------------------------------------------------------------------------
// SpeechQueue
// ---------------------------------------------------------------------------

/// Coordinates pipelined synthesis with serialized playback.
///
/// Cheap to clone; all clones share one queue.
#[derive(Clone)]
pub struct SpeechQueue {
    synth: Arc<dyn SpeechSynthesizer>,
    sink: Arc<dyn AudioSink>,
    inner: Arc<QueueInner>,
}

struct Slot {
    /// Queue generation this sentence belongs to; [`SpeechQueue::clear_pending`]
    /// bumps the generation, invalidating every slot created before it —
    /// including the one the drain task has already popped and is waiting on.
    generation: u64,
    rx: oneshot::Receiver<Option<AudioSegment>>,
}

struct QueueInner {
    /// Ordered slots: one receiver per enqueued sentence, resolved by its
    /// synthesis task with `Some(segment)` or `None` on failure.
    slots: Mutex<VecDeque<Slot>>,
    /// Whether a drain task is currently running.
    draining: AtomicBool,
    /// Sentences enqueued but not yet played, skipped, or cleared.
    active: AtomicUsize,
    /// Current generation; see [`Slot::generation`].
    generation: AtomicU64,
}

impl SpeechQueue {
    pub fn new(synth: Arc<dyn SpeechSynthesizer>, sink: Arc<dyn AudioSink>) -> Self {
        Self {
            synth,
            sink,
            inner: Arc::new(QueueInner {
                slots: Mutex::new(VecDeque::new()),
                draining: AtomicBool::new(false),
                active: AtomicUsize::new(0),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Queue one sentence for synthesis and eventual playback.
    ///
    /// Must be called from within a tokio runtime. Synthesis starts
    /// immediately; playback happens when every earlier slot has finished.
    pub fn enqueue(&self, sentence: String) {
        let (tx, rx) = oneshot::channel();

        self.inner.active.fetch_add(1, Ordering::SeqCst);

        let synth = Arc::clone(&self.synth);
        tokio::spawn(async move {
            let segment = match synth.synthesize(&sentence).await {
                Ok(segment) => Some(segment),
                Err(e) => {
                    // Degrade to text-only: the sentence is simply not spoken.
                    log::warn!("speech synthesis failed ({e}); skipping sentence");
                    None
                }
            };
            let _ = tx.send(segment);
        });

        let slot = Slot {
            generation: self.inner.generation.load(Ordering::SeqCst),
            rx,
        };
        self.inner.slots.lock().unwrap().push_back(slot);
        self.ensure_drain();
    }

    /// Drop every sentence that has not started playing.
    ///
    /// A segment already being played runs to completion; everything behind
    /// it — waiting slots and the slot the drain is currently resolving — is
    /// discarded.
    pub fn clear_pending(&self) {
        // Invalidate the slot the drain task may already hold in hand.
        self.inner.generation.fetch_add(1, Ordering::SeqCst);

        let dropped = {
            let mut slots = self.inner.slots.lock().unwrap();
            let n = slots.len();
            slots.clear();
            n
        };
        self.inner.active.fetch_sub(dropped, Ordering::SeqCst);
    }

    /// `true` while any synthesis call is outstanding, any slot is waiting,
    /// or a segment is playing — the externally visible Loading state.
    pub fn is_busy(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst) > 0
    }

    /// Start the drain task unless one is already running.
    fn ensure_drain(&self) {
        if self.inner.draining.swap(true, Ordering::SeqCst) {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            loop {
                let slot = inner.slots.lock().unwrap().pop_front();
                let Some(slot) = slot else {
                    inner.draining.store(false, Ordering::SeqCst);
                    // A sentence may have been enqueued between the empty pop
                    // and the flag reset; reclaim the drain if so.
                    if inner.slots.lock().unwrap().is_empty()
                        || inner.draining.swap(true, Ordering::SeqCst)
                    {
                        return;
                    }
                    continue;
                };

                let segment = match slot.rx.await {
                    Ok(Some(segment)) => segment,
                    // Synthesis failed, or the slot's task vanished.
                    Ok(None) | Err(_) => {
                        inner.active.fetch_sub(1, Ordering::SeqCst);
                        continue;
                    }
                };

                // Cleared while in hand: discard without playing.
                if slot.generation < inner.generation.load(Ordering::SeqCst) {
                    inner.active.fetch_sub(1, Ordering::SeqCst);
                    continue;
                }

                let sink = Arc::clone(&sink);
                let played = tokio::task::spawn_blocking(move || sink.play(segment)).await;
                inner.active.fetch_sub(1, Ordering::SeqCst);

                match played {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => log::warn!("speech playback failed: {e}"),
                    Err(e) => log::warn!("speech playback task panicked: {e}"),
                }
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;

    use crate::speech::synth::SynthError;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Encodes the sentence into the segment so the sink can prove which
    /// sentence it played. Sleeps longer for sentences containing "slow" so
    /// synthesis completion order differs from enqueue order.
    struct MockSynth;

    fn segment_for(text: &str) -> AudioSegment {
        AudioSegment {
            samples: text.chars().map(|c| c as u32 as f32).collect(),
            sample_rate: 24_000,
        }
    }

    fn sentence_of(segment: &AudioSegment) -> String {
        segment
            .samples
            .iter()
            .filter_map(|&s| char::from_u32(s as u32))
            .collect()
    }

    #[async_trait]
    impl SpeechSynthesizer for MockSynth {
        async fn synthesize(&self, text: &str) -> Result<AudioSegment, SynthError> {
            let delay = if text.contains("slow") { 80 } else { 5 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            if text.contains("fail") {
                return Err(SynthError::Request("mock failure".into()));
            }
            Ok(segment_for(text))
        }
    }

    /// Records played segments in order.
    struct RecordingSink {
        played: Arc<Mutex<Vec<AudioSegment>>>,
    }

    impl AudioSink for RecordingSink {
        fn play(&self, segment: AudioSegment) -> Result<(), crate::speech::PlaybackError> {
            self.played.lock().unwrap().push(segment);
            Ok(())
        }
    }

    fn make_queue() -> (SpeechQueue, Arc<Mutex<Vec<AudioSegment>>>) {
        let played = Arc::new(Mutex::new(Vec::new()));
        let queue = SpeechQueue::new(
            Arc::new(MockSynth),
            Arc::new(RecordingSink {
                played: Arc::clone(&played),
            }),
        );
        (queue, played)
    }

    async fn wait_until_idle(queue: &SpeechQueue) {
        for _ in 0..200 {
            if !queue.is_busy() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("queue never became idle");
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    /// Segment k+1 never plays before segment k, even when a later sentence
    /// finishes synthesis first.
    #[tokio::test]
    async fn playback_follows_enqueue_order_despite_synthesis_races() {
        let (queue, played) = make_queue();

        queue.enqueue("slow first".into());
        queue.enqueue("second".into());
        queue.enqueue("third".into());

        wait_until_idle(&queue).await;

        let order: Vec<String> = played.lock().unwrap().iter().map(sentence_of).collect();
        assert_eq!(order, vec!["slow first", "second", "third"]);
    }

    /// A failed synthesis degrades silently: the sentence is skipped, later
    /// sentences still play, and the queue returns to idle.
    #[tokio::test]
    async fn synthesis_failure_skips_only_that_sentence() {
        let (queue, played) = make_queue();

        queue.enqueue("one".into());
        queue.enqueue("fail here".into());
        queue.enqueue("three".into());

        wait_until_idle(&queue).await;

        let order: Vec<String> = played.lock().unwrap().iter().map(sentence_of).collect();
        assert_eq!(order, vec!["one", "three"]);
    }

    /// The queue reports Loading from enqueue until playback completes, then
    /// Idle.
    #[tokio::test]
    async fn busy_until_drained_then_idle() {
        let (queue, _played) = make_queue();
        assert!(!queue.is_busy());

        queue.enqueue("a sentence".into());
        assert!(queue.is_busy());

        wait_until_idle(&queue).await;
        assert!(!queue.is_busy());
    }

    /// A drain that finished is restarted by the next enqueue.
    #[tokio::test]
    async fn sequential_batches_both_play() {
        let (queue, played) = make_queue();

        queue.enqueue("batch one".into());
        wait_until_idle(&queue).await;

        queue.enqueue("batch two".into());
        wait_until_idle(&queue).await;

        let order: Vec<String> = played.lock().unwrap().iter().map(sentence_of).collect();
        assert_eq!(order, vec!["batch one", "batch two"]);
    }

    /// `clear_pending` drops queued sentences (manual playback path) and the
    /// queue still reaches idle.
    #[tokio::test]
    async fn clear_pending_drops_unplayed_sentences() {
        let (queue, played) = make_queue();

        queue.enqueue("slow opener".into());
        queue.enqueue("never played".into());
        queue.enqueue("also dropped".into());

        // Clear while the opener is still in synthesis; the pending slots go.
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.clear_pending();
        queue.enqueue("manual replacement".into());

        wait_until_idle(&queue).await;

        let order: Vec<String> = played.lock().unwrap().iter().map(sentence_of).collect();
        assert_eq!(order, vec!["manual replacement"]);
    }
}
