use parking_lot::{Mutex, RwLock};
use readalong_foundation::SharedPlaybackClock;
use readalong_timing::WordTiming;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// The live, growing timing sequence. Owned by the orchestrator; the
/// scheduler only reads it.
pub type SharedTimings = Arc<RwLock<Vec<WordTiming>>>;

/// Events emitted toward the display (words, scrolls) and the
/// orchestrator (completion).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HighlightEvent {
    Word { index: usize },
    Scroll { index: usize },
    Complete,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How far a highlight precedes its word's spoken start, absorbing
    /// message-passing and rendering latency.
    pub lead_ms: u64,
    /// Scroll cadence in words.
    pub scroll_every: usize,
    /// Suppress scrolls this long after a user-initiated scroll.
    pub scroll_debounce: Duration,
    /// Poll interval when the schedule has caught up with a still-open
    /// generation stream.
    pub catchup_poll: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lead_ms: 50,
            scroll_every: 10,
            scroll_debounce: Duration::from_secs(2),
            catchup_poll: Duration::from_millis(25),
        }
    }
}

/// Schedules highlight events against a live playback clock.
///
/// Cancellation is cooperative: `cancel` (and every restart) bumps an
/// epoch, and the session's generation id is captured at start time; both
/// are re-checked at fire time, so an event whose wait was already in
/// flight when the schedule was superseded is suppressed, never
/// delivered. The task abort is only a fast path — the guard is the
/// correctness mechanism.
pub struct HighlightScheduler {
    config: SchedulerConfig,
    clock: SharedPlaybackClock,
    timings: SharedTimings,
    live_generation: Arc<AtomicU64>,
    stream_complete: Arc<AtomicBool>,
    epoch: Arc<AtomicU64>,
    last_user_scroll: Arc<Mutex<Option<Instant>>>,
    events_tx: mpsc::UnboundedSender<HighlightEvent>,
    task: Option<JoinHandle<()>>,
}

impl HighlightScheduler {
    pub fn new(
        clock: SharedPlaybackClock,
        timings: SharedTimings,
        live_generation: Arc<AtomicU64>,
        stream_complete: Arc<AtomicBool>,
        config: SchedulerConfig,
    ) -> (Self, mpsc::UnboundedReceiver<HighlightEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (
            Self {
                config,
                clock,
                timings,
                live_generation,
                stream_complete,
                epoch: Arc::new(AtomicU64::new(0)),
                last_user_scroll: Arc::new(Mutex::new(None)),
                events_tx,
                task: None,
            },
            events_rx,
        )
    }

    /// Begin (or restart) scheduling from `from_index` under
    /// `generation_id`. Any previous schedule is superseded first.
    pub fn start(&mut self, from_index: usize, generation_id: u64) {
        self.cancel();
        let my_epoch = self.epoch.load(Ordering::Acquire);

        let config = self.config.clone();
        let clock = self.clock.clone();
        let timings = self.timings.clone();
        let live_generation = self.live_generation.clone();
        let stream_complete = self.stream_complete.clone();
        let epoch = self.epoch.clone();
        let last_user_scroll = self.last_user_scroll.clone();
        let tx = self.events_tx.clone();

        tracing::debug!(
            target: "scheduler",
            "Schedule starting at word {} (generation {})",
            from_index,
            generation_id
        );

        self.task = Some(tokio::spawn(async move {
            let guard_ok = || {
                epoch.load(Ordering::Acquire) == my_epoch
                    && live_generation.load(Ordering::Acquire) == generation_id
            };
            let scroll_suppressed = || {
                last_user_scroll
                    .lock()
                    .map(|at| at.elapsed() < config.scroll_debounce)
                    .unwrap_or(false)
            };
            let send_scroll = |index: usize| {
                if scroll_suppressed() {
                    tracing::trace!(target: "scheduler", "Scroll suppressed at word {}", index);
                } else {
                    let _ = tx.send(HighlightEvent::Scroll { index });
                }
            };
            let mut index = from_index;
            let mut fired = 0u64;

            // Re-center the view immediately on a (re)start, before any
            // wait — a resume mid-word must not leave the view stale for
            // the word's remaining duration. If the sequence has not
            // reached `from_index` yet, the scroll rides the first fire.
            let mut scroll_pending = true;
            if guard_ok() && timings.read().get(from_index).is_some() {
                send_scroll(from_index);
                scroll_pending = false;
            }

            loop {
                if !guard_ok() {
                    tracing::debug!(target: "scheduler", "Schedule superseded before word {}", index);
                    break;
                }

                let timing = { timings.read().get(index).cloned() };
                let Some(timing) = timing else {
                    if stream_complete.load(Ordering::Acquire) {
                        // The last fire led its word by lead_ms; hold the
                        // completion report until the audio itself has
                        // drained past the final word's end.
                        let last_end =
                            { timings.read().last().map(|t| t.end_ms).unwrap_or(0) };
                        loop {
                            if !guard_ok() {
                                return;
                            }
                            let remaining = last_end.saturating_sub(clock.position_ms());
                            if remaining == 0 {
                                break;
                            }
                            tokio::time::sleep(Duration::from_millis(remaining)).await;
                        }
                        if guard_ok() {
                            tracing::info!(
                                target: "scheduler",
                                "Schedule complete after {} highlights",
                                fired
                            );
                            let _ = tx.send(HighlightEvent::Complete);
                        }
                        break;
                    }
                    // Caught up with a still-open stream; the sequence is
                    // live and growing, so wait briefly and re-read.
                    tokio::time::sleep(config.catchup_poll).await;
                    continue;
                };

                let target = timing.start_ms.saturating_sub(config.lead_ms);
                let delay = target.saturating_sub(clock.position_ms());
                if delay > 0 {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }

                // Fire-time guard: the wait itself may not be abortable
                // across contexts, so the check happens here.
                if !guard_ok() {
                    tracing::debug!(target: "scheduler", "Suppressed in-flight fire for word {}", index);
                    break;
                }

                if tx.send(HighlightEvent::Word { index }).is_err() {
                    break;
                }
                fired += 1;

                if scroll_pending {
                    send_scroll(index);
                    scroll_pending = false;
                } else if config.scroll_every > 0
                    && index > from_index
                    && (index - from_index) % config.scroll_every == 0
                {
                    send_scroll(index);
                }

                index += 1;
            }
        }));
    }

    /// Guarantee no further fires, including any already in flight.
    pub fn cancel(&mut self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// The display reported a user-initiated scroll; hold off automatic
    /// scrolling for the debounce window so we don't fight the reader.
    pub fn note_user_scroll(&self) {
        *self.last_user_scroll.lock() = Some(Instant::now());
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for HighlightScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
