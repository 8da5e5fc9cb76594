use crate::queue::SharedQueue;
use crate::sink::OutputSink;
use readalong_foundation::{AudioError, SharedPlaybackClock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Observer events for playback progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Periodic position update while playing.
    Position(u64),
    /// The cursor consumed the whole queue after end-of-input was marked.
    Ended,
}

/// Streaming playback controller.
///
/// Owns the session's append-only sample queue and the output device
/// handle. All offsets live in the sample domain; `position_ms` converts
/// at the boundary, so long sessions accumulate no floating-point drift.
/// Position is monotonic while playing, frozen across pause, and
/// continuous across pause → resume with no intervening enqueue.
pub struct PlaybackController<S: OutputSink> {
    sink: S,
    queue: Arc<SharedQueue>,
    events_tx: mpsc::UnboundedSender<PlaybackEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<PlaybackEvent>>,
    monitor: Option<JoinHandle<()>>,
    position_update_ms: u64,
    playing: bool,
    paused: bool,
}

impl<S: OutputSink> PlaybackController<S> {
    pub fn new(sink: S) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            sink,
            queue: Arc::new(SharedQueue::new()),
            events_tx,
            events_rx: Some(events_rx),
            monitor: None,
            position_update_ms: 250,
            playing: false,
            paused: false,
        }
    }

    pub fn with_position_update_interval(mut self, ms: u64) -> Self {
        self.position_update_ms = ms.max(1);
        self
    }

    /// Take the observer channel. Yields `None` after the first call.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<PlaybackEvent>> {
        self.events_rx.take()
    }

    /// Append samples to the session queue. Safe at any time: the sink
    /// pulls from the growing buffer at its cursor, so samples arriving
    /// mid-playback are heard in order without restarting output.
    pub fn enqueue(&self, samples: &[f32]) {
        self.queue.append(samples);
        tracing::trace!(
            target: "audio",
            "Enqueued {} samples (queue: {})",
            samples.len(),
            self.queue.len()
        );
    }

    /// Start (or resume) output. Device acquisition happens here and may
    /// fail recoverably; the caller retries on the next explicit play.
    pub fn play(&mut self) -> Result<(), AudioError> {
        if self.playing && !self.paused {
            return Ok(());
        }
        if self.paused {
            self.resume();
            return Ok(());
        }

        let rate = self.sink.start(self.queue.clone())?;
        self.queue.set_sample_rate(rate);
        self.queue.set_playing(true);
        self.playing = true;
        self.paused = false;
        self.spawn_monitor();
        tracing::info!(target: "audio", "Playback started at {} Hz", rate);
        Ok(())
    }

    /// Freeze the position exactly where the sink's own consumption left
    /// it. The sink keeps running and emits silence; no buffered tail
    /// plays on.
    pub fn pause(&mut self) {
        if !self.playing || self.paused {
            return;
        }
        self.queue.set_playing(false);
        self.paused = true;
        tracing::info!(target: "audio", "Paused at {} ms", self.position_ms());
    }

    /// Continue from the frozen cursor against the possibly-larger queue.
    pub fn resume(&mut self) {
        if !self.paused {
            return;
        }
        self.queue.set_playing(true);
        self.paused = false;
        tracing::info!(target: "audio", "Resumed at {} ms", self.position_ms());
    }

    /// Clear the queue and all position state. Idempotent; `position_ms`
    /// reads 0 immediately after.
    pub fn stop(&mut self) {
        self.queue.clear();
        self.sink.stop();
        if let Some(monitor) = self.monitor.take() {
            monitor.abort();
        }
        if self.playing || self.paused {
            tracing::info!(target: "audio", "Playback stopped");
        }
        self.playing = false;
        self.paused = false;
    }

    /// No further enqueues will arrive; the `Ended` event fires once the
    /// cursor drains the queue.
    pub fn mark_end_of_input(&self) {
        self.queue.mark_end_of_input();
    }

    pub fn position_ms(&self) -> u64 {
        self.queue.position_ms()
    }

    pub fn is_playing(&self) -> bool {
        self.playing && !self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn sample_rate(&self) -> u32 {
        self.queue.sample_rate()
    }

    /// Live position source for the highlight scheduler.
    pub fn clock(&self) -> SharedPlaybackClock {
        self.queue.clone()
    }

    fn spawn_monitor(&mut self) {
        if self.monitor.is_some() {
            return;
        }
        let queue = self.queue.clone();
        let tx = self.events_tx.clone();
        let period = Duration::from_millis(self.position_update_ms);
        self.monitor = Some(tokio::spawn(async move {
            let mut ended_sent = false;
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if tx.is_closed() {
                    break;
                }
                if queue.is_playing() {
                    let _ = tx.send(PlaybackEvent::Position(queue.position_ms()));
                }
                if queue.reached_end() && !ended_sent {
                    ended_sent = true;
                    let _ = tx.send(PlaybackEvent::Ended);
                }
            }
        }));
    }
}

impl<S: OutputSink> Drop for PlaybackController<S> {
    fn drop(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.abort();
        }
        self.sink.stop();
    }
}
