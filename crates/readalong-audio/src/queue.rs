use parking_lot::RwLock;
use readalong_foundation::PlaybackClock;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

/// Append-only sample queue shared between the controller and the output
/// sink callback.
///
/// The callback consumes at `cursor` and advances it; `append` only grows
/// the buffer, so samples arriving mid-playback splice in without
/// restarting output or re-playing anything already heard. While the
/// `playing` flag is clear the callback emits silence and leaves the
/// cursor untouched, which is exactly the pause-freeze contract.
pub struct SharedQueue {
    samples: RwLock<Vec<f32>>,
    cursor: AtomicU64,
    playing: AtomicBool,
    sample_rate: AtomicU32,
    end_of_input: AtomicBool,
    reached_end: AtomicBool,
}

impl Default for SharedQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedQueue {
    pub fn new() -> Self {
        Self {
            samples: RwLock::new(Vec::new()),
            cursor: AtomicU64::new(0),
            playing: AtomicBool::new(false),
            sample_rate: AtomicU32::new(0),
            end_of_input: AtomicBool::new(false),
            reached_end: AtomicBool::new(false),
        }
    }

    pub fn append(&self, samples: &[f32]) {
        self.samples.write().extend_from_slice(samples);
    }

    pub fn len(&self) -> usize {
        self.samples.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.read().is_empty()
    }

    pub fn cursor(&self) -> u64 {
        self.cursor.load(Ordering::Acquire)
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Release);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    pub fn set_sample_rate(&self, rate: u32) {
        self.sample_rate.store(rate, Ordering::Release);
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Acquire)
    }

    pub fn mark_end_of_input(&self) {
        self.end_of_input.store(true, Ordering::Release);
    }

    /// True once the cursor has consumed the whole queue after
    /// `mark_end_of_input`.
    pub fn reached_end(&self) -> bool {
        self.reached_end.load(Ordering::Acquire)
    }

    /// Reset all per-session state. Position reads 0 afterwards.
    pub fn clear(&self) {
        self.samples.write().clear();
        self.cursor.store(0, Ordering::Release);
        self.playing.store(false, Ordering::Release);
        self.end_of_input.store(false, Ordering::Release);
        self.reached_end.store(false, Ordering::Release);
    }

    /// Advance the cursor by up to `max` samples, honoring the playing
    /// flag and the queue length. Returns the number consumed. This is the
    /// single consumption path for real and manual sinks.
    pub fn consume(&self, max: usize) -> usize {
        if !self.is_playing() {
            return 0;
        }
        let len = self.len() as u64;
        let cursor = self.cursor.load(Ordering::Acquire);
        let take = (len.saturating_sub(cursor)).min(max as u64);
        if take > 0 {
            self.cursor.store(cursor + take, Ordering::Release);
        }
        if self.end_of_input.load(Ordering::Acquire) && cursor + take >= len {
            self.reached_end.store(true, Ordering::Release);
        }
        take as usize
    }

    /// Fill an interleaved output buffer from the cursor, expanding mono
    /// samples across `channels`, zero-padding past the queue tail. Runs on
    /// the device callback thread.
    pub fn fill_output(&self, out: &mut [f32], channels: usize) {
        debug_assert!(channels > 0);
        // Zero everything first so a partial trailing frame (buffer length
        // not a multiple of the channel count) never carries stale data.
        out.fill(0.0);
        if !self.is_playing() {
            return;
        }
        let frames = out.len() / channels;
        let cursor = self.cursor.load(Ordering::Acquire) as usize;
        {
            let samples = self.samples.read();
            for frame in 0..frames {
                let value = samples.get(cursor + frame).copied().unwrap_or(0.0);
                let base = frame * channels;
                for ch in 0..channels {
                    out[base + ch] = value;
                }
            }
        }
        self.consume(frames);
    }

    pub fn position_ms(&self) -> u64 {
        let rate = self.sample_rate();
        if rate == 0 {
            return 0;
        }
        (self.cursor() * 1000) / rate as u64
    }
}

impl PlaybackClock for SharedQueue {
    fn position_ms(&self) -> u64 {
        SharedQueue::position_ms(self)
    }
}
