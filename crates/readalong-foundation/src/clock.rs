//! Playback clock seam.
//!
//! The highlight scheduler never reads wall-clock time; it reads the live
//! audio position through this trait, so the same scheduling code runs
//! against the real playback controller and against a manual clock in tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Source of the current playback position in milliseconds.
///
/// Implementations must be monotonic non-decreasing while playback is
/// running and frozen (not reset) while paused.
pub trait PlaybackClock: Send + Sync {
    fn position_ms(&self) -> u64;
}

pub type SharedPlaybackClock = Arc<dyn PlaybackClock>;

/// Manually-driven clock for deterministic tests.
pub struct ManualClock {
    position_ms: AtomicU64,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            position_ms: AtomicU64::new(0),
        }
    }

    pub fn set(&self, ms: u64) {
        self.position_ms.store(ms, Ordering::Release);
    }

    pub fn advance(&self, ms: u64) {
        self.position_ms.fetch_add(ms, Ordering::AcqRel);
    }
}

impl PlaybackClock for ManualClock {
    fn position_ms(&self) -> u64 {
        self.position_ms.load(Ordering::Acquire)
    }
}
