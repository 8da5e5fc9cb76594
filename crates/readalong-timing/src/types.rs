use serde::{Deserialize, Serialize};

/// Timing record for one spoken word.
///
/// Indices are global across the session, contiguous from zero. For
/// adjacent words within a chunk, `end_ms(i) == start_ms(i + 1)` — the
/// estimated timeline has no gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub index: usize,
}

impl WordTiming {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// Result of estimating one chunk.
///
/// `degraded` marks chunks where the phoneme groups did not align 1:1 with
/// words and the estimator fell back to equal time division. Expected to
/// happen occasionally; never an error.
#[derive(Debug, Clone, Default)]
pub struct EstimateReport {
    pub timings: Vec<WordTiming>,
    pub degraded: bool,
}
