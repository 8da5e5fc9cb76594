//! Word timing estimation.
//!
//! Converts one generated chunk (spoken text + phonetic transcription +
//! audio duration) into per-word time offsets. Phoneme symbol count per
//! word, not orthographic length, is the duration proxy.

pub mod estimator;
pub mod types;

pub use estimator::{chunk_duration_ms, estimate};
pub use types::{EstimateReport, WordTiming};
