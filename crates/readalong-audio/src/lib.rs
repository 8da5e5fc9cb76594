//! Audio playback for readalong.
//!
//! One append-only sample queue per session, consumed by a pull-model
//! output sink. Position is derived from samples the sink has actually
//! consumed, kept in the sample domain and converted to milliseconds only
//! at the interface boundary.

pub mod controller;
pub mod queue;
pub mod sink;

pub use controller::{PlaybackController, PlaybackEvent};
pub use queue::SharedQueue;
pub use sink::{CpalSink, ManualSink, OutputSink};
