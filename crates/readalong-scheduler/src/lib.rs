//! Highlight scheduling.
//!
//! Fires word-boundary events against the live audio clock with lead-time
//! compensation. Reschedule-on-fire: every delay is recomputed from the
//! current position, never from accumulated expected time, so estimation
//! error cannot drift additively over a long article.

pub mod scheduler;

pub use scheduler::{HighlightEvent, HighlightScheduler, SchedulerConfig, SharedTimings};
