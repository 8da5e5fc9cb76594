pub mod clock;
pub mod error;
pub mod state;

pub use clock::{ManualClock, PlaybackClock, SharedPlaybackClock};
pub use error::{AudioError, ReadalongError, SessionError};
pub use state::{PlaybackState, StateTracker};
