//! Session orchestration.
//!
//! The orchestrator owns the one playback session: it acquires text,
//! streams generated speech chunks into the playback controller and the
//! timing estimator, and drives the highlight scheduler. Collaborators
//! live behind channels and traits — no shared globals, so the state
//! machine is testable with fakes.

pub mod collaborators;
pub mod config;
pub mod messages;
pub mod orchestrator;

pub use collaborators::{Extraction, SpeechGenerator, TextExtractor};
pub use config::SessionConfig;
pub use messages::{
    ControlMsg, DisplayCommand, GenerateRequest, GenerationChunk, GenerationEvent,
};
pub use orchestrator::{PlaybackOrchestrator, SessionHandle};
