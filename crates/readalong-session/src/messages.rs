//! Cross-context message contract.
//!
//! One tagged union per concern; message passing is asynchronous and
//! at-least-once, FIFO only within a channel, so every payload is
//! self-contained.

use readalong_foundation::PlaybackState;
use serde::{Deserialize, Serialize};

/// UI → orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMsg {
    Play,
    Pause,
    Stop,
    /// The display reported a user-initiated scroll; automatic scrolling
    /// backs off for the debounce window.
    UserScrolled,
}

/// One unit of streamed generation output, typically one sentence.
#[derive(Debug, Clone)]
pub struct GenerationChunk {
    /// Mono audio samples at the session sample rate.
    pub samples: Vec<f32>,
    /// Whitespace-separated phoneme groups, one per word of `source_text`.
    pub phonemes: String,
    /// The text span this chunk speaks.
    pub source_text: String,
}

/// Generation collaborator → orchestrator.
#[derive(Debug, Clone)]
pub enum GenerationEvent {
    Chunk(GenerationChunk),
    Complete,
    Error { code: String, message: String },
}

/// Orchestrator → generation collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub text: String,
    pub voice_id: String,
    pub speed: f32,
}

/// Orchestrator/scheduler → UI and display sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DisplayCommand {
    HighlightWord {
        index: usize,
    },
    HighlightScroll {
        index: usize,
    },
    HighlightReset,
    StateChanged {
        state: PlaybackState,
        word_index: Option<usize>,
    },
    /// Terminal session failure, for the UI to surface as it sees fit.
    SessionError {
        code: String,
        message: String,
        recoverable: bool,
    },
}
