use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReadalongError {
    #[error("Audio subsystem error: {0}")]
    Audio(#[from] AudioError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Output device unavailable: {reason}")]
    DeviceUnavailable { reason: String },

    #[error("Format not supported: {format}")]
    FormatNotSupported { format: String },

    #[error("Build stream error: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Play stream error: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Default stream config error: {0}")]
    DefaultStreamConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("Fatal audio error: {0}")]
    Fatal(String),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Speech model unavailable: {message}")]
    ModelUnavailable { message: String },

    #[error("Text extraction failed: {message}")]
    ExtractionFailed { message: String },

    #[error("Generation failed [{code}]: {message}")]
    Generation { code: String, message: String },

    #[error("Collaborator context lost: {collaborator}")]
    ContextLost { collaborator: String },

    #[error("Phoneme groups do not align with words ({groups} groups, {words} words)")]
    TimingMismatch { groups: usize, words: usize },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

impl ReadalongError {
    /// Machine-readable code for host/UI consumption.
    pub fn code(&self) -> &'static str {
        match self {
            ReadalongError::Audio(AudioError::DeviceUnavailable { .. }) => "device_unavailable",
            ReadalongError::Audio(AudioError::FormatNotSupported { .. }) => "format_unsupported",
            ReadalongError::Audio(_) => "audio_failure",
            ReadalongError::Session(SessionError::ModelUnavailable { .. }) => "model_unavailable",
            ReadalongError::Session(SessionError::ExtractionFailed { .. }) => "extraction_failed",
            ReadalongError::Session(SessionError::Generation { .. }) => "generation_failed",
            ReadalongError::Session(SessionError::ContextLost { .. }) => "context_lost",
            ReadalongError::Session(SessionError::TimingMismatch { .. }) => "timing_mismatch",
            ReadalongError::Session(SessionError::InvalidTransition { .. }) => {
                "invalid_transition"
            }
        }
    }

    /// Originating subsystem tag.
    pub fn subsystem(&self) -> &'static str {
        match self {
            ReadalongError::Audio(_) => "audio",
            ReadalongError::Session(SessionError::ExtractionFailed { .. }) => "extraction",
            ReadalongError::Session(SessionError::TimingMismatch { .. }) => "timing",
            ReadalongError::Session(SessionError::ModelUnavailable { .. })
            | ReadalongError::Session(SessionError::Generation { .. })
            | ReadalongError::Session(SessionError::ContextLost { .. }) => "generation",
            ReadalongError::Session(_) => "session",
        }
    }

    /// Whether the caller may retry without tearing the session down for good.
    ///
    /// Device acquisition is retried on the next explicit play request;
    /// a lost collaborator context is reacquired and retried once; a timing
    /// mismatch is recovered inside the estimator via equal-split fallback.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ReadalongError::Audio(AudioError::DeviceUnavailable { .. })
                | ReadalongError::Session(SessionError::ContextLost { .. })
                | ReadalongError::Session(SessionError::TimingMismatch { .. })
        )
    }
}
