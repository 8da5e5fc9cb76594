//! Collaborator seams.
//!
//! Extraction and generation live in other execution contexts; the
//! orchestrator sees them only through these traits. A lost collaborator
//! context surfaces as `SessionError::ContextLost` and is retried once
//! before becoming terminal.

use crate::messages::{GenerateRequest, GenerationEvent};
use async_trait::async_trait;
use readalong_foundation::SessionError;
use tokio::sync::mpsc;

/// Readable text pulled out of the current document.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub text: String,
    pub word_count: usize,
}

#[async_trait]
pub trait TextExtractor: Send {
    async fn extract(&mut self) -> Result<Extraction, SessionError>;
}

/// Opaque speech producer. Which backend synthesized a chunk is invisible
/// here; `backend_name` exists for diagnostics only.
#[async_trait]
pub trait SpeechGenerator: Send {
    async fn generate(
        &mut self,
        request: GenerateRequest,
    ) -> Result<mpsc::Receiver<GenerationEvent>, SessionError>;

    fn backend_name(&self) -> &str {
        "unknown"
    }
}
