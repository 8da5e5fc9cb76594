//! Demo collaborators: a fixed-document extractor and a tone-burst
//! speech generator. They exist so the session pipeline can run end to
//! end on any machine with an output device, no speech model required.

use async_trait::async_trait;
use readalong_foundation::SessionError;
use readalong_session::{
    Extraction, GenerateRequest, GenerationChunk, GenerationEvent, SpeechGenerator, TextExtractor,
};
use std::time::Duration;
use tokio::sync::mpsc;

/// Serves one in-memory document.
pub struct DocumentExtractor {
    text: String,
}

impl DocumentExtractor {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl TextExtractor for DocumentExtractor {
    async fn extract(&mut self) -> Result<Extraction, SessionError> {
        let text = self.text.trim().to_string();
        if text.is_empty() {
            return Err(SessionError::ExtractionFailed {
                message: "document contains no readable text".to_string(),
            });
        }
        let word_count = text.split_whitespace().count();
        Ok(Extraction { text, word_count })
    }
}

/// Per-word synthesis pace at speed 1.0.
const MS_PER_WORD: u64 = 300;
/// Pause between streamed sentences, mimicking a real backend.
const INTER_CHUNK_DELAY: Duration = Duration::from_millis(40);

/// Synthesizes each sentence as a run of sine bursts, one per word, and
/// streams the sentences as chunks. Phoneme groups are a naive
/// letters-only stand-in with the right shape: one whitespace-separated
/// group per word.
pub struct ToneGenerator {
    sample_rate: u32,
}

impl ToneGenerator {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    fn render_sentence(&self, sentence: &str, speed: f32) -> GenerationChunk {
        let words: Vec<&str> = sentence.split_whitespace().collect();
        let word_ms = (MS_PER_WORD as f32 / speed.max(0.25)) as u64;
        let samples_per_word = (self.sample_rate as u64 * word_ms / 1000) as usize;

        let mut samples = Vec::with_capacity(samples_per_word * words.len());
        for (i, _) in words.iter().enumerate() {
            // Step the pitch per word so the highlight sync is audible.
            let freq = 220.0 + 40.0 * (i % 5) as f32;
            let step = std::f32::consts::TAU * freq / self.sample_rate as f32;
            let voiced = (samples_per_word * 4) / 5;
            for n in 0..samples_per_word {
                if n < voiced {
                    // Short attack/release ramp to avoid clicks.
                    let edge = voiced.saturating_sub(n).min(n).min(200) as f32 / 200.0;
                    samples.push((step * n as f32).sin() * 0.2 * edge);
                } else {
                    samples.push(0.0);
                }
            }
        }

        let phonemes = words
            .iter()
            .map(|w| naive_phonemes(w))
            .collect::<Vec<_>>()
            .join(" ");
        GenerationChunk {
            samples,
            phonemes,
            source_text: sentence.to_string(),
        }
    }
}

#[async_trait]
impl SpeechGenerator for ToneGenerator {
    async fn generate(
        &mut self,
        request: GenerateRequest,
    ) -> Result<mpsc::Receiver<GenerationEvent>, SessionError> {
        let sentences = split_sentences(&request.text);
        if sentences.is_empty() {
            return Err(SessionError::Generation {
                code: "empty_request".to_string(),
                message: "no sentences to synthesize".to_string(),
            });
        }

        let chunks: Vec<GenerationChunk> = sentences
            .iter()
            .map(|s| self.render_sentence(s, request.speed))
            .collect();
        tracing::debug!(
            target: "demo",
            "Synthesizing {} sentences (voice {}, speed {})",
            chunks.len(),
            request.voice_id,
            request.speed
        );

        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            for chunk in chunks {
                if tx.send(GenerationEvent::Chunk(chunk)).await.is_err() {
                    return;
                }
                tokio::time::sleep(INTER_CHUNK_DELAY).await;
            }
            let _ = tx.send(GenerationEvent::Complete).await;
        });
        Ok(rx)
    }

    fn backend_name(&self) -> &str {
        "tone-demo"
    }
}

/// Sentence boundaries at ., !, ? — terminators stay with their
/// sentence, and a trailing fragment without one still counts.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    sentences
}

fn naive_phonemes(word: &str) -> String {
    let letters: String = word
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(|c| c.to_lowercase())
        .collect();
    if letters.is_empty() {
        // Punctuation-only tokens still need a group of their own.
        "ə".to_string()
    } else {
        letters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_sentences_keeping_terminators() {
        let sentences = split_sentences("One two. Three! Four");
        assert_eq!(sentences, vec!["One two.", "Three!", "Four"]);
    }

    #[test]
    fn phoneme_groups_match_word_count() {
        let generator = ToneGenerator::new(8000);
        let chunk = generator.render_sentence("Hello, world - again.", 1.0);
        assert_eq!(
            chunk.phonemes.split_whitespace().count(),
            chunk.source_text.split_whitespace().count()
        );
    }

    #[test]
    fn chunk_length_scales_with_speed() {
        let generator = ToneGenerator::new(8000);
        let normal = generator.render_sentence("one two three", 1.0);
        let fast = generator.render_sentence("one two three", 2.0);
        assert!(fast.samples.len() < normal.samples.len());
    }
}
