//! Phoneme-weighted per-word timing estimator. Pure, no state, no I/O.

use crate::types::{EstimateReport, WordTiming};

/// Stress and length marks stripped before counting phoneme symbols:
/// IPA primary/secondary stress, long/half-long, syllabic and nasal
/// combining marks, the linking tie, and the syllable separator dot.
const PHONEME_DIACRITICS: &[char] = &['ˈ', 'ˌ', 'ː', 'ˑ', '\u{0329}', '\u{0303}', '‿', '.'];

/// Duration of a chunk given its sample count and the session sample rate.
pub fn chunk_duration_ms(sample_count: usize, sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    (sample_count as u64 * 1000) / sample_rate as u64
}

/// Estimate per-word timings for one chunk.
///
/// `phonemes` is whitespace-split into one group per word; groups are
/// expected to align 1:1 with the whitespace-split words of `text` (the
/// generation collaborator's contract for the chunk). Each word gets
/// `(its phoneme symbols / total symbols) * chunk_duration_ms`, chained
/// with zero gaps from the chunk-local origin, then re-based onto the
/// session timeline by `time_offset_ms`. Indices continue from
/// `word_index_offset`.
///
/// Misaligned or symbol-free chunks fall back to equal time division;
/// misalignment additionally marks the report degraded. Never fails.
pub fn estimate(
    text: &str,
    phonemes: &str,
    chunk_duration_ms: u64,
    word_index_offset: usize,
    time_offset_ms: u64,
) -> EstimateReport {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return EstimateReport::default();
    }

    let groups: Vec<&str> = phonemes.split_whitespace().collect();
    if groups.len() != words.len() {
        tracing::warn!(
            target: "timing",
            "Phoneme group count {} != word count {}; falling back to equal split",
            groups.len(),
            words.len()
        );
        let mut report = equal_split(&words, chunk_duration_ms, word_index_offset, time_offset_ms);
        report.degraded = true;
        return report;
    }

    let counts: Vec<u64> = groups.iter().map(|g| phoneme_symbol_count(g)).collect();
    let total: u64 = counts.iter().sum();
    if total == 0 {
        // Punctuation-only chunk, or every symbol was a stripped mark.
        tracing::debug!(
            target: "timing",
            "Chunk has no phoneme symbols across {} words; using equal split",
            words.len()
        );
        return equal_split(&words, chunk_duration_ms, word_index_offset, time_offset_ms);
    }

    // Chain end times from the cumulative symbol count so rounding never
    // accumulates; the final word lands on the chunk duration exactly.
    let mut timings = Vec::with_capacity(words.len());
    let mut cumulative = 0u64;
    let mut prev_end = 0u64;
    for (i, (word, count)) in words.iter().zip(counts.iter()).enumerate() {
        cumulative += count;
        let end = if i + 1 == words.len() {
            chunk_duration_ms
        } else {
            (cumulative * chunk_duration_ms) / total
        };
        timings.push(WordTiming {
            word: (*word).to_string(),
            start_ms: time_offset_ms + prev_end,
            end_ms: time_offset_ms + end,
            index: word_index_offset + i,
        });
        prev_end = end;
    }

    EstimateReport {
        timings,
        degraded: false,
    }
}

fn phoneme_symbol_count(group: &str) -> u64 {
    group
        .chars()
        .filter(|c| !PHONEME_DIACRITICS.contains(c))
        .count() as u64
}

fn equal_split(
    words: &[&str],
    chunk_duration_ms: u64,
    word_index_offset: usize,
    time_offset_ms: u64,
) -> EstimateReport {
    let n = words.len() as u64;
    let mut timings = Vec::with_capacity(words.len());
    let mut prev_end = 0u64;
    for (i, word) in words.iter().enumerate() {
        let end = ((i as u64 + 1) * chunk_duration_ms) / n;
        timings.push(WordTiming {
            word: (*word).to_string(),
            start_ms: time_offset_ms + prev_end,
            end_ms: time_offset_ms + end,
            index: word_index_offset + i,
        });
        prev_end = end;
    }
    EstimateReport {
        timings,
        degraded: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn two_words_split_by_phoneme_weight() {
        // 4 + 4 symbols over 1000ms: 500ms each.
        let report = estimate("Hello world.", "hɛˈlo wɜːld", 1000, 0, 0);
        assert!(!report.degraded);
        assert_eq!(report.timings.len(), 2);
        assert_eq!(report.timings[0].start_ms, 0);
        assert_eq!(report.timings[0].end_ms, 500);
        assert_eq!(report.timings[1].start_ms, 500);
        assert_eq!(report.timings[1].end_ms, 1000);
    }

    #[test]
    fn stress_and_length_marks_do_not_count() {
        assert_eq!(phoneme_symbol_count("hɛˈlo"), 4);
        assert_eq!(phoneme_symbol_count("wɜːld"), 4);
        assert_eq!(phoneme_symbol_count("ˈˌːˑ"), 0);
    }

    #[test]
    fn uneven_weights_bias_longer_words() {
        // 2 vs 6 symbols over 800ms -> 200ms / 600ms.
        let report = estimate("is remarkable", "ɪz ɹɪmɑːɹk", 800, 0, 0);
        assert_eq!(report.timings[0].end_ms, 200);
        assert_eq!(report.timings[1].start_ms, 200);
        assert_eq!(report.timings[1].end_ms, 800);
    }

    #[test]
    fn last_word_absorbs_rounding() {
        let report = estimate("one two three", "a b c", 1000, 0, 0);
        assert_eq!(report.timings.last().unwrap().end_ms, 1000);
        let total: u64 = report.timings.iter().map(|t| t.duration_ms()).sum();
        assert_eq!(total, 1000);
    }

    #[test]
    fn group_count_mismatch_degrades_to_equal_split() {
        let report = estimate("one two three", "wʌn tuː", 900, 0, 0);
        assert!(report.degraded);
        assert_eq!(report.timings.len(), 3);
        assert_eq!(report.timings[0].end_ms, 300);
        assert_eq!(report.timings[1].end_ms, 600);
        assert_eq!(report.timings[2].end_ms, 900);
    }

    #[test]
    fn symbol_free_chunk_falls_back_without_degrading() {
        let report = estimate("— …", "ˈ ˌ", 400, 0, 0);
        assert!(!report.degraded);
        assert_eq!(report.timings.len(), 2);
        assert_eq!(report.timings[0].end_ms, 200);
        assert_eq!(report.timings[1].end_ms, 400);
    }

    #[test]
    fn empty_text_yields_empty_report() {
        let report = estimate("   ", "", 500, 0, 0);
        assert!(report.timings.is_empty());
    }

    #[test]
    fn offsets_rebase_onto_session_timeline() {
        let report = estimate("next chunk", "ab cd", 600, 7, 2400);
        assert_eq!(report.timings[0].index, 7);
        assert_eq!(report.timings[1].index, 8);
        assert_eq!(report.timings[0].start_ms, 2400);
        assert_eq!(report.timings[1].end_ms, 3000);
    }

    #[test]
    fn chunk_duration_from_samples() {
        assert_eq!(chunk_duration_ms(24000, 24000), 1000);
        assert_eq!(chunk_duration_ms(12000, 24000), 500);
        assert_eq!(chunk_duration_ms(0, 24000), 0);
        assert_eq!(chunk_duration_ms(100, 0), 0);
    }

    proptest! {
        #[test]
        fn timeline_is_contiguous_and_conserves_duration(
            words in proptest::collection::vec("[a-z]{1,10}", 1..20),
            duration in 1u64..120_000,
            offset in 0u64..1_000_000,
            index_offset in 0usize..10_000,
        ) {
            // Phoneme groups mirror the words so counts align 1:1.
            let text = words.join(" ");
            let report = estimate(&text, &text, duration, index_offset, offset);

            prop_assert_eq!(report.timings.len(), words.len());
            prop_assert_eq!(report.timings[0].start_ms, offset);
            prop_assert_eq!(report.timings.last().unwrap().end_ms, offset + duration);
            for pair in report.timings.windows(2) {
                prop_assert_eq!(pair[0].end_ms, pair[1].start_ms);
                prop_assert_eq!(pair[0].index + 1, pair[1].index);
            }
        }
    }
}
