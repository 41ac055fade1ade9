//! Grouping of transcript words into caption cues.
//!
//! Cues are fixed-size chunks of consecutive words; there is no semantic
//! segmentation. A cue spans its first word's start to its last word's end,
//! shortened if needed so it never overlaps the next cue.

use reelforge_common::error::{ReelError, ReelResult};
use reelforge_project_model::narration::Word;
use serde::Serialize;

/// A word inside a cue, with its highlight window relative to the cue start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CueWord {
    pub text: String,
    pub start_secs: f64,
    pub end_secs: f64,
    /// Highlight start in milliseconds after the cue start.
    pub highlight_start_ms: u64,
    /// Highlight end in milliseconds after the cue start.
    pub highlight_end_ms: u64,
}

/// One on-screen caption.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptionCue {
    pub index: usize,
    pub start_secs: f64,
    pub end_secs: f64,
    pub words: Vec<CueWord>,
}

impl CaptionCue {
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }

    pub fn duration_ms(&self) -> u64 {
        secs_to_ms(self.duration_secs())
    }

    /// Words joined with single spaces.
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Ordered, non-overlapping caption cues for one narration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CaptionTimeline {
    pub words_per_cue: usize,
    pub cues: Vec<CaptionCue>,
}

impl CaptionTimeline {
    /// Group `words` into cues of `words_per_cue` (the last may be shorter).
    pub fn build(words: &[Word], words_per_cue: usize) -> ReelResult<Self> {
        if words_per_cue == 0 {
            return Err(ReelError::caption("words per cue must be at least 1"));
        }

        let groups: Vec<&[Word]> = words.chunks(words_per_cue).collect();
        let mut cues = Vec::with_capacity(groups.len());

        for (index, group) in groups.iter().enumerate() {
            let (Some(first), Some(last)) = (group.first(), group.last()) else {
                continue;
            };
            let start = first.start_secs.max(0.0);
            let mut end = last.end_secs.max(start);
            if let Some(next) = groups.get(index + 1).and_then(|g| g.first()) {
                end = end.min(next.start_secs).max(start);
            }

            let cue_ms = secs_to_ms(end - start);
            let cue_words = group
                .iter()
                .map(|w| {
                    let highlight_start_ms = secs_to_ms(w.start_secs - start).min(cue_ms);
                    let highlight_end_ms = secs_to_ms(w.end_secs - start)
                        .min(cue_ms)
                        .max(highlight_start_ms);
                    CueWord {
                        text: w.text.clone(),
                        start_secs: w.start_secs,
                        end_secs: w.end_secs,
                        highlight_start_ms,
                        highlight_end_ms,
                    }
                })
                .collect();

            cues.push(CaptionCue {
                index,
                start_secs: start,
                end_secs: end,
                words: cue_words,
            });
        }

        tracing::debug!(
            words = words.len(),
            words_per_cue,
            cues = cues.len(),
            "Caption timeline built"
        );

        Ok(Self {
            words_per_cue,
            cues,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn word_count(&self) -> usize {
        self.cues.iter().map(|c| c.words.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CaptionCue> {
        self.cues.iter()
    }
}

fn secs_to_ms(secs: f64) -> u64 {
    (secs.max(0.0) * 1000.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn spoken(n: usize) -> Vec<Word> {
        (0..n)
            .map(|i| Word::new(format!("w{i}"), i as f64 * 0.5, i as f64 * 0.5 + 0.4))
            .collect()
    }

    #[test]
    fn test_nine_words_three_per_cue() {
        let timeline = CaptionTimeline::build(&spoken(9), 3).unwrap();
        assert_eq!(timeline.len(), 3);
        for (i, cue) in timeline.iter().enumerate() {
            assert_eq!(cue.words.len(), 3);
            assert_eq!(cue.start_secs, cue.words[0].start_secs);
            assert_eq!(cue.end_secs, cue.words[2].end_secs);
            assert_eq!(cue.index, i);
        }
        assert_eq!(timeline.cues[1].text(), "w3 w4 w5");
    }

    #[test]
    fn test_highlight_windows_are_cue_relative() {
        let timeline = CaptionTimeline::build(&spoken(3), 3).unwrap();
        let windows: Vec<(u64, u64)> = timeline.cues[0]
            .words
            .iter()
            .map(|w| (w.highlight_start_ms, w.highlight_end_ms))
            .collect();
        assert_eq!(windows, vec![(0, 400), (500, 900), (1000, 1400)]);
    }

    #[test]
    fn test_last_cue_may_be_short() {
        let timeline = CaptionTimeline::build(&spoken(7), 3).unwrap();
        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline.cues[2].words.len(), 1);
    }

    #[test]
    fn test_zero_words_per_cue_is_rejected() {
        assert!(CaptionTimeline::build(&spoken(3), 0).is_err());
    }

    #[test]
    fn test_empty_transcript_yields_empty_timeline() {
        let timeline = CaptionTimeline::build(&[], 3).unwrap();
        assert!(timeline.is_empty());
    }

    #[test]
    fn test_overlapping_groups_are_clipped() {
        let words = vec![
            Word::new("one", 0.0, 1.2),
            Word::new("two", 1.0, 1.5),
        ];
        let timeline = CaptionTimeline::build(&words, 1).unwrap();
        assert_eq!(timeline.cues[0].end_secs, 1.0);
        assert_eq!(timeline.cues[0].words[0].highlight_end_ms, 1000);
    }

    proptest! {
        #[test]
        fn prop_cues_partition_words(
            gaps in prop::collection::vec((0.0f64..0.5, 0.01f64..1.0), 0..60),
            per_cue in 1usize..6,
        ) {
            let mut t = 0.0;
            let words: Vec<Word> = gaps
                .iter()
                .enumerate()
                .map(|(i, (gap, len))| {
                    let start = t + gap;
                    t = start + len;
                    Word::new(format!("w{i}"), start, t)
                })
                .collect();

            let timeline = CaptionTimeline::build(&words, per_cue).unwrap();
            prop_assert_eq!(timeline.len(), words.len().div_ceil(per_cue));
            prop_assert_eq!(timeline.word_count(), words.len());

            let flattened: Vec<&str> = timeline
                .iter()
                .flat_map(|c| c.words.iter().map(|w| w.text.as_str()))
                .collect();
            let original: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
            prop_assert_eq!(flattened, original);

            for pair in timeline.cues.windows(2) {
                prop_assert!(pair[0].end_secs <= pair[1].start_secs);
                prop_assert!(pair[0].start_secs <= pair[1].start_secs);
            }
            for cue in timeline.iter() {
                prop_assert!(cue.start_secs <= cue.end_secs);
                for word in &cue.words {
                    prop_assert!(word.highlight_start_ms <= word.highlight_end_ms);
                    prop_assert!(word.highlight_end_ms <= cue.duration_ms());
                }
            }
        }
    }
}
