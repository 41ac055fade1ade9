//! Narration audio and its word-level transcript.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The narration audio. Its duration is the authoritative output length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrationTrack {
    pub path: PathBuf,
    pub duration_secs: f64,
}

impl NarrationTrack {
    pub fn new(path: impl Into<PathBuf>, duration_secs: f64) -> Self {
        Self {
            path: path.into(),
            duration_secs,
        }
    }
}

/// A single transcribed word with offsets relative to narration start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    #[serde(alias = "word")]
    pub text: String,
    #[serde(rename = "start", alias = "start_secs")]
    pub start_secs: f64,
    #[serde(rename = "end", alias = "end_secs")]
    pub end_secs: f64,
}

impl Word {
    pub fn new(text: impl Into<String>, start_secs: f64, end_secs: f64) -> Self {
        Self {
            text: text.into(),
            start_secs,
            end_secs,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        (self.end_secs - self.start_secs).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_accepts_transcriber_field_names() {
        let word: Word = serde_json::from_str(r#"{"word":"hola","start":0.5,"end":0.9}"#).unwrap();
        assert_eq!(word.text, "hola");
        assert!((word.duration_secs() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_inverted_word_has_zero_duration() {
        assert_eq!(Word::new("x", 2.0, 1.5).duration_secs(), 0.0);
    }
}
