//! Word-level transcript loading.
//!
//! Accepts either a flat JSON array of words or a speech-to-text verbose
//! response with a top-level `words` array (extra fields are ignored).

use std::path::Path;

use reelforge_common::error::{ReelError, ReelResult};
use reelforge_project_model::narration::Word;
use reelforge_project_model::request::TranscriptSource;
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum TranscriptDocument {
    Flat(Vec<Word>),
    Verbose { words: Vec<Word> },
}

/// Parse transcript JSON and normalize its words.
pub fn parse_transcript(json: &str) -> ReelResult<Vec<Word>> {
    let document: TranscriptDocument = serde_json::from_str(json)
        .map_err(|e| ReelError::caption(format!("Invalid transcript: {e}")))?;
    let words = match document {
        TranscriptDocument::Flat(words) | TranscriptDocument::Verbose { words } => words,
    };
    Ok(normalize_words(words))
}

/// Read a transcript file.
pub fn load_transcript(path: &Path) -> ReelResult<Vec<Word>> {
    if !path.exists() {
        return Err(ReelError::missing_asset(path));
    }
    let content = std::fs::read_to_string(path)?;
    let words = parse_transcript(&content)?;
    tracing::info!(path = %path.display(), words = words.len(), "Transcript loaded");
    Ok(words)
}

/// Resolve a request's transcript source. `None` yields no words.
pub fn resolve_transcript(source: Option<&TranscriptSource>) -> ReelResult<Vec<Word>> {
    match source {
        None => Ok(Vec::new()),
        Some(TranscriptSource::Inline(words)) => Ok(normalize_words(words.clone())),
        Some(TranscriptSource::File(path)) => load_transcript(path),
    }
}

/// Drop blank words and clamp inverted timings to zero length.
pub fn normalize_words(words: Vec<Word>) -> Vec<Word> {
    let total = words.len();
    let words: Vec<Word> = words
        .into_iter()
        .filter(|w| !w.text.trim().is_empty())
        .map(|mut w| {
            w.text = w.text.trim().to_string();
            w.start_secs = w.start_secs.max(0.0);
            if w.end_secs < w.start_secs {
                w.end_secs = w.start_secs;
            }
            w
        })
        .collect();

    if words.len() < total {
        tracing::debug!(dropped = total - words.len(), "Dropped blank transcript words");
    }
    words
}
