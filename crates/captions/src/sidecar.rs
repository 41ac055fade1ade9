//! Plain SRT caption sidecar, for platforms that take captions as a
//! separate upload.

use std::path::Path;

use reelforge_common::error::ReelResult;

use crate::timeline::{CaptionCue, CaptionTimeline};

/// SRT document with one numbered entry per cue.
pub fn generate_srt(timeline: &CaptionTimeline) -> String {
    timeline
        .iter()
        .enumerate()
        .map(|(n, cue)| srt_entry(n + 1, cue))
        .collect()
}

fn srt_entry(number: usize, cue: &CaptionCue) -> String {
    format!(
        "{number}\n{} --> {}\n{}\n\n",
        srt_timestamp(cue.start_secs),
        srt_timestamp(cue.end_secs),
        cue.text()
    )
}

/// `HH:MM:SS,mmm`, rounded to the millisecond.
fn srt_timestamp(secs: f64) -> String {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    format!(
        "{:02}:{:02}:{:02},{:03}",
        total_ms / 3_600_000,
        total_ms / 60_000 % 60,
        total_ms / 1000 % 60,
        total_ms % 1000
    )
}

/// Write the SRT sidecar for `timeline` to `path`.
pub fn save_sidecar(timeline: &CaptionTimeline, path: &Path) -> ReelResult<()> {
    std::fs::write(path, generate_srt(timeline))?;
    tracing::info!(path = %path.display(), cues = timeline.len(), "Caption sidecar written");
    Ok(())
}
