//! ReelForge Captions
//!
//! Word-synchronized "karaoke" captions:
//! - **Transcript:** Loading word-level timestamps from speech-to-text output
//! - **Timeline:** Fixed-size grouping of words into cues with per-word highlight windows
//! - **Looks:** Per-job style, highlight color and font selection (seedable)
//! - **ASS:** Burn-in subtitle artifact with animated per-word emphasis
//! - **Sidecar:** Plain SRT output of the same cues

pub mod ass;
pub mod sidecar;
pub mod style;
pub mod timeline;
pub mod transcript;

pub use ass::{write_subtitle_artifact, AssRenderer, SubtitleArtifact};
pub use style::{CaptionLook, CaptionStyle, FontChoice, HighlightColor};
pub use timeline::{CaptionCue, CaptionTimeline, CueWord};
pub use transcript::{load_transcript, resolve_transcript};
