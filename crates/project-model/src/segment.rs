//! Visual input units and their timing.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Whether a segment is a still image or a motion clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Clip,
}

/// One visual input unit of a render job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaSegment {
    /// Still image or motion clip.
    pub kind: MediaKind,

    /// Absolute path to the source file.
    pub source_path: PathBuf,

    /// Zero-based position in render order, derived from the scene key.
    pub index: usize,

    /// Externally assigned scene/segment number this position came from.
    #[serde(default)]
    pub scene: Option<i64>,

    /// Intrinsic duration of a clip in seconds. `None` for images.
    #[serde(default)]
    pub native_duration_secs: Option<f64>,

    /// Display time on the final timeline, in seconds.
    pub allocated_duration_secs: f64,

    /// True when a clip's native duration exceeded its allocation.
    #[serde(default)]
    pub trimmed: bool,
}

impl MediaSegment {
    /// A still image awaiting duration reconciliation.
    pub fn image(index: usize, source_path: impl Into<PathBuf>) -> Self {
        Self {
            kind: MediaKind::Image,
            source_path: source_path.into(),
            index,
            scene: None,
            native_duration_secs: None,
            allocated_duration_secs: 0.0,
            trimmed: false,
        }
    }

    /// A motion clip with a known intrinsic duration.
    pub fn clip(index: usize, source_path: impl Into<PathBuf>, native_duration_secs: f64) -> Self {
        Self {
            kind: MediaKind::Clip,
            source_path: source_path.into(),
            index,
            scene: None,
            native_duration_secs: Some(native_duration_secs),
            allocated_duration_secs: 0.0,
            trimmed: false,
        }
    }

    pub fn is_image(&self) -> bool {
        self.kind == MediaKind::Image
    }

    pub fn is_clip(&self) -> bool {
        self.kind == MediaKind::Clip
    }

    /// Number of output frames this segment occupies at the given rate.
    pub fn frame_count(&self, fps: u32) -> u64 {
        (self.allocated_duration_secs * fps as f64).floor().max(1.0) as u64
    }
}

/// Sum of allocated durations across segments.
pub fn total_allocated_secs(segments: &[MediaSegment]) -> f64 {
    segments.iter().map(|s| s.allocated_duration_secs).sum()
}
