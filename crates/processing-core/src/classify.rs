//! Media classification: decide image vs clip and learn clip durations.

use std::path::{Path, PathBuf};

use reelforge_common::error::{ReelError, ReelResult};
use reelforge_project_model::request::OrderedMedia;
use reelforge_project_model::segment::{MediaKind, MediaSegment};
use serde::Serialize;

/// Extensions treated as motion clips.
pub const CLIP_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm", "flv", "m4v"];

/// Extensions treated as still images.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp"];

/// Source of intrinsic clip durations (an external media probe in production).
pub trait DurationProbe {
    /// Duration of the media at `path`, in seconds.
    fn probe_duration(&self, path: &Path) -> ReelResult<f64>;
}

impl<F> DurationProbe for F
where
    F: Fn(&Path) -> ReelResult<f64>,
{
    fn probe_duration(&self, path: &Path) -> ReelResult<f64> {
        self(path)
    }
}

/// Determine the media kind from the file extension (case-insensitive).
pub fn media_kind(path: &Path) -> ReelResult<MediaKind> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| ReelError::UnsupportedMedia {
            path: path.to_path_buf(),
        })?;

    if CLIP_EXTENSIONS.contains(&ext.as_str()) {
        Ok(MediaKind::Clip)
    } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Ok(MediaKind::Image)
    } else {
        Err(ReelError::UnsupportedMedia {
            path: path.to_path_buf(),
        })
    }
}

/// Summary of a classification pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClassificationReport {
    pub images: usize,
    pub clips: usize,
    /// Clips whose duration could not be probed and fell back to nominal.
    pub probe_failures: Vec<PathBuf>,
}

/// Classifies ordered media into segments, probing clips for duration.
pub struct MediaClassifier<'a, P: DurationProbe + ?Sized> {
    probe: &'a P,
}

impl<'a, P: DurationProbe + ?Sized> MediaClassifier<'a, P> {
    pub fn new(probe: &'a P) -> Self {
        Self { probe }
    }

    /// Classify a single media reference.
    ///
    /// A clip whose probe fails (or reports a non-positive duration) is
    /// given `nominal_secs` as its native duration. Returns whether the
    /// fallback was used. Fatal probe errors are returned unchanged.
    pub fn classify(
        &self,
        media: &OrderedMedia,
        nominal_secs: f64,
    ) -> ReelResult<(MediaSegment, bool)> {
        let kind = media_kind(&media.path)?;
        let (mut segment, fell_back) = match kind {
            MediaKind::Image => (MediaSegment::image(media.index, &media.path), false),
            MediaKind::Clip => {
                let (native, fell_back) = match self.probe.probe_duration(&media.path) {
                    Ok(d) if d.is_finite() && d > 0.0 => (d, false),
                    Ok(d) => {
                        tracing::warn!(
                            path = %media.path.display(),
                            reported = d,
                            fallback_secs = nominal_secs,
                            "Probe reported unusable clip duration, using nominal"
                        );
                        (nominal_secs, true)
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        tracing::warn!(
                            path = %media.path.display(),
                            error = %e,
                            fallback_secs = nominal_secs,
                            "Clip duration probe failed, using nominal"
                        );
                        (nominal_secs, true)
                    }
                };
                (
                    MediaSegment::clip(media.index, &media.path, native),
                    fell_back,
                )
            }
        };
        segment.scene = media.scene;
        Ok((segment, fell_back))
    }

    /// Classify every media reference against a narration length.
    pub fn classify_all(
        &self,
        media: &[OrderedMedia],
        narration_secs: f64,
    ) -> ReelResult<(Vec<MediaSegment>, ClassificationReport)> {
        if media.is_empty() {
            return Err(ReelError::invalid("no media to classify"));
        }
        if !(narration_secs.is_finite() && narration_secs > 0.0) {
            return Err(ReelError::invalid(format!(
                "narration duration must be positive, got {narration_secs}"
            )));
        }

        let nominal = narration_secs / media.len() as f64;
        let mut report = ClassificationReport::default();
        let mut segments = Vec::with_capacity(media.len());

        for item in media {
            let (segment, fell_back) = self.classify(item, nominal)?;
            match segment.kind {
                MediaKind::Image => report.images += 1,
                MediaKind::Clip => report.clips += 1,
            }
            if fell_back {
                report.probe_failures.push(item.path.clone());
            }
            tracing::debug!(
                index = segment.index,
                kind = ?segment.kind,
                native_secs = ?segment.native_duration_secs,
                path = %segment.source_path.display(),
                "Classified media"
            );
            segments.push(segment);
        }

        Ok((segments, report))
    }
}
