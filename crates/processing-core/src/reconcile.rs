//! Hybrid duration reconciliation.
//!
//! Clips keep their native timing (capped at the nominal slot), and still
//! images stretch or shrink so that the whole timeline matches the
//! narration length.
//!
//! # Algorithm
//!
//! 1. **Nominal** slot = narration / segment count.
//! 2. **Clips** get `min(native, nominal)`; `trimmed` when native exceeds nominal.
//! 3. **Images** provisionally get the nominal slot.
//! 4. **Deficit** = narration - sum of allocations.
//! 5. If `|deficit|` exceeds the tolerance, spread it evenly over images only.
//! 6. **Floor** every image at 0.5s. Any divergence this causes is accepted.

use reelforge_common::error::{ReelError, ReelResult};
use reelforge_project_model::segment::{total_allocated_secs, MediaKind, MediaSegment};
use serde::Serialize;

/// Divergence from the narration length that is considered a match.
pub const RECONCILE_TOLERANCE_SECS: f64 = 0.1;

/// Minimum display time of a still image.
pub const IMAGE_FLOOR_SECS: f64 = 0.5;

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub narration_secs: f64,
    pub nominal_secs: f64,
    /// Sum of allocations before images absorbed the deficit.
    pub initial_total_secs: f64,
    /// `narration - initial_total`.
    pub deficit_secs: f64,
    /// Per-image adjustment that was applied (zero when within tolerance).
    pub adjustment_per_image_secs: f64,
    pub final_total_secs: f64,
    /// Images raised to the floor after adjustment.
    pub clamped_images: usize,
    pub trimmed_clips: usize,
    /// The final total still diverges from the narration beyond tolerance.
    pub degenerate: bool,
}

impl ReconcileReport {
    /// Narration length minus final total (positive = timeline too short).
    pub fn divergence_secs(&self) -> f64 {
        self.narration_secs - self.final_total_secs
    }
}

/// Allocates display durations to segments.
#[derive(Debug, Clone)]
pub struct DurationReconciler {
    pub tolerance_secs: f64,
    pub image_floor_secs: f64,
}

impl Default for DurationReconciler {
    fn default() -> Self {
        Self {
            tolerance_secs: RECONCILE_TOLERANCE_SECS,
            image_floor_secs: IMAGE_FLOOR_SECS,
        }
    }
}

impl DurationReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill in `allocated_duration_secs` and `trimmed` for every segment.
    ///
    /// Segments must already be classified, and clips must carry a native
    /// duration (the classifier guarantees this, substituting the nominal
    /// slot when probing failed).
    pub fn reconcile(
        &self,
        segments: &mut [MediaSegment],
        narration_secs: f64,
    ) -> ReelResult<ReconcileReport> {
        if segments.is_empty() {
            return Err(ReelError::invalid("cannot reconcile an empty segment list"));
        }
        if !(narration_secs.is_finite() && narration_secs > 0.0) {
            return Err(ReelError::invalid(format!(
                "narration duration must be positive, got {narration_secs}"
            )));
        }

        let nominal = narration_secs / segments.len() as f64;
        let mut trimmed_clips = 0;

        for segment in segments.iter_mut() {
            match segment.kind {
                MediaKind::Clip => {
                    let native = segment.native_duration_secs.unwrap_or(nominal);
                    segment.allocated_duration_secs = native.min(nominal);
                    segment.trimmed = native > nominal;
                    if segment.trimmed {
                        trimmed_clips += 1;
                    }
                }
                MediaKind::Image => {
                    segment.allocated_duration_secs = nominal;
                    segment.trimmed = false;
                }
            }
        }

        let initial_total = total_allocated_secs(segments);
        let deficit = narration_secs - initial_total;
        let image_count = segments.iter().filter(|s| s.is_image()).count();

        let adjustment = if deficit.abs() > self.tolerance_secs && image_count > 0 {
            deficit / image_count as f64
        } else {
            0.0
        };

        let mut clamped_images = 0;
        for segment in segments.iter_mut().filter(|s| s.is_image()) {
            segment.allocated_duration_secs += adjustment;
            if segment.allocated_duration_secs < self.image_floor_secs {
                segment.allocated_duration_secs = self.image_floor_secs;
                clamped_images += 1;
            }
        }

        let final_total = total_allocated_secs(segments);
        let report = ReconcileReport {
            narration_secs,
            nominal_secs: nominal,
            initial_total_secs: initial_total,
            deficit_secs: deficit,
            adjustment_per_image_secs: adjustment,
            final_total_secs: final_total,
            clamped_images,
            trimmed_clips,
            degenerate: (narration_secs - final_total).abs() > self.tolerance_secs,
        };

        if report.degenerate {
            tracing::warn!(
                narration_secs,
                final_total_secs = final_total,
                divergence_secs = report.divergence_secs(),
                images = image_count,
                clamped_images,
                "Segment durations cannot match narration; output length will be forced at mux time"
            );
        } else {
            tracing::debug!(
                nominal_secs = nominal,
                deficit_secs = deficit,
                adjustment_per_image_secs = adjustment,
                final_total_secs = final_total,
                "Durations reconciled"
            );
        }

        Ok(report)
    }
}
