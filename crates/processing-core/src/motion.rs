//! Motion synthesis: Ken Burns curves for stills, pass-through for clips.
//!
//! # Short-form (Ken Burns)
//!
//! Each image is split at its midpoint frame into a contraction phase
//! (zoom 1.7 → 1.0, ease-out `1 - (1 - n/mid)^8`) and an expansion phase
//! (zoom 1.0 → 1.7, ease-in `((n - mid)/mid)^8`). The high exponent keeps
//! almost all visible motion in the outer ~15% of each phase and leaves a
//! near-static hold in the middle. The pan offset uses the same eased
//! progress, so pan and zoom move together and both settle at the midpoint.
//!
//! # Long-form (horizontal pan)
//!
//! No zoom. The image is pre-scaled wider than the frame and a frame-sized
//! window slides linearly across it for the whole segment, alternating
//! direction by `index mod 2`.
//!
//! # Clips
//!
//! Native motion is kept. Clips only get scale-to-cover and center-crop,
//! plus a duration cap when reconciliation trimmed them.

use std::path::PathBuf;

use reelforge_project_model::profile::{MotionStyle, PanAxis, PanPattern, RenderProfile};
use reelforge_project_model::segment::{MediaKind, MediaSegment};
use serde::Serialize;

/// Two-phase eased zoom with a pan pattern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KenBurnsMotion {
    pub frame_count: u64,
    pub zoom_peak: f64,
    pub zoom_rest: f64,
    pub exponent: i32,
    pub pattern: PanPattern,
}

impl KenBurnsMotion {
    /// Frame at which contraction ends and expansion begins.
    pub fn midpoint(&self) -> f64 {
        self.frame_count as f64 / 2.0
    }

    /// Zoom range travelled in each phase.
    pub fn zoom_span(&self) -> f64 {
        self.zoom_peak - self.zoom_rest
    }

    /// Whether a frame belongs to the contraction (first) phase.
    pub fn in_contraction(&self, frame: f64) -> bool {
        frame <= self.midpoint()
    }

    /// Eased progress in `[0, 1]` within the frame's phase.
    pub fn eased_progress(&self, frame: f64) -> f64 {
        let mid = self.midpoint();
        if self.in_contraction(frame) {
            let t = (frame / mid).clamp(0.0, 1.0);
            1.0 - (1.0 - t).powi(self.exponent)
        } else {
            let t = ((frame - mid) / mid).clamp(0.0, 1.0);
            t.powi(self.exponent)
        }
    }

    /// Zoom factor at a frame.
    pub fn zoom_at(&self, frame: f64) -> f64 {
        let eased = self.eased_progress(frame);
        if self.in_contraction(frame) {
            self.zoom_rest + self.zoom_span() * (1.0 - eased)
        } else {
            self.zoom_rest + self.zoom_span() * eased
        }
    }

    /// Top-left corner of the visible window at a frame, as fractions of
    /// the input width and height.
    pub fn pan_offset_at(&self, frame: f64) -> (f64, f64) {
        let zoom = self.zoom_at(frame);
        let centered = 0.5 - 0.5 / zoom;
        let slack = 1.0 - 1.0 / zoom;
        let travel = self.pattern.factor
            + self.pattern.range() * self.pattern.direction * self.eased_progress(frame);
        let shifted = centered + slack * travel;

        match self.pattern.axis {
            PanAxis::Horizontal => (shifted, centered),
            PanAxis::Vertical => (centered, shifted),
        }
    }
}

/// Direction of a long-form pan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PanDirection {
    LeftToRight,
    RightToLeft,
}

/// Linear horizontal pan across an over-scanned image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HorizontalPanMotion {
    pub frame_count: u64,
    /// Width the image is scaled to before the window slides across it.
    pub scaled_width: u32,
    /// Horizontal distance the window travels, in pixels.
    pub travel_px: u32,
    pub direction: PanDirection,
}

impl HorizontalPanMotion {
    /// Pixels travelled per frame.
    pub fn step_px(&self) -> f64 {
        self.travel_px as f64 / self.frame_count.max(1) as f64
    }

    /// Window x offset at a frame.
    pub fn offset_at(&self, frame: f64) -> f64 {
        let travel = self.travel_px as f64;
        match self.direction {
            PanDirection::LeftToRight => (frame * self.step_px()).min(travel),
            PanDirection::RightToLeft => (travel - frame * self.step_px()).max(0.0),
        }
    }
}

/// Per-segment motion, enough to build that segment's processing stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MotionDescriptor {
    KenBurns(KenBurnsMotion),
    HorizontalPan(HorizontalPanMotion),
    /// Scale-to-cover and center-crop only; capped when trimmed.
    ClipPassThrough { duration_cap_secs: Option<f64> },
}

/// A segment ready for graph construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentMotion {
    pub index: usize,
    pub kind: MediaKind,
    pub source_path: PathBuf,
    pub duration_secs: f64,
    pub frame_count: u64,
    pub descriptor: MotionDescriptor,
}

impl SegmentMotion {
    /// Length this segment occupies in the rendered video.
    ///
    /// Stills render exactly `frame_count` frames; clips run for their
    /// allocated duration.
    pub fn rendered_secs(&self, fps: u32) -> f64 {
        match self.kind {
            MediaKind::Image => self.frame_count as f64 / fps.max(1) as f64,
            MediaKind::Clip => self.duration_secs,
        }
    }
}

/// Produces motion descriptors for reconciled segments.
#[derive(Debug, Clone)]
pub struct MotionSynthesizer {
    width: u32,
    fps: u32,
    style: MotionStyle,
    patterns: Vec<PanPattern>,
}

impl MotionSynthesizer {
    pub fn new(profile: &RenderProfile) -> Self {
        Self {
            width: profile.width,
            fps: profile.fps,
            style: profile.motion,
            patterns: profile.pan_patterns.clone(),
        }
    }

    /// Pan pattern for a segment position. Periodic in the catalog size.
    ///
    /// Returns `None` only for an empty catalog.
    pub fn pattern_for(&self, index: usize) -> Option<&PanPattern> {
        if self.patterns.is_empty() {
            return None;
        }
        self.patterns.get(index % self.patterns.len())
    }

    /// Describe the motion of a single reconciled segment.
    pub fn synthesize(&self, segment: &MediaSegment) -> SegmentMotion {
        self.describe(segment, segment.frame_count(self.fps))
    }

    /// Describe every segment, in index order.
    ///
    /// Image frame counts carry the fractional remainder of earlier
    /// segments forward, so the cumulative frame count after each segment
    /// is the rounded cumulative allocation times fps.
    pub fn synthesize_all(&self, segments: &[MediaSegment]) -> Vec<SegmentMotion> {
        let mut ordered: Vec<&MediaSegment> = segments.iter().collect();
        ordered.sort_by_key(|s| s.index);

        let fps = self.fps as f64;
        let mut elapsed_secs = 0.0;
        let mut frames_so_far: u64 = 0;
        let mut motions = Vec::with_capacity(ordered.len());
        for segment in ordered {
            elapsed_secs += segment.allocated_duration_secs;
            let boundary = (elapsed_secs * fps).round().max(0.0) as u64;
            let motion = match segment.kind {
                MediaKind::Image => {
                    let frames = boundary.saturating_sub(frames_so_far).max(1);
                    frames_so_far += frames;
                    self.describe(segment, frames)
                }
                MediaKind::Clip => {
                    frames_so_far = frames_so_far.max(boundary);
                    self.synthesize(segment)
                }
            };
            motions.push(motion);
        }

        for motion in &motions {
            match &motion.descriptor {
                MotionDescriptor::KenBurns(kb) => tracing::debug!(
                    index = motion.index,
                    pattern = %kb.pattern.name,
                    frames = motion.frame_count,
                    "Ken Burns motion"
                ),
                MotionDescriptor::HorizontalPan(pan) => tracing::debug!(
                    index = motion.index,
                    direction = ?pan.direction,
                    frames = motion.frame_count,
                    "Horizontal pan"
                ),
                MotionDescriptor::ClipPassThrough { duration_cap_secs } => tracing::debug!(
                    index = motion.index,
                    cap_secs = ?duration_cap_secs,
                    "Clip pass-through"
                ),
            }
        }

        motions
    }

    fn describe(&self, segment: &MediaSegment, frame_count: u64) -> SegmentMotion {
        let descriptor = match segment.kind {
            MediaKind::Clip => MotionDescriptor::ClipPassThrough {
                duration_cap_secs: segment.trimmed.then_some(segment.allocated_duration_secs),
            },
            MediaKind::Image => self.image_motion(segment.index, frame_count),
        };

        SegmentMotion {
            index: segment.index,
            kind: segment.kind,
            source_path: segment.source_path.clone(),
            duration_secs: segment.allocated_duration_secs,
            frame_count,
            descriptor,
        }
    }

    fn image_motion(&self, index: usize, frame_count: u64) -> MotionDescriptor {
        match self.style {
            MotionStyle::KenBurns {
                zoom_peak,
                zoom_rest,
                easing_exponent,
            } => match self.pattern_for(index) {
                Some(pattern) => MotionDescriptor::KenBurns(KenBurnsMotion {
                    frame_count,
                    zoom_peak,
                    zoom_rest,
                    exponent: easing_exponent,
                    pattern: pattern.clone(),
                }),
                // Profile validation rejects this; degrade to a static zoom.
                None => MotionDescriptor::KenBurns(KenBurnsMotion {
                    frame_count,
                    zoom_peak,
                    zoom_rest,
                    exponent: easing_exponent,
                    pattern: PanPattern::new("static", PanAxis::Horizontal, 0.0, 1.0),
                }),
            },
            MotionStyle::HorizontalPan {
                overscan,
                travel_ratio,
            } => MotionDescriptor::HorizontalPan(HorizontalPanMotion {
                frame_count,
                scaled_width: even((self.width as f64 * overscan).round() as u32),
                travel_px: (self.width as f64 * travel_ratio).round() as u32,
                direction: if index % 2 == 0 {
                    PanDirection::LeftToRight
                } else {
                    PanDirection::RightToLeft
                },
            }),
        }
    }
}

fn even(value: u32) -> u32 {
    value + value % 2
}
