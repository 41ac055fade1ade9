//! Render profiles: immutable per-job frame, encoder and look settings.
//!
//! A profile is built once from a [`ProfileKind`] preset and passed by
//! reference to every component. Nothing reads render settings from
//! ambient state.

use serde::{Deserialize, Serialize};

/// The two supported output presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    /// 1080x1920 short-form with Ken Burns zoom/pan.
    #[default]
    VerticalShort,
    /// 1920x1080 long-form with linear horizontal pan and no zoom.
    HorizontalLong,
}

impl std::str::FromStr for ProfileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vertical_short" | "vertical" | "9:16" => Ok(ProfileKind::VerticalShort),
            "horizontal_long" | "horizontal" | "16:9" => Ok(ProfileKind::HorizontalLong),
            other => Err(format!(
                "Unknown profile: {other}. Use: vertical_short, horizontal_long"
            )),
        }
    }
}

/// How still images are animated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MotionStyle {
    /// Two-phase eased zoom with a cycled pan pattern.
    KenBurns {
        /// Zoom factor at the segment's first and last frame.
        zoom_peak: f64,
        /// Zoom factor at the midpoint hold.
        zoom_rest: f64,
        /// Exponent of the ease curves.
        easing_exponent: i32,
    },
    /// Linear horizontal pan across an image pre-scaled wider than the frame.
    HorizontalPan {
        /// Pre-scale width as a multiple of the frame width.
        overscan: f64,
        /// Travel distance as a fraction of the frame width.
        travel_ratio: f64,
    },
}

/// Encoder quality parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderSettings {
    pub video_codec: String,
    pub preset: String,
    pub crf: u32,
    pub pixel_format: String,
    pub audio_codec: String,
    pub audio_bitrate_kbps: u32,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            preset: "medium".to_string(),
            crf: 23,
            pixel_format: "yuv420p".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate_kbps: 192,
        }
    }
}

/// Global color treatment applied once after concatenation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorGrade {
    pub saturation: f64,
    pub brightness: f64,
    pub contrast: f64,
}

impl Default for ColorGrade {
    fn default() -> Self {
        Self {
            saturation: 1.3,
            brightness: 0.05,
            contrast: 1.1,
        }
    }
}

/// Pan axis of a [`PanPattern`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanAxis {
    Horizontal,
    Vertical,
}

/// A named motion template cycled across image segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanPattern {
    pub name: String,
    pub axis: PanAxis,
    /// Starting offset as a signed fraction of the input dimension.
    pub factor: f64,
    /// Direction of travel along the axis: `1.0` or `-1.0`.
    pub direction: f64,
}

impl PanPattern {
    pub fn new(name: impl Into<String>, axis: PanAxis, factor: f64, direction: f64) -> Self {
        Self {
            name: name.into(),
            axis,
            factor,
            direction,
        }
    }

    /// Total travel range along the axis, as a fraction of the input dimension.
    pub fn range(&self) -> f64 {
        self.factor.abs() * 2.0
    }

    /// The standard four-way catalog.
    pub fn default_catalog() -> Vec<PanPattern> {
        vec![
            PanPattern::new("left-right", PanAxis::Horizontal, -0.3, 1.0),
            PanPattern::new("right-left", PanAxis::Horizontal, 0.3, -1.0),
            PanPattern::new("top-bottom", PanAxis::Vertical, -0.3, 1.0),
            PanPattern::new("bottom-top", PanAxis::Vertical, 0.3, -1.0),
        ]
    }
}

/// Immutable configuration for one render job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderProfile {
    pub kind: ProfileKind,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub encoder: EncoderSettings,
    pub color_grade: ColorGrade,
    pub motion: MotionStyle,
    pub pan_patterns: Vec<PanPattern>,
}

impl RenderProfile {
    /// Build the preset for a profile kind.
    pub fn preset(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::VerticalShort => Self::vertical_short(),
            ProfileKind::HorizontalLong => Self::horizontal_long(),
        }
    }

    /// 1080x1920 short-form with Ken Burns motion.
    pub fn vertical_short() -> Self {
        Self {
            kind: ProfileKind::VerticalShort,
            width: 1080,
            height: 1920,
            fps: 30,
            encoder: EncoderSettings::default(),
            color_grade: ColorGrade::default(),
            motion: MotionStyle::KenBurns {
                zoom_peak: 1.7,
                zoom_rest: 1.0,
                easing_exponent: 8,
            },
            pan_patterns: PanPattern::default_catalog(),
        }
    }

    /// 1920x1080 long-form with linear horizontal pan.
    pub fn horizontal_long() -> Self {
        Self {
            kind: ProfileKind::HorizontalLong,
            width: 1920,
            height: 1080,
            fps: 30,
            encoder: EncoderSettings::default(),
            color_grade: ColorGrade::default(),
            motion: MotionStyle::HorizontalPan {
                overscan: 2.0,
                travel_ratio: 0.33,
            },
            pan_patterns: PanPattern::default_catalog(),
        }
    }

    /// Output size as `WxH`.
    pub fn frame_size(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    pub fn is_vertical(&self) -> bool {
        self.height > self.width
    }

    /// Check internal consistency before a job uses the profile.
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err("frame size must be non-zero".to_string());
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(format!(
                "frame size {} must be even for {}",
                self.frame_size(),
                self.encoder.pixel_format
            ));
        }
        if self.fps == 0 {
            return Err("frame rate must be non-zero".to_string());
        }
        if matches!(self.motion, MotionStyle::KenBurns { .. }) && self.pan_patterns.is_empty() {
            return Err("Ken Burns motion requires at least one pan pattern".to_string());
        }
        Ok(())
    }
}
