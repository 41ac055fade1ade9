//! Render progress reporting. Progress is advisory and never drives control flow.

use reelforge_common::error::RenderPass;
use serde::Serialize;

/// Progress callback for rendering.
pub type ProgressCallback = Box<dyn Fn(RenderProgress) + Send + Sync>;

/// Render progress report.
#[derive(Debug, Clone, Serialize)]
pub struct RenderProgress {
    /// Pass currently running, if any.
    pub pass: Option<RenderPass>,

    /// Progress of the current pass [0.0, 1.0].
    pub progress: f64,

    /// Output seconds encoded so far in the current pass.
    pub out_time_secs: f64,

    /// Estimated time remaining in the current pass, in seconds.
    pub eta_secs: f64,

    /// Current stage.
    pub stage: RenderStage,
}

impl RenderProgress {
    pub fn stage(stage: RenderStage) -> Self {
        Self {
            pass: None,
            progress: if stage == RenderStage::Complete { 1.0 } else { 0.0 },
            out_time_secs: 0.0,
            eta_secs: 0.0,
            stage,
        }
    }
}

/// Stages of a render job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStage {
    Planning,
    BaseRender,
    CaptionOverlay,
    SectionJoin,
    Finalizing,
    Complete,
}

impl RenderStage {
    pub fn for_pass(pass: RenderPass) -> Self {
        match pass {
            RenderPass::Base => RenderStage::BaseRender,
            RenderPass::CaptionOverlay => RenderStage::CaptionOverlay,
            RenderPass::SectionJoin => RenderStage::SectionJoin,
        }
    }
}

/// Key/value state parsed from the engine's `-progress` stream.
#[derive(Debug, Default)]
pub(crate) struct ProgressState {
    pub out_time_secs: f64,
    pub complete: bool,
}

impl ProgressState {
    pub fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both names.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

pub(crate) fn progress_report(
    state: &ProgressState,
    pass: RenderPass,
    expected_duration_secs: f64,
    elapsed_secs: f64,
) -> RenderProgress {
    let progress = if expected_duration_secs <= 0.0 {
        0.0
    } else {
        (state.out_time_secs / expected_duration_secs).clamp(0.0, 1.0)
    };

    let eta_secs = if progress > 0.0 {
        (elapsed_secs / progress) - elapsed_secs
    } else {
        0.0
    }
    .max(0.0);

    RenderProgress {
        pass: Some(pass),
        progress: if state.complete { 1.0 } else { progress },
        out_time_secs: state.out_time_secs,
        eta_secs,
        stage: RenderStage::for_pass(pass),
    }
}
