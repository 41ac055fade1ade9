//! Render job orchestration.
//!
//! ```text
//! request ─ classify ─ reconcile ─ synthesize ─ graph ──────┐
//!    │                                                      ├─ compositor ─ output.mp4
//!    └─ transcript ─ caption timeline ─ look ─ captions.ass ┘
//! ```
//!
//! One job owns one [`JobWorkspace`] and drives its passes sequentially.
//! Independent jobs share nothing and may run concurrently.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reelforge_captions::ass::AssRenderer;
use reelforge_captions::sidecar::save_sidecar;
use reelforge_captions::{
    resolve_transcript, write_subtitle_artifact, CaptionLook, CaptionTimeline,
};
use reelforge_common::config::AppConfig;
use reelforge_common::error::{ReelError, ReelResult, RenderPass};
use reelforge_processing_core::classify::ClassificationReport;
use reelforge_processing_core::{
    DurationReconciler, MediaClassifier, MotionSynthesizer, ReconcileReport, SegmentMotion,
};
use reelforge_project_model::narration::{NarrationTrack, Word};
use reelforge_project_model::profile::RenderProfile;
use reelforge_project_model::request::{RenderRequest, SectionedRequest};
use reelforge_project_model::segment::MediaSegment;
use serde::Serialize;

use crate::compositor::{move_into_place, remove_partial, Compositor};
use crate::engine::{EngineProbe, MediaEngine};
use crate::graph::{FilterGraph, FilterGraphBuilder};
use crate::progress::{ProgressCallback, RenderProgress, RenderStage};
use crate::workspace::JobWorkspace;

/// Staged sidecar name inside the job workspace.
const SIDECAR_FILE_NAME: &str = "captions.srt";

/// Job-independent render settings.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Parent of per-job working directories.
    pub work_root: PathBuf,
    pub fonts_dir: Option<PathBuf>,
    /// Used when the request does not set its own.
    pub words_per_cue: usize,
    /// Also write the cues as an `.srt` next to the output.
    pub srt_sidecar: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl RenderOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            work_root: config.work_root.clone(),
            fonts_dir: Some(config.captions.fonts_dir.clone()),
            words_per_cue: config.captions.words_per_cue,
            srt_sidecar: false,
        }
    }
}

/// Everything decided before the engine runs.
#[derive(Debug, Clone, Serialize)]
pub struct RenderPlan {
    pub profile: RenderProfile,
    pub narration: NarrationTrack,
    pub segments: Vec<MediaSegment>,
    pub classification: ClassificationReport,
    pub reconciliation: ReconcileReport,
    pub motions: Vec<SegmentMotion>,
    pub graph: FilterGraph,
    pub words: Vec<Word>,
}

/// Result of a finished job.
#[derive(Debug, Clone, Serialize)]
pub struct RenderSummary {
    pub output: PathBuf,
    pub duration_secs: f64,
    pub segments: usize,
    pub cues: usize,
    pub passes: Vec<RenderPass>,
    pub look: Option<CaptionLook>,
    pub sidecar: Option<PathBuf>,
}

/// Result of a finished sectioned job.
#[derive(Debug, Clone, Serialize)]
pub struct SectionedSummary {
    pub output: PathBuf,
    pub duration_secs: f64,
    pub sections: Vec<RenderSummary>,
}

/// Plan a job: check sources, classify, reconcile, synthesize motion and
/// build the graph. Runs probes but never renders, so no output path is
/// required.
pub fn plan_render(request: &RenderRequest, engine: &dyn MediaEngine) -> ReelResult<RenderPlan> {
    request
        .validate_inputs()
        .map_err(|e| ReelError::invalid(e.to_string()))?;
    if let Some(missing) = request.first_missing_source() {
        return Err(ReelError::missing_asset(missing));
    }

    let profile = RenderProfile::preset(request.profile);
    profile.validate().map_err(ReelError::invalid)?;

    let narration_secs = match request.narration_duration_secs {
        Some(secs) => secs,
        None => engine.probe_duration(&request.narration).map_err(|e| {
            ReelError::invalid(format!("narration duration could not be determined: {e}"))
        })?,
    };
    let narration = NarrationTrack::new(&request.narration, narration_secs);

    let probe = EngineProbe(engine);
    let classifier = MediaClassifier::new(&probe);
    let (mut segments, classification) =
        classifier.classify_all(&request.ordered_media(), narration_secs)?;

    let reconciliation = DurationReconciler::default().reconcile(&mut segments, narration_secs)?;
    let motions = MotionSynthesizer::new(&profile).synthesize_all(&segments);
    let graph = FilterGraphBuilder::new(&profile).build(
        &motions,
        &narration.path,
        narration_secs,
        request.background_music.as_ref(),
    )?;
    let words = resolve_transcript(request.transcript.as_ref())?;

    tracing::info!(
        profile = ?profile.kind,
        narration_secs,
        images = classification.images,
        clips = classification.clips,
        words = words.len(),
        "Render planned"
    );

    Ok(RenderPlan {
        profile,
        narration,
        segments,
        classification,
        reconciliation,
        motions,
        graph,
        words,
    })
}

/// Run a whole job on the current thread.
pub fn render_blocking(
    request: &RenderRequest,
    engine: &dyn MediaEngine,
    options: &RenderOptions,
    progress: Option<&ProgressCallback>,
) -> ReelResult<RenderSummary> {
    let started = std::time::Instant::now();
    tracing::info!(output = %request.output.display(), "Starting render");
    if let Some(cb) = progress {
        cb(RenderProgress::stage(RenderStage::Planning));
    }

    request
        .validate()
        .map_err(|e| ReelError::invalid(e.to_string()))?;
    let plan = plan_render(request, engine)?;
    let workspace = JobWorkspace::create(&options.work_root)?;

    let words_per_cue = request.words_per_cue.unwrap_or(options.words_per_cue);
    let timeline = CaptionTimeline::build(&plan.words, words_per_cue)?;
    let fonts_dir = options.fonts_dir.as_deref();

    let (artifact, look) = if timeline.is_empty() {
        (None, None)
    } else {
        let look = CaptionLook::for_job(&request.caption, fonts_dir)?;
        let renderer = AssRenderer::new(&plan.profile, look);
        let artifact = write_subtitle_artifact(&timeline, &renderer, workspace.path(), fonts_dir)?;
        (artifact, Some(look))
    };

    let staged_sidecar = if options.srt_sidecar && !timeline.is_empty() {
        let path = workspace.path().join(SIDECAR_FILE_NAME);
        save_sidecar(&timeline, &path)?;
        Some(path)
    } else {
        None
    };

    let compositor = Compositor::new(engine, &plan.profile);
    let outcome = compositor.compose(
        &plan.graph,
        artifact.as_ref(),
        &workspace,
        &request.output,
        progress,
    )?;

    let sidecar = match finish_job(&outcome.output, staged_sidecar.as_deref(), workspace) {
        Ok(sidecar) => sidecar,
        Err(e) => {
            tracing::error!(error = %e, "Finalizing failed, removing output");
            remove_partial(&outcome.output);
            return Err(e);
        }
    };
    if let Some(cb) = progress {
        cb(RenderProgress::stage(RenderStage::Complete));
    }

    tracing::info!(
        output = %outcome.output.display(),
        elapsed_secs = started.elapsed().as_secs_f64(),
        "Render finished"
    );

    Ok(RenderSummary {
        output: outcome.output,
        duration_secs: plan.narration.duration_secs,
        segments: plan.segments.len(),
        cues: timeline.len(),
        passes: outcome.passes,
        look,
        sidecar,
    })
}

/// Render a job without blocking the async runtime.
///
/// This is the main entry point for rendering.
pub async fn render(
    request: RenderRequest,
    engine: Arc<dyn MediaEngine>,
    options: RenderOptions,
    progress: Option<ProgressCallback>,
) -> ReelResult<RenderSummary> {
    ensure_available(engine.as_ref())?;
    tokio::task::spawn_blocking(move || {
        render_blocking(&request, engine.as_ref(), &options, progress.as_ref())
    })
    .await
    .map_err(|e| ReelError::render(format!("Render task failed: {e}")))?
}

/// Render every section into one workspace, then join them by stream copy.
///
/// Progress is reported per section, then for the join. Sections never
/// write sidecars. Nothing is left at the output path unless the join and
/// the workspace release both succeed.
pub fn render_sections_blocking(
    request: &SectionedRequest,
    engine: &dyn MediaEngine,
    options: &RenderOptions,
    progress: Option<&ProgressCallback>,
) -> ReelResult<SectionedSummary> {
    request
        .validate()
        .map_err(|e| ReelError::invalid(e.to_string()))?;
    if let Some(missing) = request.first_missing_source() {
        return Err(ReelError::missing_asset(missing));
    }

    let workspace = JobWorkspace::create(&options.work_root)?;
    let section_options = RenderOptions {
        srt_sidecar: false,
        ..options.clone()
    };

    let total = request.sections.len();
    let mut summaries = Vec::with_capacity(total);
    for (n, section) in request.sections.iter().enumerate() {
        let mut job = section.clone();
        job.output = workspace.path().join(section_file_name(n));
        tracing::info!(section = n + 1, total, "Rendering section");
        summaries.push(render_blocking(&job, engine, &section_options, progress)?);
    }

    let parts: Vec<PathBuf> = summaries.iter().map(|s| s.output.clone()).collect();
    let duration_secs: f64 = summaries.iter().map(|s| s.duration_secs).sum();
    if let Some(parent) = request.output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let joined = engine
        .concat_sections(&parts, workspace.path(), &request.output, duration_secs, progress)
        .and_then(|()| workspace.close());
    if let Err(e) = joined {
        tracing::error!(error = %e, "Section join failed, removing output");
        remove_partial(&request.output);
        return Err(e);
    }
    if let Some(cb) = progress {
        cb(RenderProgress::stage(RenderStage::Complete));
    }

    tracing::info!(
        output = %request.output.display(),
        sections = total,
        duration_secs,
        "Sectioned render finished"
    );

    Ok(SectionedSummary {
        output: request.output.clone(),
        duration_secs,
        sections: summaries,
    })
}

/// Async counterpart of [`render_sections_blocking`].
pub async fn render_sections(
    request: SectionedRequest,
    engine: Arc<dyn MediaEngine>,
    options: RenderOptions,
    progress: Option<ProgressCallback>,
) -> ReelResult<SectionedSummary> {
    ensure_available(engine.as_ref())?;
    tokio::task::spawn_blocking(move || {
        render_sections_blocking(&request, engine.as_ref(), &options, progress.as_ref())
    })
    .await
    .map_err(|e| ReelError::render(format!("Render task failed: {e}")))?
}

fn ensure_available(engine: &dyn MediaEngine) -> ReelResult<()> {
    if engine.is_available() {
        Ok(())
    } else {
        Err(ReelError::unsupported(format!(
            "Media engine '{}' is not available (expected ffmpeg and ffprobe in PATH)",
            engine.name()
        )))
    }
}

fn section_file_name(n: usize) -> String {
    format!("section_{:03}.mp4", n + 1)
}

fn sidecar_path(output: &Path) -> PathBuf {
    output.with_extension("srt")
}

/// Place the staged sidecar next to the output and release the workspace.
///
/// Runs after the output is in place; the caller removes the output when
/// this fails.
fn finish_job(
    output: &Path,
    staged_sidecar: Option<&Path>,
    workspace: JobWorkspace,
) -> ReelResult<Option<PathBuf>> {
    let sidecar = match staged_sidecar {
        Some(staged) => {
            let target = sidecar_path(output);
            move_into_place(staged, &target)?;
            Some(target)
        }
        None => None,
    };
    if let Err(e) = workspace.close() {
        if let Some(placed) = &sidecar {
            remove_partial(placed);
        }
        return Err(e);
    }
    Ok(sidecar)
}
