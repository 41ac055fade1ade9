//! Two-pass compositing.
//!
//! Pass 1 renders the filter graph over the narration into the job
//! workspace, capped at the narration length. Pass 2, only when a subtitle
//! artifact exists, burns the captions in and copies the audio stream.
//! Without captions the base render is moved into place as the final file.
//! A failed pass never leaves its partial output behind.

use std::path::{Path, PathBuf};

use reelforge_captions::SubtitleArtifact;
use reelforge_common::error::{ReelResult, RenderPass};
use reelforge_project_model::profile::{EncoderSettings, RenderProfile};
use serde::Serialize;

use crate::engine::{EngineInvocation, MediaEngine};
use crate::graph::FilterGraph;
use crate::progress::{ProgressCallback, RenderProgress, RenderStage};
use crate::workspace::JobWorkspace;

/// What a compositing run did.
#[derive(Debug, Clone, Serialize)]
pub struct CompositeOutcome {
    pub output: PathBuf,
    pub passes: Vec<RenderPass>,
}

pub struct Compositor<'a> {
    engine: &'a dyn MediaEngine,
    profile: &'a RenderProfile,
}

impl<'a> Compositor<'a> {
    pub fn new(engine: &'a dyn MediaEngine, profile: &'a RenderProfile) -> Self {
        Self { engine, profile }
    }

    /// Pass 1: graph, segment sources and narration to a capped base render.
    pub fn base_invocation(&self, graph: &FilterGraph, output: PathBuf) -> EngineInvocation {
        let mut codec_args = video_codec_args(&self.profile.encoder);
        codec_args.extend(audio_codec_args(&self.profile.encoder));
        codec_args.extend(["-movflags".to_string(), "+faststart".to_string()]);

        EngineInvocation {
            pass: RenderPass::Base,
            inputs: graph.inputs.clone(),
            filter_complex: Some(graph.to_filter_complex()),
            video_filter: None,
            maps: vec![graph.video_out.to_string(), graph.audio_out.map_arg()],
            codec_args,
            duration_secs: Some(graph.output_secs),
            expected_secs: graph.output_secs,
            output,
        }
    }

    /// Pass 2: burn the subtitle artifact into the base render.
    pub fn overlay_invocation(
        &self,
        base: &Path,
        artifact: &SubtitleArtifact,
        expected_secs: f64,
        output: PathBuf,
    ) -> EngineInvocation {
        let mut codec_args = video_codec_args(&self.profile.encoder);
        codec_args.extend(["-c:a".to_string(), "copy".to_string()]);
        codec_args.extend(["-movflags".to_string(), "+faststart".to_string()]);

        EngineInvocation {
            pass: RenderPass::CaptionOverlay,
            inputs: vec![crate::graph::GraphInput {
                path: base.to_path_buf(),
                role: crate::graph::InputRole::Segment,
                options: Vec::new(),
            }],
            filter_complex: None,
            video_filter: Some(subtitle_filter(artifact)),
            maps: Vec::new(),
            codec_args,
            duration_secs: None,
            expected_secs,
            output,
        }
    }

    /// Run both passes for one job.
    pub fn compose(
        &self,
        graph: &FilterGraph,
        artifact: Option<&SubtitleArtifact>,
        workspace: &JobWorkspace,
        output: &Path,
        progress: Option<&ProgressCallback>,
    ) -> ReelResult<CompositeOutcome> {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let base_path = workspace.base_render_path();
        let base = self.base_invocation(graph, base_path.clone());
        self.run_pass(&base, progress)?;
        let mut passes = vec![RenderPass::Base];

        match artifact {
            Some(artifact) => {
                let overlay =
                    self.overlay_invocation(&base_path, artifact, graph.output_secs, output.to_path_buf());
                self.run_pass(&overlay, progress)?;
                passes.push(RenderPass::CaptionOverlay);
                if let Err(e) = std::fs::remove_file(&base_path) {
                    tracing::warn!(
                        path = %base_path.display(),
                        error = %e,
                        "Failed to delete intermediate base render"
                    );
                }
            }
            None => {
                if let Some(cb) = progress {
                    cb(RenderProgress::stage(RenderStage::Finalizing));
                }
                move_into_place(&base_path, output)?;
            }
        }

        tracing::info!(output = %output.display(), passes = passes.len(), "Composite finished");
        Ok(CompositeOutcome {
            output: output.to_path_buf(),
            passes,
        })
    }

    fn run_pass(
        &self,
        invocation: &EngineInvocation,
        progress: Option<&ProgressCallback>,
    ) -> ReelResult<()> {
        if let Some(cb) = progress {
            let mut report = RenderProgress::stage(RenderStage::for_pass(invocation.pass));
            report.pass = Some(invocation.pass);
            cb(report);
        }

        tracing::info!(
            pass = %invocation.pass,
            engine = self.engine.name(),
            output = %invocation.output.display(),
            "Starting pass"
        );
        let result = self.engine.run(invocation, progress);
        if result.is_err() {
            remove_partial(&invocation.output);
        }
        result
    }
}

fn video_codec_args(encoder: &EncoderSettings) -> Vec<String> {
    vec![
        "-c:v".to_string(),
        encoder.video_codec.clone(),
        "-preset".to_string(),
        encoder.preset.clone(),
        "-crf".to_string(),
        encoder.crf.to_string(),
        "-pix_fmt".to_string(),
        encoder.pixel_format.clone(),
    ]
}

fn audio_codec_args(encoder: &EncoderSettings) -> Vec<String> {
    vec![
        "-c:a".to_string(),
        encoder.audio_codec.clone(),
        "-b:a".to_string(),
        format!("{}k", encoder.audio_bitrate_kbps),
    ]
}

/// `ass=` filter for an artifact, with its fonts directory when needed.
pub fn subtitle_filter(artifact: &SubtitleArtifact) -> String {
    let mut filter = format!("ass='{}'", escape_filter_path(&artifact.path));
    if let Some(fonts_dir) = &artifact.fonts_dir {
        filter.push_str(&format!(":fontsdir='{}'", escape_filter_path(fonts_dir)));
    }
    filter
}

/// Escape a path for use inside a quoted filter argument.
pub fn escape_filter_path(path: &Path) -> String {
    let normalized = path.to_string_lossy().replace('\\', "/");
    let mut escaped = String::with_capacity(normalized.len() + 8);
    for ch in normalized.chars() {
        match ch {
            ':' => escaped.push_str("\\:"),
            '\'' => escaped.push_str("\\'"),
            ',' => escaped.push_str("\\,"),
            ';' => escaped.push_str("\\;"),
            '[' => escaped.push_str("\\["),
            ']' => escaped.push_str("\\]"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub(crate) fn remove_partial(path: &Path) {
    if !path.exists() {
        return;
    }
    match std::fs::remove_file(path) {
        Ok(()) => tracing::info!(path = %path.display(), "Removed partial output"),
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial output"),
    }
}

/// Rename, falling back to copy when source and target are on different filesystems.
pub(crate) fn move_into_place(from: &Path, to: &Path) -> ReelResult<()> {
    if let Err(e) = std::fs::rename(from, to) {
        tracing::debug!(error = %e, "Rename failed, copying base render instead");
        if let Err(copy_err) = std::fs::copy(from, to) {
            remove_partial(to);
            return Err(copy_err.into());
        }
        std::fs::remove_file(from)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelforge_captions::{CaptionLook, CaptionStyle, FontChoice, HighlightColor};

    fn artifact(path: &str, fonts_dir: Option<&str>) -> SubtitleArtifact {
        SubtitleArtifact {
            path: PathBuf::from(path),
            fonts_dir: fonts_dir.map(PathBuf::from),
            cue_count: 1,
            look: CaptionLook {
                style: CaptionStyle::Pulse,
                color: HighlightColor::PALETTE[0],
                font: FontChoice::CATALOG[1],
            },
        }
    }

    #[test]
    fn test_escape_filter_path() {
        assert_eq!(
            escape_filter_path(Path::new("C:\\jobs\\it's,[a];b.ass")),
            "C\\:/jobs/it\\'s\\,\\[a\\]\\;b.ass"
        );
    }

    #[test]
    fn test_subtitle_filter_with_fonts_dir() {
        assert_eq!(
            subtitle_filter(&artifact("/tmp/job/captions.ass", None)),
            "ass='/tmp/job/captions.ass'"
        );
        assert_eq!(
            subtitle_filter(&artifact("/tmp/job/captions.ass", Some("/fonts"))),
            "ass='/tmp/job/captions.ass':fontsdir='/fonts'"
        );
    }
}
