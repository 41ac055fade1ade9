//! Render a manifest to video.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use reelforge_common::config::AppConfig;
use reelforge_common::error::ReelError;
use reelforge_project_model::{Manifest, RenderRequest, SectionedRequest};
use reelforge_render_engine::{
    render, render_sections, FfmpegEngine, MediaEngine, ProgressCallback, RenderOptions,
    RenderProgress, RenderStage, RenderSummary,
};

/// Command-line overrides applied on top of the manifest.
#[derive(Debug, Default)]
pub struct Overrides {
    pub output: Option<PathBuf>,
    pub srt: bool,
    pub seed: Option<u64>,
    pub style: Option<String>,
    pub color: Option<String>,
    pub font: Option<String>,
    pub words_per_cue: Option<usize>,
}

impl Overrides {
    /// Caption and grouping overrides; these apply to every section.
    fn apply_captions(&self, request: &mut RenderRequest) {
        if self.seed.is_some() {
            request.caption.seed = self.seed;
        }
        if let Some(style) = &self.style {
            request.caption.style = Some(style.clone());
        }
        if let Some(color) = &self.color {
            request.caption.color = Some(color.clone());
        }
        if let Some(font) = &self.font {
            request.caption.font = Some(font.clone());
        }
        if self.words_per_cue.is_some() {
            request.words_per_cue = self.words_per_cue;
        }
    }

    fn apply(&self, request: &mut RenderRequest) {
        if let Some(output) = &self.output {
            request.output = output.clone();
        }
        self.apply_captions(request);
    }

    fn apply_sectioned(&self, request: &mut SectionedRequest) {
        if let Some(output) = &self.output {
            request.output = output.clone();
        }
        for section in &mut request.sections {
            self.apply_captions(section);
        }
    }
}

pub async fn run(config: &AppConfig, manifest: PathBuf, overrides: Overrides) -> anyhow::Result<()> {
    println!("Rendering manifest: {}", manifest.display());

    let manifest = Manifest::load(&manifest)
        .map_err(|e| anyhow::anyhow!("Failed to load manifest: {e}"))?;

    let mut options = RenderOptions::from_config(config);
    options.srt_sidecar = overrides.srt;
    let engine: Arc<dyn MediaEngine> = Arc::new(FfmpegEngine::new(&config.engine));

    match manifest {
        Manifest::Single(mut request) => {
            overrides.apply(&mut request);
            request
                .validate()
                .map_err(|e| anyhow::anyhow!("Invalid overrides: {e}"))?;

            println!("  Output: {}", request.output.display());
            println!("  Profile: {:?}", request.profile);
            println!("  Media: {} item(s)", request.media.len());

            let summary = render(request, engine, options, Some(progress_printer()))
                .await
                .map_err(failed)?;
            print_summary(&summary);
        }
        Manifest::Sectioned(mut request) => {
            overrides.apply_sectioned(&mut request);
            request
                .validate()
                .map_err(|e| anyhow::anyhow!("Invalid overrides: {e}"))?;
            if overrides.srt {
                tracing::warn!("Sectioned renders do not write caption sidecars");
            }

            println!("  Output: {}", request.output.display());
            println!("  Sections: {}", request.sections.len());

            let summary = render_sections(request, engine, options, Some(progress_printer()))
                .await
                .map_err(failed)?;
            println!("\nRender complete: {}", summary.output.display());
            println!("  Duration: {:.2}s", summary.duration_secs);
            for (n, section) in summary.sections.iter().enumerate() {
                println!(
                    "  Section {}: {:.2}s, {} segment(s), {} cue(s)",
                    n + 1,
                    section.duration_secs,
                    section.segments,
                    section.cues
                );
            }
        }
    }

    Ok(())
}

fn failed(e: ReelError) -> anyhow::Error {
    tracing::error!(error = %e, "Render failed");
    anyhow::anyhow!("Render failed: {e}")
}

fn progress_printer() -> ProgressCallback {
    Box::new(|p: RenderProgress| match p.stage {
        RenderStage::BaseRender | RenderStage::CaptionOverlay | RenderStage::SectionJoin => {
            print!(
                "\r  {:?}: {:.1}% ({:.1}s encoded, ETA: {:.0}s)  ",
                p.stage,
                p.progress * 100.0,
                p.out_time_secs,
                p.eta_secs,
            );
            let _ = std::io::stdout().flush();
        }
        RenderStage::Complete => println!(),
        stage => println!("\n  {stage:?}"),
    })
}

fn print_summary(summary: &RenderSummary) {
    println!("\nRender complete: {}", summary.output.display());
    println!("  Duration: {:.2}s", summary.duration_secs);
    println!("  Segments: {}", summary.segments);
    println!("  Passes: {:?}", summary.passes);
    match summary.look {
        Some(look) => println!(
            "  Captions: {} cue(s), {} / {} / {}",
            summary.cues, look.style, look.color.name, look.font.family
        ),
        None => println!("  Captions: none"),
    }
    if let Some(sidecar) = &summary.sidecar {
        println!("  Sidecar: {}", sidecar.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RenderRequest {
        serde_json::from_str(
            r#"{"media":[{"path":"a.jpg","scene":1}],"narration":"n.mp3","output":"out.mp4"}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_overrides_replace_manifest_fields() {
        let mut req = request();
        Overrides {
            output: Some(PathBuf::from("/tmp/final.mp4")),
            seed: Some(7),
            style: Some("box".into()),
            words_per_cue: Some(4),
            ..Default::default()
        }
        .apply(&mut req);

        assert_eq!(req.output, PathBuf::from("/tmp/final.mp4"));
        assert_eq!(req.caption.seed, Some(7));
        assert_eq!(req.caption.style.as_deref(), Some("box"));
        assert_eq!(req.caption.color, None);
        assert_eq!(req.words_per_cue, Some(4));
    }

    #[test]
    fn test_empty_overrides_keep_manifest() {
        let mut req = request();
        req.caption.color = Some("green".into());
        Overrides::default().apply(&mut req);
        assert_eq!(req.output, PathBuf::from("out.mp4"));
        assert_eq!(req.caption.color.as_deref(), Some("green"));
    }

    #[test]
    fn test_sectioned_overrides_reach_every_section() {
        let mut sectioned = SectionedRequest {
            sections: vec![request(), request()],
            output: PathBuf::from("long.mp4"),
        };
        Overrides {
            output: Some(PathBuf::from("/tmp/long.mp4")),
            color: Some("red".into()),
            ..Default::default()
        }
        .apply_sectioned(&mut sectioned);

        assert_eq!(sectioned.output, PathBuf::from("/tmp/long.mp4"));
        assert!(sectioned
            .sections
            .iter()
            .all(|s| s.caption.color.as_deref() == Some("red") && s.output == PathBuf::from("out.mp4")));
    }
}
