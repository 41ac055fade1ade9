use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use reelforge_common::error::{ReelError, ReelResult, RenderPass};
use reelforge_project_model::narration::Word;
use reelforge_project_model::profile::ProfileKind;
use reelforge_project_model::request::{
    CaptionOptions, MediaRef, RenderRequest, SectionedRequest, TranscriptSource,
};
use reelforge_render_engine::{
    plan_render, render, render_blocking, render_sections_blocking, EngineInvocation, MediaEngine, ProgressCallback,
    RenderOptions, RenderProgress, RenderStage,
};
use tempfile::TempDir;

/// Records invocations and writes a marker file instead of encoding.
#[derive(Default)]
struct FakeEngine {
    clip_secs: f64,
    fail_on: Option<RenderPass>,
    calls: Mutex<Vec<EngineInvocation>>,
    join_lists: Mutex<Vec<String>>,
}

impl FakeEngine {
    fn calls(&self) -> Vec<EngineInvocation> {
        self.calls.lock().unwrap().clone()
    }
}

impl MediaEngine for FakeEngine {
    fn run(
        &self,
        invocation: &EngineInvocation,
        _progress: Option<&ProgressCallback>,
    ) -> ReelResult<()> {
        self.calls.lock().unwrap().push(invocation.clone());
        if invocation.pass == RenderPass::SectionJoin {
            let list = std::fs::read_to_string(&invocation.inputs[0].path)?;
            self.join_lists.lock().unwrap().push(list);
        }
        std::fs::write(&invocation.output, format!("{}", invocation.pass))?;
        if self.fail_on == Some(invocation.pass) {
            return Err(ReelError::Engine {
                pass: invocation.pass,
                status: "exit status: 1".to_string(),
                diagnostics: "Error opening output file".to_string(),
            });
        }
        Ok(())
    }

    fn probe_duration(&self, path: &Path) -> ReelResult<f64> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("mp4") => Ok(self.clip_secs),
            _ => Ok(9.0),
        }
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "fake"
    }
}

struct Fixture {
    dir: TempDir,
    work_root: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        for name in ["scene1.jpg", "scene2.mp4", "scene3.png", "voice.mp3"] {
            std::fs::write(dir.path().join(name), b"media").unwrap();
        }
        let work_root = dir.path().join("work");
        std::fs::create_dir_all(&work_root).unwrap();
        Self { dir, work_root }
    }

    fn request(&self, words: Vec<Word>) -> RenderRequest {
        let media = |name: &str, scene: i64| MediaRef {
            path: self.dir.path().join(name),
            scene: Some(scene),
        };
        RenderRequest {
            media: vec![media("scene3.png", 3), media("scene1.jpg", 1), media("scene2.mp4", 2)],
            narration: self.dir.path().join("voice.mp3"),
            narration_duration_secs: None,
            transcript: Some(TranscriptSource::Inline(words)),
            profile: ProfileKind::VerticalShort,
            output: self.dir.path().join("out").join("final.mp4"),
            words_per_cue: Some(2),
            caption: CaptionOptions {
                seed: Some(11),
                ..Default::default()
            },
            background_music: None,
        }
    }

    fn options(&self) -> RenderOptions {
        RenderOptions {
            work_root: self.work_root.clone(),
            fonts_dir: None,
            words_per_cue: 3,
            srt_sidecar: false,
        }
    }

    fn work_root_is_empty(&self) -> bool {
        std::fs::read_dir(&self.work_root).unwrap().next().is_none()
    }
}

fn words() -> Vec<Word> {
    vec![
        Word::new("uno", 0.0, 0.5),
        Word::new("dos", 0.6, 1.0),
        Word::new("tres", 1.2, 1.8),
    ]
}

#[test]
fn without_transcript_runs_single_pass() {
    let fixture = Fixture::new();
    let engine = FakeEngine {
        clip_secs: 2.0,
        ..Default::default()
    };

    let summary = render_blocking(&fixture.request(Vec::new()), &engine, &fixture.options(), None)
        .unwrap();

    assert_eq!(summary.passes, vec![RenderPass::Base]);
    assert_eq!(summary.cues, 0);
    assert!(summary.look.is_none());
    assert_eq!(std::fs::read_to_string(&summary.output).unwrap(), "base render");
    assert!(fixture.work_root_is_empty());

    let calls = engine.calls();
    assert_eq!(calls.len(), 1);
    let args = calls[0].to_args();
    let t = args.iter().rposition(|a| a == "-t").unwrap();
    assert_eq!(args[t + 1], "9.000");
    assert!(args.contains(&"[outv]".to_string()));
    assert!(args.contains(&"3:a".to_string()));
}

#[test]
fn transcript_adds_overlay_pass_and_cleans_up() {
    let fixture = Fixture::new();
    let engine = FakeEngine {
        clip_secs: 2.0,
        ..Default::default()
    };
    let mut options = fixture.options();
    options.srt_sidecar = true;

    let summary = render_blocking(&fixture.request(words()), &engine, &options, None).unwrap();

    assert_eq!(summary.passes, vec![RenderPass::Base, RenderPass::CaptionOverlay]);
    assert_eq!(summary.cues, 2);
    assert_eq!(std::fs::read_to_string(&summary.output).unwrap(), "caption overlay");
    let sidecar = summary.sidecar.unwrap();
    assert!(std::fs::read_to_string(sidecar).unwrap().contains("uno dos"));
    assert!(fixture.work_root_is_empty());

    let calls = engine.calls();
    assert_eq!(calls.len(), 2);
    let overlay = &calls[1];
    assert_eq!(overlay.inputs[0].path, calls[0].output);
    assert!(overlay.video_filter.as_deref().unwrap().starts_with("ass='"));
    assert!(overlay.duration_secs.is_none());
    let args = overlay.to_args();
    let ca = args.iter().position(|a| a == "-c:a").unwrap();
    assert_eq!(args[ca + 1], "copy");
}

#[test]
fn overlay_failure_leaves_no_output() {
    let fixture = Fixture::new();
    let engine = FakeEngine {
        clip_secs: 2.0,
        fail_on: Some(RenderPass::CaptionOverlay),
        ..Default::default()
    };
    let request = fixture.request(words());

    let err = render_blocking(&request, &engine, &fixture.options(), None).unwrap_err();

    match err {
        ReelError::Engine {
            pass, diagnostics, ..
        } => {
            assert_eq!(pass, RenderPass::CaptionOverlay);
            assert!(diagnostics.contains("Error opening output file"));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!request.output.exists());
    assert!(fixture.work_root_is_empty());
}

#[test]
fn sidecar_failure_removes_finished_output() {
    let fixture = Fixture::new();
    let engine = FakeEngine {
        clip_secs: 2.0,
        ..Default::default()
    };
    let request = fixture.request(vec![Word::new("hola", 0.0, 0.5)]);
    let mut options = fixture.options();
    options.srt_sidecar = true;
    // A directory where the sidecar should go makes placing it fail.
    std::fs::create_dir_all(request.output.with_extension("srt")).unwrap();

    assert!(render_blocking(&request, &engine, &options, None).is_err());
    assert_eq!(engine.calls().len(), 2);
    assert!(!request.output.exists());
    assert!(fixture.work_root_is_empty());
}

#[test]
fn base_failure_skips_overlay() {
    let fixture = Fixture::new();
    let engine = FakeEngine {
        clip_secs: 2.0,
        fail_on: Some(RenderPass::Base),
        ..Default::default()
    };
    let request = fixture.request(words());

    assert!(render_blocking(&request, &engine, &fixture.options(), None).is_err());
    assert_eq!(engine.calls().len(), 1);
    assert!(!request.output.exists());
    assert!(fixture.work_root_is_empty());
}

#[test]
fn missing_asset_aborts_before_engine() {
    let fixture = Fixture::new();
    let engine = FakeEngine::default();
    let mut request = fixture.request(words());
    request.media.push(MediaRef {
        path: fixture.dir.path().join("gone.jpg"),
        scene: Some(4),
    });

    let err = render_blocking(&request, &engine, &fixture.options(), None).unwrap_err();
    assert!(matches!(err, ReelError::MissingAsset { ref path } if path.ends_with("gone.jpg")));
    assert!(engine.calls().is_empty());
    assert!(!request.output.exists());
}

#[test]
fn plan_orders_and_reconciles_segments() {
    let fixture = Fixture::new();
    let engine = FakeEngine {
        clip_secs: 1.5,
        ..Default::default()
    };

    let plan = plan_render(&fixture.request(words()), &engine).unwrap();

    let names: Vec<String> = plan
        .segments
        .iter()
        .map(|s| s.source_path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["scene1.jpg", "scene2.mp4", "scene3.png"]);
    assert_eq!(plan.segments[1].allocated_duration_secs, 1.5);
    assert!((plan.segments[0].allocated_duration_secs - 3.75).abs() < 1e-9);
    assert!((plan.graph.timeline_secs - 9.0).abs() < 1e-9);
    assert_eq!(plan.words.len(), 3);
}

#[tokio::test]
async fn async_render_reports_progress() {
    let fixture = Fixture::new();
    let engine = Arc::new(FakeEngine {
        clip_secs: 2.0,
        ..Default::default()
    });
    let stages = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&stages);
    let progress: ProgressCallback = Box::new(move |p: RenderProgress| {
        sink.lock().unwrap().push(p.stage);
    });

    let summary = render(
        fixture.request(Vec::new()),
        engine.clone(),
        fixture.options(),
        Some(progress),
    )
    .await
    .unwrap();

    assert!(summary.output.exists());
    let stages = stages.lock().unwrap().clone();
    assert_eq!(stages.first(), Some(&RenderStage::Planning));
    assert!(stages.contains(&RenderStage::BaseRender));
    assert_eq!(stages.last(), Some(&RenderStage::Complete));
}

impl Fixture {
    fn sectioned(&self, sections: usize) -> SectionedRequest {
        SectionedRequest {
            sections: (0..sections)
                .map(|_| {
                    let mut section = self.request(Vec::new());
                    section.output = PathBuf::new();
                    section
                })
                .collect(),
            output: self.dir.path().join("out").join("long.mp4"),
        }
    }
}

#[test]
fn sections_render_then_join_by_stream_copy() {
    let fixture = Fixture::new();
    let engine = FakeEngine {
        clip_secs: 2.0,
        ..Default::default()
    };
    let request = fixture.sectioned(2);

    let summary = render_sections_blocking(&request, &engine, &fixture.options(), None).unwrap();

    assert_eq!(summary.sections.len(), 2);
    assert!((summary.duration_secs - 18.0).abs() < 1e-9);
    assert_eq!(std::fs::read_to_string(&request.output).unwrap(), "section join");
    assert!(fixture.work_root_is_empty());

    let calls = engine.calls();
    let passes: Vec<RenderPass> = calls.iter().map(|c| c.pass).collect();
    assert_eq!(
        passes,
        vec![RenderPass::Base, RenderPass::Base, RenderPass::SectionJoin]
    );
    let args = calls[2].to_args().join(" ");
    assert!(args.contains("-f concat -safe 0 -i "));
    assert!(args.contains(" -c copy "));
    assert!(calls[2].filter_complex.is_none());

    let lists = engine.join_lists.lock().unwrap().clone();
    let lines: Vec<&str> = lists[0].lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("file '") && lines[0].ends_with("section_001.mp4'"));
    assert!(lines[1].ends_with("section_002.mp4'"));
}

#[test]
fn join_failure_leaves_no_output() {
    let fixture = Fixture::new();
    let engine = FakeEngine {
        clip_secs: 2.0,
        fail_on: Some(RenderPass::SectionJoin),
        ..Default::default()
    };
    let request = fixture.sectioned(2);

    let err = render_sections_blocking(&request, &engine, &fixture.options(), None).unwrap_err();

    assert!(matches!(err, ReelError::Engine { pass: RenderPass::SectionJoin, .. }));
    assert!(!request.output.exists());
    assert!(fixture.work_root_is_empty());
}

#[test]
fn missing_section_asset_renders_nothing() {
    let fixture = Fixture::new();
    let engine = FakeEngine::default();
    let mut request = fixture.sectioned(2);
    request.sections[1].narration = fixture.dir.path().join("gone.mp3");

    let err = render_sections_blocking(&request, &engine, &fixture.options(), None).unwrap_err();

    assert!(matches!(err, ReelError::MissingAsset { ref path } if path.ends_with("gone.mp3")));
    assert!(engine.calls().is_empty());
    assert!(!request.output.exists());
}

#[test]
fn sections_plan_without_output_but_do_not_render_alone() {
    let fixture = Fixture::new();
    let engine = FakeEngine {
        clip_secs: 2.0,
        ..Default::default()
    };
    let section = fixture.sectioned(1).sections.remove(0);

    assert_eq!(plan_render(&section, &engine).unwrap().segments.len(), 3);
    let err = render_blocking(&section, &engine, &fixture.options(), None).unwrap_err();
    assert!(matches!(err, ReelError::InvalidRequest { .. }));
    assert!(engine.calls().is_empty());
}
