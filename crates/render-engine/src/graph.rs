//! Structured filter graphs.
//!
//! The graph is a list of typed stages with explicit input and output pads.
//! It is only turned into the engine's `-filter_complex` text by
//! [`FilterGraph::to_filter_complex`], at the invocation boundary.
//!
//! ```text
//! [0:v] normalize+motion [v0] ─┐
//! [1:v] normalize+motion [v1] ─┼─ concat [vconcat] ─ (tpad) ─ eq [outv]
//! [2:v] normalize        [v2] ─┘
//! [3:a] narration ───────────────────────────────┬─ (amix) ─ [outa] / 3:a
//! [4:a] background music ── volume ── afade ─────┘
//! ```

use std::fmt;
use std::path::PathBuf;

use reelforge_common::error::{ReelError, ReelResult};
use reelforge_processing_core::motion::{HorizontalPanMotion, KenBurnsMotion, PanDirection};
use reelforge_processing_core::reconcile::RECONCILE_TOLERANCE_SECS;
use reelforge_processing_core::{MotionDescriptor, SegmentMotion};
use reelforge_project_model::profile::{PanAxis, RenderProfile};
use reelforge_project_model::request::BackgroundMusic;
use serde::Serialize;

/// Music fade-out length at the end of the narration.
const MUSIC_FADE_OUT_SECS: f64 = 3.0;

/// A labelled link between stages, or an input stream selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pad(String);

impl Pad {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// The video stream of input `index`.
    pub fn video_of(index: usize) -> Self {
        Self(format!("{index}:v"))
    }

    /// The audio stream of input `index`.
    pub fn audio_of(index: usize) -> Self {
        Self(format!("{index}:a"))
    }

    pub fn label(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

/// A single filter with positional and named arguments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Filter {
    pub name: String,
    pub args: Vec<(Option<String>, String)>,
}

impl Filter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: impl fmt::Display) -> Self {
        self.args.push((None, value.to_string()));
        self
    }

    /// Append a `key=value` argument.
    pub fn kv(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.args.push((Some(key.to_string()), value.to_string()));
        self
    }

    /// Append a `key='expression'` argument. Quoting protects commas.
    pub fn expr(mut self, key: &str, expression: impl fmt::Display) -> Self {
        self.args
            .push((Some(key.to_string()), format!("'{expression}'")));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(k, _)| k.as_deref() == Some(key))
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (i, (key, value)) in self.args.iter().enumerate() {
            f.write_str(if i == 0 { "=" } else { ":" })?;
            match key {
                Some(key) => write!(f, "{key}={value}")?,
                None => f.write_str(value)?,
            }
        }
        Ok(())
    }
}

/// What a stage does, for inspection and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Per-segment normalization and motion, tagged with the segment index.
    Segment(usize),
    Concat,
    Finish,
    Music,
    AudioMix,
}

/// A filter chain from input pads to output pads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stage {
    pub kind: StageKind,
    pub inputs: Vec<Pad>,
    pub chain: Vec<Filter>,
    pub outputs: Vec<Pad>,
}

impl Stage {
    pub fn has_filter(&self, name: &str) -> bool {
        self.chain.iter().any(|f| f.name == name)
    }

    pub fn filter(&self, name: &str) -> Option<&Filter> {
        self.chain.iter().find(|f| f.name == name)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pad in &self.inputs {
            write!(f, "{pad}")?;
        }
        for (i, filter) in self.chain.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{filter}")?;
        }
        for pad in &self.outputs {
            write!(f, "{pad}")?;
        }
        Ok(())
    }
}

/// Role of an engine input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputRole {
    Segment,
    Narration,
    Music,
    /// Concat demuxer list of rendered sections.
    SectionList,
}

/// An engine input with its per-input options.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphInput {
    pub path: PathBuf,
    pub role: InputRole,
    /// Options placed before `-i`, e.g. `-t 4.000`.
    pub options: Vec<String>,
}

/// Where the output audio comes from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioSource {
    /// An input's audio stream, mapped directly.
    Input(usize),
    /// A pad produced by the graph.
    Pad(Pad),
}

impl AudioSource {
    /// Argument for `-map`.
    pub fn map_arg(&self) -> String {
        match self {
            AudioSource::Input(index) => format!("{index}:a"),
            AudioSource::Pad(pad) => pad.to_string(),
        }
    }
}

/// A complete base-render graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterGraph {
    pub inputs: Vec<GraphInput>,
    pub stages: Vec<Stage>,
    pub video_out: Pad,
    pub audio_out: AudioSource,
    /// Summed segment length before padding or capping.
    pub timeline_secs: f64,
    /// Authoritative output length.
    pub output_secs: f64,
}

impl FilterGraph {
    /// Serialize for `-filter_complex`.
    pub fn to_filter_complex(&self) -> String {
        self.stages
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(";")
    }

    pub fn segment_stages(&self) -> impl Iterator<Item = &Stage> {
        self.stages
            .iter()
            .filter(|s| matches!(s.kind, StageKind::Segment(_)))
    }

    pub fn stage(&self, kind: StageKind) -> Option<&Stage> {
        self.stages.iter().find(|s| s.kind == kind)
    }

    /// Number of stages containing a filter.
    pub fn count_filter(&self, name: &str) -> usize {
        self.stages.iter().filter(|s| s.has_filter(name)).count()
    }
}

/// Builds the base-render graph from segment motions.
pub struct FilterGraphBuilder<'a> {
    profile: &'a RenderProfile,
    tolerance_secs: f64,
}

impl<'a> FilterGraphBuilder<'a> {
    pub fn new(profile: &'a RenderProfile) -> Self {
        Self {
            profile,
            tolerance_secs: RECONCILE_TOLERANCE_SECS,
        }
    }

    /// Build the graph.
    ///
    /// Segment stages follow `motions` order, which must be ascending by
    /// index. The narration input follows the segments and the optional
    /// music input comes last.
    pub fn build(
        &self,
        motions: &[SegmentMotion],
        narration: &std::path::Path,
        narration_secs: f64,
        music: Option<&BackgroundMusic>,
    ) -> ReelResult<FilterGraph> {
        if motions.is_empty() {
            return Err(ReelError::render("cannot build a graph without segments"));
        }
        if motions.windows(2).any(|w| w[0].index >= w[1].index) {
            return Err(ReelError::render("segment motions are not in index order"));
        }

        let mut inputs = Vec::with_capacity(motions.len() + 2);
        let mut stages = Vec::with_capacity(motions.len() + 4);
        let mut concat_inputs = Vec::with_capacity(motions.len());

        for (input_index, motion) in motions.iter().enumerate() {
            let out = Pad::new(format!("v{input_index}"));
            inputs.push(GraphInput {
                path: motion.source_path.clone(),
                role: InputRole::Segment,
                options: segment_input_options(motion),
            });
            stages.push(Stage {
                kind: StageKind::Segment(motion.index),
                inputs: vec![Pad::video_of(input_index)],
                chain: self.segment_chain(motion),
                outputs: vec![out.clone()],
            });
            concat_inputs.push(out);
        }

        let concatenated = Pad::new("vconcat");
        stages.push(Stage {
            kind: StageKind::Concat,
            inputs: concat_inputs,
            chain: vec![Filter::new("concat")
                .kv("n", motions.len())
                .kv("v", 1)
                .kv("a", 0)],
            outputs: vec![concatenated.clone()],
        });

        let fps = self.profile.fps;
        let timeline_secs: f64 = motions.iter().map(|m| m.rendered_secs(fps)).sum();
        let shortfall = narration_secs - timeline_secs;
        let mut finish = Vec::with_capacity(2);
        if shortfall > self.tolerance_secs {
            tracing::warn!(
                timeline_secs,
                narration_secs,
                hold_secs = shortfall,
                "Segments end before the narration, holding the last frame"
            );
            finish.push(
                Filter::new("tpad")
                    .kv("stop_mode", "clone")
                    .kv("stop_duration", num(shortfall)),
            );
        }
        let grade = &self.profile.color_grade;
        finish.push(
            Filter::new("eq")
                .kv("saturation", num(grade.saturation))
                .kv("brightness", num(grade.brightness))
                .kv("contrast", num(grade.contrast)),
        );

        let video_out = Pad::new("outv");
        stages.push(Stage {
            kind: StageKind::Finish,
            inputs: vec![concatenated],
            chain: finish,
            outputs: vec![video_out.clone()],
        });

        let narration_index = inputs.len();
        inputs.push(GraphInput {
            path: narration.to_path_buf(),
            role: InputRole::Narration,
            options: Vec::new(),
        });

        let audio_out = match music {
            None => AudioSource::Input(narration_index),
            Some(music) => {
                let music_index = inputs.len();
                inputs.push(GraphInput {
                    path: music.path.clone(),
                    role: InputRole::Music,
                    options: vec!["-stream_loop".to_string(), "-1".to_string()],
                });

                let bed = Pad::new("music");
                let fade = MUSIC_FADE_OUT_SECS.min(narration_secs);
                stages.push(Stage {
                    kind: StageKind::Music,
                    inputs: vec![Pad::audio_of(music_index)],
                    chain: vec![
                        Filter::new("atrim").arg(0).arg(num(narration_secs)),
                        Filter::new("asetpts").arg("PTS-STARTPTS"),
                        Filter::new("volume").arg(num(music.volume)),
                        Filter::new("afade")
                            .kv("t", "out")
                            .kv("st", num((narration_secs - fade).max(0.0)))
                            .kv("d", num(fade)),
                    ],
                    outputs: vec![bed.clone()],
                });

                let mixed = Pad::new("outa");
                stages.push(Stage {
                    kind: StageKind::AudioMix,
                    inputs: vec![Pad::audio_of(narration_index), bed],
                    chain: vec![Filter::new("amix")
                        .kv("inputs", 2)
                        .kv("duration", "first")
                        .kv("dropout_transition", 2)],
                    outputs: vec![mixed.clone()],
                });
                AudioSource::Pad(mixed)
            }
        };

        tracing::debug!(
            segments = motions.len(),
            stages = stages.len(),
            timeline_secs,
            narration_secs,
            "Filter graph built"
        );

        Ok(FilterGraph {
            inputs,
            stages,
            video_out,
            audio_out,
            timeline_secs,
            output_secs: narration_secs,
        })
    }

    fn segment_chain(&self, motion: &SegmentMotion) -> Vec<Filter> {
        let (w, h, fps) = (self.profile.width, self.profile.height, self.profile.fps);
        let settle = [
            Filter::new("fps").arg(fps),
            Filter::new("setpts").arg("PTS-STARTPTS"),
        ];

        let mut chain = match &motion.descriptor {
            MotionDescriptor::ClipPassThrough { .. } => cover(w, h),
            MotionDescriptor::KenBurns(kb) => {
                let mut chain = cover(w, h);
                chain.push(ken_burns_filter(kb, w, h, fps));
                chain
            }
            MotionDescriptor::HorizontalPan(pan) => horizontal_pan_chain(pan, w, h, fps),
        };
        chain.extend(settle);
        chain
    }
}

/// Input options for a segment: trimmed clips are cut at their allocation.
fn segment_input_options(motion: &SegmentMotion) -> Vec<String> {
    match motion.descriptor {
        MotionDescriptor::ClipPassThrough {
            duration_cap_secs: Some(cap),
        } => vec!["-t".to_string(), format!("{cap:.3}")],
        _ => Vec::new(),
    }
}

/// Scale to cover the frame and center-crop.
fn cover(w: u32, h: u32) -> Vec<Filter> {
    vec![
        Filter::new("scale")
            .arg(w)
            .arg(h)
            .kv("force_original_aspect_ratio", "increase"),
        Filter::new("crop").arg(w).arg(h),
        Filter::new("setsar").arg(1),
    ]
}

fn ken_burns_filter(kb: &KenBurnsMotion, w: u32, h: u32, fps: u32) -> Filter {
    let mid = num(kb.midpoint());
    let k = kb.exponent;
    let rest = num(kb.zoom_rest);
    let span = num(kb.zoom_span());

    let zoom = format!(
        "if(lte(on,{mid}),{rest}+{span}*pow(1-on/{mid},{k}),{rest}+{span}*pow((on-{mid})/{mid},{k}))"
    );
    let eased = format!("if(lte(on,{mid}),1-pow(1-on/{mid},{k}),pow((on-{mid})/{mid},{k}))");
    let travel = format!(
        "({}+{}*{}*{eased})",
        num(kb.pattern.factor),
        num(kb.pattern.range()),
        num(kb.pattern.direction)
    );
    let centered_x = "iw/2-(iw/zoom/2)";
    let centered_y = "ih/2-(ih/zoom/2)";
    let (x, y) = match kb.pattern.axis {
        PanAxis::Horizontal => (
            format!("{centered_x}+iw*(1-1/zoom)*{travel}"),
            centered_y.to_string(),
        ),
        PanAxis::Vertical => (
            centered_x.to_string(),
            format!("{centered_y}+ih*(1-1/zoom)*{travel}"),
        ),
    };

    Filter::new("zoompan")
        .expr("z", zoom)
        .kv("d", kb.frame_count)
        .expr("x", x)
        .expr("y", y)
        .kv("s", format!("{w}x{h}"))
        .kv("fps", fps)
}

fn horizontal_pan_chain(pan: &HorizontalPanMotion, w: u32, h: u32, fps: u32) -> Vec<Filter> {
    let frames = pan.frame_count.max(1);
    let travel = pan.travel_px;
    let x = match pan.direction {
        PanDirection::LeftToRight => format!("min(n*{travel}/{frames},{travel})"),
        PanDirection::RightToLeft => format!("max({travel}-n*{travel}/{frames},0)"),
    };

    vec![
        Filter::new("scale")
            .arg(pan.scaled_width)
            .arg(h)
            .kv("force_original_aspect_ratio", "increase"),
        Filter::new("crop").arg(pan.scaled_width).arg(h),
        Filter::new("loop")
            .kv("loop", frames - 1)
            .kv("size", 1)
            .kv("start", 0),
        Filter::new("setpts").arg(format!("N/({fps}*TB)")),
        Filter::new("crop").arg(w).arg(h).expr("x", x).kv("y", 0),
        Filter::new("setsar").arg(1),
    ]
}

/// Compact decimal formatting for filter arguments.
pub(crate) fn num(value: f64) -> String {
    let text = format!("{value:.4}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "" | "-" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use reelforge_processing_core::MotionSynthesizer;
    use reelforge_project_model::segment::MediaSegment;
    use std::path::Path;

    fn image(index: usize, secs: f64) -> MediaSegment {
        let mut segment = MediaSegment::image(index, format!("/media/{index}.jpg"));
        segment.allocated_duration_secs = secs;
        segment
    }

    fn clip(index: usize, native: f64, secs: f64) -> MediaSegment {
        let mut segment = MediaSegment::clip(index, format!("/media/{index}.mp4"), native);
        segment.allocated_duration_secs = secs;
        segment.trimmed = native > secs;
        segment
    }

    fn graph(profile: &RenderProfile, segments: &[MediaSegment], narration: f64) -> FilterGraph {
        let motions = MotionSynthesizer::new(profile).synthesize_all(segments);
        FilterGraphBuilder::new(profile)
            .build(&motions, Path::new("/media/voice.mp3"), narration, None)
            .unwrap()
    }

    #[test]
    fn test_num_formatting() {
        assert_eq!(num(1.0), "1");
        assert_eq!(num(0.05), "0.05");
        assert_eq!(num(-0.3), "-0.3");
        assert_eq!(num(37.5), "37.5");
        assert_eq!(num(-0.00001), "0");
    }

    #[test]
    fn test_filter_display() {
        let f = Filter::new("crop").arg(1080).arg(1920).expr("x", "min(n,2)");
        assert_eq!(f.to_string(), "crop=1080:1920:x='min(n,2)'");
        assert_eq!(Filter::new("null").to_string(), "null");
    }

    #[test]
    fn test_vertical_graph_layout() {
        let profile = RenderProfile::vertical_short();
        let g = graph(&profile, &[image(0, 3.0), clip(1, 2.0, 2.0), image(2, 4.0)], 9.0);

        assert_eq!(g.inputs.len(), 4);
        assert_eq!(g.inputs[3].role, InputRole::Narration);
        assert_eq!(g.audio_out.map_arg(), "3:a");
        assert_eq!(g.segment_stages().count(), 3);

        let fc = g.to_filter_complex();
        assert!(fc.starts_with(
            "[0:v]scale=1080:1920:force_original_aspect_ratio=increase,crop=1080:1920,setsar=1,zoompan=z='if(lte(on,45),1+0.7*pow(1-on/45,8),1+0.7*pow((on-45)/45,8))':d=90:"
        ));
        assert!(fc.contains(
            "[1:v]scale=1080:1920:force_original_aspect_ratio=increase,crop=1080:1920,setsar=1,fps=30,setpts=PTS-STARTPTS[v1]"
        ));
        assert!(fc.contains("[v0][v1][v2]concat=n=3:v=1:a=0[vconcat]"));
        assert!(fc.ends_with("[vconcat]eq=saturation=1.3:brightness=0.05:contrast=1.1[outv]"));
    }

    #[test]
    fn test_color_grade_applied_once_after_concat() {
        let profile = RenderProfile::vertical_short();
        let g = graph(&profile, &[image(0, 2.0), image(1, 2.0), image(2, 2.0)], 6.0);
        assert_eq!(g.count_filter("eq"), 1);
        let finish = g.stage(StageKind::Finish).unwrap();
        assert!(finish.has_filter("eq"));
        assert_eq!(finish.inputs, vec![Pad::new("vconcat")]);
        let order: Vec<StageKind> = g.stages.iter().map(|s| s.kind).collect();
        let concat_at = order.iter().position(|k| *k == StageKind::Concat).unwrap();
        let finish_at = order.iter().position(|k| *k == StageKind::Finish).unwrap();
        assert!(concat_at < finish_at);
    }

    #[test]
    fn test_pan_patterns_cycle_through_zoompan() {
        let profile = RenderProfile::vertical_short();
        let segments: Vec<MediaSegment> = (0..5).map(|i| image(i, 1.0)).collect();
        let g = graph(&profile, &segments, 5.0);
        let stages: Vec<&Stage> = g.segment_stages().collect();
        let x_of = |i: usize| stages[i].filter("zoompan").unwrap().get("x").unwrap().to_string();
        let y_of = |i: usize| stages[i].filter("zoompan").unwrap().get("y").unwrap().to_string();

        assert_eq!(x_of(0), x_of(4));
        assert!(x_of(0).contains("(-0.3+0.6*1*"));
        assert!(x_of(1).contains("(0.3+0.6*-1*"));
        assert_eq!(x_of(2), "'iw/2-(iw/zoom/2)'");
        assert!(y_of(2).contains("ih*(1-1/zoom)"));
    }

    #[test]
    fn test_trimmed_clip_gets_input_cap() {
        let profile = RenderProfile::vertical_short();
        let g = graph(&profile, &[clip(0, 9.0, 4.5), image(1, 4.5)], 9.0);
        assert_eq!(g.inputs[0].options, vec!["-t".to_string(), "4.500".to_string()]);
        assert!(g.inputs[1].options.is_empty());
    }

    #[test]
    fn test_horizontal_pan_chain() {
        let profile = RenderProfile::horizontal_long();
        let g = graph(&profile, &[image(0, 2.0), image(1, 2.0)], 4.0);
        let fc = g.to_filter_complex();
        assert!(fc.contains(
            "[0:v]scale=3840:1080:force_original_aspect_ratio=increase,crop=3840:1080,loop=loop=59:size=1:start=0,setpts=N/(30*TB),crop=1920:1080:x='min(n*634/60,634)':y=0,setsar=1,fps=30,setpts=PTS-STARTPTS[v0]"
        ));
        assert!(fc.contains("x='max(634-n*634/60,0)'"));
        assert_eq!(g.count_filter("zoompan"), 0);
    }

    #[test]
    fn test_shortfall_holds_last_frame() {
        let profile = RenderProfile::vertical_short();
        let g = graph(&profile, &[clip(0, 3.0, 3.0), clip(1, 4.0, 4.0)], 10.0);
        let finish = g.stage(StageKind::Finish).unwrap();
        let tpad = finish.filter("tpad").unwrap();
        assert_eq!(tpad.get("stop_mode"), Some("clone"));
        assert_eq!(tpad.get("stop_duration"), Some("3"));
        assert_eq!(g.output_secs, 10.0);

        let within = graph(&profile, &[clip(0, 9.95, 9.95)], 10.0);
        assert!(!within.stage(StageKind::Finish).unwrap().has_filter("tpad"));
    }

    #[test]
    fn test_many_fractional_stills_reach_narration_length() {
        let profile = RenderProfile::vertical_short();
        let stills: Vec<MediaSegment> = (0..20).map(|i| image(i, 1.865)).collect();
        let g = graph(&profile, &stills, 37.3);
        assert!((g.timeline_secs - 37.3).abs() < 1.0 / 30.0);
        assert!(!g.stage(StageKind::Finish).unwrap().has_filter("tpad"));
    }

    #[test]
    fn test_shortfall_measured_from_rendered_frames() {
        let profile = RenderProfile::vertical_short();
        let synth = MotionSynthesizer::new(&profile);
        // Synthesized one at a time, each still floors to 55 frames.
        let motions: Vec<SegmentMotion> = (0..20)
            .map(|i| synth.synthesize(&image(i, 1.865)))
            .collect();
        let g = FilterGraphBuilder::new(&profile)
            .build(&motions, Path::new("/media/voice.mp3"), 37.3, None)
            .unwrap();

        assert!((g.timeline_secs - 1100.0 / 30.0).abs() < 1e-9);
        let finish = g.stage(StageKind::Finish).unwrap();
        let hold: f64 = finish
            .filter("tpad")
            .and_then(|f| f.get("stop_duration"))
            .unwrap()
            .parse()
            .unwrap();
        assert!((hold - (37.3 - 1100.0 / 30.0)).abs() < 1e-3);
    }

    #[test]
    fn test_background_music_mix() {
        let profile = RenderProfile::horizontal_long();
        let motions = MotionSynthesizer::new(&profile).synthesize_all(&[image(0, 12.0)]);
        let music = BackgroundMusic {
            path: PathBuf::from("/media/bed.mp3"),
            volume: 0.1,
        };
        let g = FilterGraphBuilder::new(&profile)
            .build(&motions, Path::new("/media/voice.mp3"), 12.0, Some(&music))
            .unwrap();

        assert_eq!(g.inputs[2].role, InputRole::Music);
        assert_eq!(g.inputs[2].options, vec!["-stream_loop", "-1"]);
        assert_eq!(g.audio_out.map_arg(), "[outa]");
        let fc = g.to_filter_complex();
        assert!(fc.contains("[2:a]atrim=0:12,asetpts=PTS-STARTPTS,volume=0.1,afade=t=out:st=9:d=3[music]"));
        assert!(fc.contains("[1:a][music]amix=inputs=2:duration=first:dropout_transition=2[outa]"));
    }

    #[test]
    fn test_rejects_unordered_or_empty() {
        let profile = RenderProfile::vertical_short();
        let builder = FilterGraphBuilder::new(&profile);
        assert!(builder.build(&[], Path::new("a.mp3"), 1.0, None).is_err());

        let synth = MotionSynthesizer::new(&profile);
        let motions = vec![synth.synthesize(&image(1, 1.0)), synth.synthesize(&image(0, 1.0))];
        assert!(builder.build(&motions, Path::new("a.mp3"), 2.0, None).is_err());
    }

    proptest! {
        #[test]
        fn prop_one_stage_per_segment_and_single_grade(
            kinds in prop::collection::vec(any::<bool>(), 1..12),
            vertical in any::<bool>(),
        ) {
            let profile = if vertical {
                RenderProfile::vertical_short()
            } else {
                RenderProfile::horizontal_long()
            };
            let segments: Vec<MediaSegment> = kinds
                .iter()
                .enumerate()
                .map(|(i, is_image)| if *is_image { image(i, 1.5) } else { clip(i, 1.5, 1.5) })
                .collect();
            let g = graph(&profile, &segments, 1.5 * segments.len() as f64);

            prop_assert_eq!(g.segment_stages().count(), segments.len());
            prop_assert_eq!(g.count_filter("eq"), 1);
            prop_assert_eq!(g.count_filter("tpad"), 0);
            let concat = g.stage(StageKind::Concat).unwrap();
            prop_assert_eq!(concat.inputs.len(), segments.len());
            let expected: Vec<Pad> = (0..segments.len()).map(|i| Pad::new(format!("v{i}"))).collect();
            prop_assert_eq!(&concat.inputs, &expected);
        }
    }
}
