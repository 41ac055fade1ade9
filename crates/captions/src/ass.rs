//! ASS (Advanced SubStation Alpha) karaoke serialization.
//!
//! One `Dialogue` line per cue, spanning the whole cue with a short fade.
//! Inside it every word carries two `\t` transforms keyed to its highlight
//! window: a ramp into the highlight state at the word start and a ramp
//! back to neutral at the word end. Style variants only change which
//! override tags are animated; the timing is shared.

use std::path::{Path, PathBuf};

use reelforge_common::error::ReelResult;
use reelforge_project_model::profile::RenderProfile;
use serde::Serialize;

use crate::style::{CaptionLook, CaptionStyle};
use crate::timeline::{CaptionCue, CaptionTimeline, CueWord};

/// Fade in/out applied to each cue.
pub const CUE_FADE_MS: u64 = 150;

/// Duration of the transition into and out of the highlight state.
pub const HIGHLIGHT_RAMP_MS: u64 = 50;

/// File name of the subtitle artifact inside the job directory.
pub const ARTIFACT_FILE_NAME: &str = "captions.ass";

const NEUTRAL_COLOR: &str = "&HFFFFFF&";
const OUTLINE_COLOR: &str = "&H000000&";
const TRANSPARENT: &str = "&HFF&";
const OPAQUE: &str = "&H00&";

/// Placement and size of captions on the frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CaptionLayout {
    pub font_size: u32,
    pub outline: u32,
    pub shadow: u32,
    pub margin_h: u32,
    pub margin_v: u32,
}

impl CaptionLayout {
    pub fn for_profile(profile: &RenderProfile) -> Self {
        Self {
            font_size: 85,
            outline: 4,
            shadow: 2,
            margin_h: 40,
            margin_v: if profile.is_vertical() { 330 } else { 180 },
        }
    }
}

/// Serializes a caption timeline with one look.
#[derive(Debug, Clone)]
pub struct AssRenderer {
    width: u32,
    height: u32,
    look: CaptionLook,
    layout: CaptionLayout,
}

impl AssRenderer {
    pub fn new(profile: &RenderProfile, look: CaptionLook) -> Self {
        Self {
            width: profile.width,
            height: profile.height,
            look,
            layout: CaptionLayout::for_profile(profile),
        }
    }

    pub fn look(&self) -> &CaptionLook {
        &self.look
    }

    /// Script info and the single default style.
    pub fn header(&self) -> String {
        let layout = &self.layout;
        // Box draws an opaque box from the outline color; the others a plain outline.
        let (border_style, outline_color) = match self.look.style {
            CaptionStyle::Box => (3, "&HFF000000"),
            CaptionStyle::Pulse | CaptionStyle::Fill => (1, "&H00000000"),
        };

        format!(
            "[Script Info]\n\
             ScriptType: v4.00+\n\
             PlayResX: {w}\n\
             PlayResY: {h}\n\
             WrapStyle: 0\n\
             ScaledBorderAndShadow: yes\n\
             \n\
             [V4+ Styles]\n\
             Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
             Style: Default,{font},{size},&H00FFFFFF,&H000000FF,{outline_color},&HA0000000,-1,0,0,0,100,100,0,0,{border_style},{outline},{shadow},2,{mh},{mh},{mv},1\n\
             \n\
             [Events]\n\
             Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n",
            w = self.width,
            h = self.height,
            font = self.look.font.family,
            size = layout.font_size,
            outline = layout.outline,
            shadow = layout.shadow,
            mh = layout.margin_h,
            mv = layout.margin_v,
        )
    }

    /// The `Dialogue` line for one cue.
    pub fn dialogue(&self, cue: &CaptionCue) -> String {
        let mut text = format!("{{\\fad({CUE_FADE_MS},{CUE_FADE_MS})}}");
        for (i, word) in cue.words.iter().enumerate() {
            if i > 0 {
                text.push(' ');
            }
            text.push_str(&self.word_tags(word));
            text.push_str(&sanitize_word(&word.text));
        }

        format!(
            "Dialogue: 0,{},{},Default,,0,0,0,,{}",
            ass_timestamp(cue.start_secs),
            ass_timestamp(cue.end_secs),
            text
        )
    }

    /// Override tags placed before a word.
    fn word_tags(&self, word: &CueWord) -> String {
        let (on_start, on_end, off_start, off_end) = ramp_bounds(word);
        let hi = self.look.color.ass;

        match self.look.style {
            CaptionStyle::Pulse => format!(
                "{{\\t({on_start},{on_end},\\c{hi}\\fscx120\\fscy120)}}\
                 {{\\t({off_start},{off_end},\\c{NEUTRAL_COLOR}\\fscx100\\fscy100)}}"
            ),
            CaptionStyle::Box => format!(
                "{{\\3c{hi}\\3a{TRANSPARENT}\\t({on_start},{on_end},\\3a{OPAQUE})}}\
                 {{\\t({off_start},{off_end},\\3a{TRANSPARENT})}}"
            ),
            CaptionStyle::Fill => format!(
                "{{\\t({on_start},{on_end},\\c{hi}\\3c{hi})}}\
                 {{\\t({off_start},{off_end},\\c{NEUTRAL_COLOR}\\3c{OUTLINE_COLOR})}}"
            ),
        }
    }

    /// The complete document.
    pub fn render(&self, timeline: &CaptionTimeline) -> String {
        let mut out = self.header();
        for cue in timeline.iter() {
            out.push_str(&self.dialogue(cue));
            out.push('\n');
        }
        out
    }
}

/// A subtitle file ready for the overlay pass.
#[derive(Debug, Clone, Serialize)]
pub struct SubtitleArtifact {
    pub path: PathBuf,
    /// Directory the overlay filter should load fonts from.
    pub fonts_dir: Option<PathBuf>,
    pub cue_count: usize,
    pub look: CaptionLook,
}

/// Write the timeline to `dir`. Returns `None` for an empty timeline.
pub fn write_subtitle_artifact(
    timeline: &CaptionTimeline,
    renderer: &AssRenderer,
    dir: &Path,
    fonts_dir: Option<&Path>,
) -> ReelResult<Option<SubtitleArtifact>> {
    if timeline.is_empty() {
        tracing::info!("No transcript words, skipping caption artifact");
        return Ok(None);
    }

    let path = dir.join(ARTIFACT_FILE_NAME);
    std::fs::write(&path, renderer.render(timeline))?;

    let look = *renderer.look();
    let fonts_dir = if look.font.needs_fonts_dir() {
        fonts_dir.map(Path::to_path_buf)
    } else {
        None
    };

    tracing::info!(
        path = %path.display(),
        cues = timeline.len(),
        "Caption artifact written"
    );

    Ok(Some(SubtitleArtifact {
        path,
        fonts_dir,
        cue_count: timeline.len(),
        look,
    }))
}

/// Format seconds as an ASS timestamp: `H:MM:SS.cc`.
pub fn ass_timestamp(secs: f64) -> String {
    let total_cs = (secs.max(0.0) * 100.0).round() as u64;
    let hours = total_cs / 360_000;
    let minutes = (total_cs % 360_000) / 6_000;
    let seconds = (total_cs % 6_000) / 100;
    let centis = total_cs % 100;
    format!("{hours}:{minutes:02}:{seconds:02}.{centis:02}")
}

/// Upper-case a word and neutralize ASS override characters.
pub fn sanitize_word(text: &str) -> String {
    text.trim()
        .to_uppercase()
        .chars()
        .map(|c| match c {
            '{' => '(',
            '}' => ')',
            '\\' => '/',
            '\n' | '\r' => ' ',
            other => other,
        })
        .collect()
}

/// `(on_start, on_end, off_start, off_end)` in cue-relative ms, monotonic.
fn ramp_bounds(word: &CueWord) -> (u64, u64, u64, u64) {
    let start = word.highlight_start_ms;
    let end = word.highlight_end_ms.max(start);
    let on_end = (start + HIGHLIGHT_RAMP_MS).min(end);
    let off_start = end.saturating_sub(HIGHLIGHT_RAMP_MS).max(on_end);
    (start, on_end, off_start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{FontChoice, HighlightColor};
    use reelforge_project_model::narration::Word;

    fn look(style: CaptionStyle) -> CaptionLook {
        CaptionLook {
            style,
            color: HighlightColor::PALETTE[0],
            font: FontChoice::CATALOG[0],
        }
    }

    fn timeline() -> CaptionTimeline {
        let words = vec![
            Word::new("hola", 0.0, 0.4),
            Word::new("mundo", 0.5, 1.0),
            Word::new("{raro}", 1.2, 1.25),
        ];
        CaptionTimeline::build(&words, 3).unwrap()
    }

    #[test]
    fn test_timestamp_formatting() {
        assert_eq!(ass_timestamp(0.0), "0:00:00.00");
        assert_eq!(ass_timestamp(3661.29), "1:01:01.29");
        assert_eq!(ass_timestamp(-1.0), "0:00:00.00");
    }

    #[test]
    fn test_pulse_dialogue_matches_karaoke_layout() {
        let renderer = AssRenderer::new(&RenderProfile::vertical_short(), look(CaptionStyle::Pulse));
        let line = renderer.dialogue(&timeline().cues[0]);
        assert!(line.starts_with("Dialogue: 0,0:00:00.00,0:00:01.25,Default,,0,0,0,,{\\fad(150,150)}"));
        assert!(line.contains("{\\t(0,50,\\c&H00FFFF&\\fscx120\\fscy120)}{\\t(350,400,\\c&HFFFFFF&\\fscx100\\fscy100)}HOLA"));
        assert!(line.contains("{\\t(500,550,\\c&H00FFFF&\\fscx120\\fscy120)}{\\t(950,1000,"));
        assert!(line.ends_with("(RARO)"));
    }

    #[test]
    fn test_short_word_ramps_stay_monotonic() {
        let renderer = AssRenderer::new(&RenderProfile::vertical_short(), look(CaptionStyle::Pulse));
        let line = renderer.dialogue(&timeline().cues[0]);
        // "{raro}" lasts 50ms starting at 1200ms.
        assert!(line.contains("\\t(1200,1250,\\c&H00FFFF&"));
        assert!(line.contains("\\t(1250,1250,\\c&HFFFFFF&"));
    }

    #[test]
    fn test_styles_share_timing() {
        let profile = RenderProfile::vertical_short();
        let cue = &timeline().cues[0];
        let windows = |style| -> Vec<String> {
            let line = AssRenderer::new(&profile, look(style)).dialogue(cue);
            line.split("\\t(")
                .skip(1)
                .map(|part| part.split(',').take(2).collect::<Vec<_>>().join(","))
                .collect()
        };
        let pulse = windows(CaptionStyle::Pulse);
        assert_eq!(pulse.len(), 6);
        assert_eq!(pulse, windows(CaptionStyle::Box));
        assert_eq!(pulse, windows(CaptionStyle::Fill));
    }

    #[test]
    fn test_box_style_uses_opaque_box_border() {
        let renderer = AssRenderer::new(&RenderProfile::horizontal_long(), look(CaptionStyle::Box));
        let header = renderer.header();
        assert!(header.contains("PlayResX: 1920"));
        assert!(header.contains(",3,4,2,2,40,40,180,1"));
        assert!(renderer.dialogue(&timeline().cues[0]).contains("\\3c&H00FFFF&\\3a&HFF&"));
    }

    #[test]
    fn test_artifact_written_only_with_cues() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = AssRenderer::new(&RenderProfile::vertical_short(), look(CaptionStyle::Fill));

        let none = write_subtitle_artifact(&CaptionTimeline::default(), &renderer, dir.path(), None).unwrap();
        assert!(none.is_none());
        assert!(!dir.path().join(ARTIFACT_FILE_NAME).exists());

        let artifact = write_subtitle_artifact(&timeline(), &renderer, dir.path(), Some(dir.path()))
            .unwrap()
            .unwrap();
        assert_eq!(artifact.cue_count, 1);
        // System font: no fonts directory needed.
        assert!(artifact.fonts_dir.is_none());
        let content = std::fs::read_to_string(&artifact.path).unwrap();
        assert!(content.contains("Style: Default,Arial Black,85,"));
        assert_eq!(content.matches("Dialogue:").count(), 1);
    }
}
