//! Caption looks: presentation style, highlight color and font.
//!
//! A look is chosen once per job and applied to every cue. Unset choices
//! are drawn from an injected RNG so a seed reproduces the same look.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use reelforge_common::error::{ReelError, ReelResult};
use reelforge_project_model::request::CaptionOptions;
use serde::{Deserialize, Serialize};

/// How the active word is emphasized. All variants share the same timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionStyle {
    /// Highlight color with a scale bump.
    Pulse,
    /// Opaque color box behind the active word.
    Box,
    /// Solid color fill of the active word's glyphs.
    Fill,
}

impl CaptionStyle {
    pub const ALL: [CaptionStyle; 3] = [CaptionStyle::Pulse, CaptionStyle::Box, CaptionStyle::Fill];

    pub fn name(&self) -> &'static str {
        match self {
            CaptionStyle::Pulse => "pulse",
            CaptionStyle::Box => "box",
            CaptionStyle::Fill => "fill",
        }
    }
}

impl fmt::Display for CaptionStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CaptionStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pulse" => Ok(CaptionStyle::Pulse),
            "box" => Ok(CaptionStyle::Box),
            "fill" => Ok(CaptionStyle::Fill),
            other => Err(format!("Unknown caption style: {other}. Use: pulse, box, fill")),
        }
    }
}

/// A highlight color in ASS `&HBBGGRR&` notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HighlightColor {
    pub name: &'static str,
    pub ass: &'static str,
}

impl HighlightColor {
    pub const PALETTE: [HighlightColor; 6] = [
        HighlightColor { name: "yellow", ass: "&H00FFFF&" },
        HighlightColor { name: "orange", ass: "&H0080FF&" },
        HighlightColor { name: "green", ass: "&H00FF00&" },
        HighlightColor { name: "sky", ass: "&HFFFF00&" },
        HighlightColor { name: "purple", ass: "&HFF00FF&" },
        HighlightColor { name: "red", ass: "&H0000FF&" },
    ];

    pub fn by_name(name: &str) -> Option<HighlightColor> {
        Self::PALETTE
            .iter()
            .copied()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

const FONT_SOURCE_BASE: &str = "https://github.com/google/fonts/raw/main/ofl";

/// A font family, optionally backed by a file in the fonts directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FontChoice {
    pub family: &'static str,
    /// File name under the fonts directory; `None` for system fonts.
    pub file: Option<&'static str>,
}

impl FontChoice {
    pub const CATALOG: [FontChoice; 4] = [
        FontChoice { family: "Arial Black", file: None },
        FontChoice { family: "Poppins", file: Some("Poppins-Bold.ttf") },
        FontChoice { family: "Montserrat", file: Some("Montserrat-Bold.ttf") },
        FontChoice { family: "Rubik", file: Some("Rubik-Bold.ttf") },
    ];

    /// System font used when nothing in the catalog is usable.
    pub const FALLBACK: FontChoice = FontChoice {
        family: "Arial",
        file: None,
    };

    /// System fonts are always available; file fonts need their file.
    pub fn is_available(&self, fonts_dir: Option<&Path>) -> bool {
        match (self.file, fonts_dir) {
            (None, _) => true,
            (Some(file), Some(dir)) => dir.join(file).is_file(),
            (Some(_), None) => false,
        }
    }

    pub fn needs_fonts_dir(&self) -> bool {
        self.file.is_some()
    }

    /// Where a file font can be fetched from; `None` for system fonts.
    pub fn download_url(&self) -> Option<String> {
        self.file.map(|file| {
            format!(
                "{FONT_SOURCE_BASE}/{}/{file}",
                self.family.to_lowercase().replace(' ', "")
            )
        })
    }

    /// File fonts in the catalog whose file is not in `fonts_dir` yet.
    pub fn missing(fonts_dir: &Path) -> Vec<FontChoice> {
        Self::CATALOG
            .iter()
            .copied()
            .filter(|f| f.needs_fonts_dir() && !f.is_available(Some(fonts_dir)))
            .collect()
    }

    /// Write downloaded font bytes into `fonts_dir`. The file only appears
    /// under its final name once fully written.
    pub fn install(&self, fonts_dir: &Path, bytes: &[u8]) -> ReelResult<PathBuf> {
        let file = self.file.ok_or_else(|| {
            ReelError::caption(format!("{} is a system font and cannot be installed", self.family))
        })?;
        if bytes.is_empty() {
            return Err(ReelError::caption(format!("empty download for {}", self.family)));
        }
        std::fs::create_dir_all(fonts_dir)?;
        let target = fonts_dir.join(file);
        let partial = fonts_dir.join(format!("{file}.part"));
        std::fs::write(&partial, bytes)?;
        if let Err(e) = std::fs::rename(&partial, &target) {
            let _ = std::fs::remove_file(&partial);
            return Err(e.into());
        }
        tracing::info!(family = self.family, path = %target.display(), "Caption font installed");
        Ok(target)
    }

    /// Catalog entries usable with `fonts_dir`, or the fallback alone.
    pub fn available(fonts_dir: Option<&Path>) -> Vec<FontChoice> {
        let fonts: Vec<FontChoice> = Self::CATALOG
            .iter()
            .copied()
            .filter(|f| f.is_available(fonts_dir))
            .collect();
        if fonts.is_empty() {
            vec![Self::FALLBACK]
        } else {
            fonts
        }
    }
}

/// The per-job caption presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CaptionLook {
    pub style: CaptionStyle,
    pub color: HighlightColor,
    pub font: FontChoice,
}

impl CaptionLook {
    /// Pick a look, honoring explicit choices in `options`.
    ///
    /// Unknown style or color names are errors. A font that is unknown or
    /// whose file is missing falls back to a random available font with a
    /// warning.
    pub fn choose<R: Rng + ?Sized>(
        rng: &mut R,
        options: &CaptionOptions,
        fonts_dir: Option<&Path>,
    ) -> ReelResult<Self> {
        let style = match options.style.as_deref() {
            Some(name) => name.parse::<CaptionStyle>().map_err(ReelError::caption)?,
            None => *CaptionStyle::ALL
                .choose(rng)
                .unwrap_or(&CaptionStyle::Pulse),
        };

        let color = match options.color.as_deref() {
            Some(name) => HighlightColor::by_name(name).ok_or_else(|| {
                ReelError::caption(format!("Unknown highlight color: {name}"))
            })?,
            None => *HighlightColor::PALETTE
                .choose(rng)
                .unwrap_or(&HighlightColor::PALETTE[0]),
        };

        let available = FontChoice::available(fonts_dir);
        let requested = options.font.as_deref().and_then(|name| {
            let found = available
                .iter()
                .copied()
                .find(|f| f.family.eq_ignore_ascii_case(name));
            if found.is_none() {
                tracing::warn!(font = name, "Requested font is not available, choosing another");
            }
            found
        });
        let font = match requested {
            Some(font) => font,
            None => *available.choose(rng).unwrap_or(&FontChoice::FALLBACK),
        };

        tracing::info!(
            style = %style,
            color = color.name,
            font = font.family,
            "Caption look selected"
        );

        Ok(Self { style, color, font })
    }

    /// Pick a look from a seeded RNG.
    pub fn from_seed(
        seed: u64,
        options: &CaptionOptions,
        fonts_dir: Option<&Path>,
    ) -> ReelResult<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::choose(&mut rng, options, fonts_dir)
    }

    /// Seeded when `options.seed` is set, otherwise from OS entropy.
    pub fn for_job(options: &CaptionOptions, fonts_dir: Option<&Path>) -> ReelResult<Self> {
        match options.seed {
            Some(seed) => Self::from_seed(seed, options, fonts_dir),
            None => Self::choose(&mut rand::thread_rng(), options, fonts_dir),
        }
    }
}
