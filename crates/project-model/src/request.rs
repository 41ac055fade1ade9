//! Render request manifests.
//!
//! A request is the whole input contract of one job: ordered media
//! references, the narration, an optional transcript, and the profile
//! selection. It is usually loaded from a JSON file, with relative paths
//! resolved against the file's directory.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::narration::Word;
use crate::profile::ProfileKind;

/// A media reference tagged with its externally assigned scene number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRef {
    pub path: PathBuf,
    #[serde(default)]
    pub scene: Option<i64>,
}

/// A media reference after ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMedia {
    pub index: usize,
    pub path: PathBuf,
    pub scene: Option<i64>,
}

/// Where the word-level transcript comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TranscriptSource {
    /// Words supplied inline in the manifest.
    Inline(Vec<Word>),
    /// A JSON file produced by the speech-to-text collaborator.
    File(PathBuf),
}

/// Optional caption look overrides. Unset fields are chosen per job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionOptions {
    /// `pulse`, `box` or `fill`.
    pub style: Option<String>,
    /// Palette color name, e.g. `yellow`.
    pub color: Option<String>,
    /// Font family from the catalog.
    pub font: Option<String>,
    /// Seed for the per-job random choice of unset fields.
    pub seed: Option<u64>,
}

/// A background track mixed under the narration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundMusic {
    pub path: PathBuf,
    #[serde(default = "default_music_volume")]
    pub volume: f64,
}

fn default_music_volume() -> f64 {
    0.10
}

/// The complete input of one render job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Visual inputs, in any order; sorted by scene key before rendering.
    pub media: Vec<MediaRef>,

    /// Narration audio file.
    pub narration: PathBuf,

    /// Known narration duration. Probed from the file when absent.
    #[serde(default)]
    pub narration_duration_secs: Option<f64>,

    /// Word-level transcript. No captions are rendered when absent or empty.
    #[serde(default)]
    pub transcript: Option<TranscriptSource>,

    /// Output preset.
    #[serde(default)]
    pub profile: ProfileKind,

    /// Final output file. Left unset on the sections of a sectioned manifest.
    #[serde(default)]
    pub output: PathBuf,

    /// Words per caption cue. Falls back to the configured default.
    #[serde(default)]
    pub words_per_cue: Option<usize>,

    #[serde(default)]
    pub caption: CaptionOptions,

    #[serde(default)]
    pub background_music: Option<BackgroundMusic>,
}

impl RenderRequest {
    /// Load a request manifest and resolve its relative paths.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RequestError> {
        let path = path.as_ref();
        let mut request: RenderRequest = read_manifest(path)?;
        request.resolve_paths(&manifest_dir(path));
        request.validate()?;
        Ok(request)
    }

    /// Make every relative path absolute against `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        for media in &mut self.media {
            resolve(&mut media.path);
        }
        resolve(&mut self.narration);
        if !self.output.as_os_str().is_empty() {
            resolve(&mut self.output);
        }
        if let Some(TranscriptSource::File(p)) = &mut self.transcript {
            resolve(p);
        }
        if let Some(music) = &mut self.background_music {
            resolve(&mut music.path);
        }
    }

    /// Structural checks that do not touch the filesystem.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.output.as_os_str().is_empty() {
            return Err(RequestError::validation("request has no output path"));
        }
        self.validate_inputs()
    }

    /// Like [`validate`](Self::validate), without requiring an output path.
    pub fn validate_inputs(&self) -> Result<(), RequestError> {
        if self.media.is_empty() {
            return Err(RequestError::validation("request has no media"));
        }
        if let Some(duration) = self.narration_duration_secs {
            if !(duration.is_finite() && duration > 0.0) {
                return Err(RequestError::validation(format!(
                    "narration duration must be positive, got {duration}"
                )));
            }
        }
        if self.words_per_cue == Some(0) {
            return Err(RequestError::validation("words_per_cue must be at least 1"));
        }
        if let Some(music) = &self.background_music {
            if !(0.0..=1.0).contains(&music.volume) {
                return Err(RequestError::validation(format!(
                    "background music volume must be in [0, 1], got {}",
                    music.volume
                )));
            }
        }
        Ok(())
    }

    /// Media in render order.
    ///
    /// Entries are sorted by scene key; entries without one keep their
    /// relative order and go after every keyed entry.
    pub fn ordered_media(&self) -> Vec<OrderedMedia> {
        let unkeyed = self.media.iter().filter(|m| m.scene.is_none()).count();
        if unkeyed > 0 {
            tracing::warn!(
                count = unkeyed,
                "Media without a scene number will be placed at the end"
            );
        }

        let mut refs: Vec<&MediaRef> = self.media.iter().collect();
        refs.sort_by_key(|m| (m.scene.is_none(), m.scene.unwrap_or_default()));
        refs.into_iter()
            .enumerate()
            .map(|(index, m)| OrderedMedia {
                index,
                path: m.path.clone(),
                scene: m.scene,
            })
            .collect()
    }

    /// Every file the job reads, in input order.
    pub fn source_paths(&self) -> Vec<&Path> {
        let mut paths: Vec<&Path> = self.media.iter().map(|m| m.path.as_path()).collect();
        paths.push(&self.narration);
        if let Some(TranscriptSource::File(p)) = &self.transcript {
            paths.push(p);
        }
        if let Some(music) = &self.background_music {
            paths.push(&music.path);
        }
        paths
    }

    /// First referenced file that does not exist.
    pub fn first_missing_source(&self) -> Option<&Path> {
        self.source_paths().into_iter().find(|p| !p.exists())
    }

    /// List referenced files that are missing on disk.
    pub fn validate_sources(&self) -> Vec<String> {
        let mut errors = vec![];

        for media in &self.media {
            if !media.path.exists() {
                errors.push(format!("Media source missing: {}", media.path.display()));
            }
        }
        if !self.narration.exists() {
            errors.push(format!("Narration missing: {}", self.narration.display()));
        }
        if let Some(TranscriptSource::File(p)) = &self.transcript {
            if !p.exists() {
                errors.push(format!("Transcript missing: {}", p.display()));
            }
        }
        if let Some(music) = &self.background_music {
            if !music.path.exists() {
                errors.push(format!(
                    "Background music missing: {}",
                    music.path.display()
                ));
            }
        }

        errors
    }
}

/// A long-form job rendered section by section and joined without
/// re-encoding. Each section is a full request with its own media,
/// narration and transcript; section outputs are chosen by the renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionedRequest {
    pub sections: Vec<RenderRequest>,
    pub output: PathBuf,
}

impl SectionedRequest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RequestError> {
        let path = path.as_ref();
        let mut request: SectionedRequest = read_manifest(path)?;
        request.resolve_paths(&manifest_dir(path));
        request.validate()?;
        Ok(request)
    }

    pub fn resolve_paths(&mut self, base: &Path) {
        for section in &mut self.sections {
            section.resolve_paths(base);
        }
        if self.output.is_relative() {
            self.output = base.join(&self.output);
        }
    }

    /// Structural checks. Sections are joined by stream copy, so they must
    /// share one profile.
    pub fn validate(&self) -> Result<(), RequestError> {
        let Some(first) = self.sections.first() else {
            return Err(RequestError::validation("sectioned request has no sections"));
        };
        if self.output.as_os_str().is_empty() {
            return Err(RequestError::validation("request has no output path"));
        }
        for (n, section) in self.sections.iter().enumerate() {
            section.validate_inputs().map_err(|e| {
                RequestError::validation(format!("section {}: {e}", n + 1))
            })?;
            if section.profile != first.profile {
                return Err(RequestError::validation(format!(
                    "section {} uses profile {:?}, expected {:?}",
                    n + 1,
                    section.profile,
                    first.profile
                )));
            }
        }
        Ok(())
    }

    /// First missing file across all sections.
    pub fn first_missing_source(&self) -> Option<&Path> {
        self.sections
            .iter()
            .find_map(RenderRequest::first_missing_source)
    }

    /// Missing files across all sections, prefixed with the section number.
    pub fn validate_sources(&self) -> Vec<String> {
        self.sections
            .iter()
            .enumerate()
            .flat_map(|(n, section)| {
                section
                    .validate_sources()
                    .into_iter()
                    .map(move |issue| format!("Section {}: {issue}", n + 1))
            })
            .collect()
    }
}

/// Any manifest the engine accepts.
#[derive(Debug, Clone)]
pub enum Manifest {
    Single(RenderRequest),
    Sectioned(SectionedRequest),
}

impl Manifest {
    /// Load a manifest; a top-level `sections` array selects the sectioned form.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RequestError> {
        let path = path.as_ref();
        let value: serde_json::Value = read_manifest(path)?;
        if value.get("sections").is_some() {
            SectionedRequest::load(path).map(Manifest::Sectioned)
        } else {
            RenderRequest::load(path).map(Manifest::Single)
        }
    }
}

fn read_manifest<T: DeserializeOwned>(path: &Path) -> Result<T, RequestError> {
    let content = std::fs::read_to_string(path).map_err(|e| RequestError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| RequestError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn manifest_dir(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Errors raised while loading or validating a request.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid request: {message}")]
    ValidationError { message: String },
}

impl RequestError {
    fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }
}
