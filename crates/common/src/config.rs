//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ReelError, ReelResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Parent directory for per-job working directories.
    pub work_root: PathBuf,

    /// External media engine binaries.
    pub engine: EngineConfig,

    /// Caption defaults.
    pub captions: CaptionDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Locations of the external media engine binaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// ffmpeg binary name or absolute path.
    pub ffmpeg: String,

    /// ffprobe binary name or absolute path.
    pub ffprobe: String,
}

/// Default caption parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionDefaults {
    /// Words grouped into one on-screen cue.
    pub words_per_cue: usize,

    /// Directory holding downloadable caption fonts.
    pub fonts_dir: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "reelforge=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            work_root: std::env::temp_dir(),
            engine: EngineConfig::default(),
            captions: CaptionDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

impl Default for CaptionDefaults {
    fn default() -> Self {
        Self {
            words_per_cue: 3,
            fonts_dir: data_dir().join("fonts"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load_from(&config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %config_path.display(), error = %e, "Ignoring config file");
                Self::default()
            }
        }
    }

    /// Load config from `path`. Any missing field is an error, not a merge.
    pub fn load_from(path: &Path) -> ReelResult<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| ReelError::config(format!("{}: {e}", path.display())))
    }

    /// Save config to the standard location and return where it went.
    pub fn save(&self) -> ReelResult<PathBuf> {
        let config_path = config_file_path();
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, path: &Path) -> ReelResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Standard config file location.
    pub fn path() -> PathBuf {
        config_file_path()
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("reelforge").join("config.json")
}

/// Default data directory (fonts and other downloaded assets).
fn data_dir() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("reelforge")
}
