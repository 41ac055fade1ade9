//! Error types shared across ReelForge crates.

use std::path::PathBuf;

/// Which engine invocation of a render job failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderPass {
    /// Geometry, motion and grading over the narration audio.
    Base,
    /// Burned-in caption overlay on top of the base render.
    CaptionOverlay,
    /// Stream-copy join of separately rendered sections.
    SectionJoin,
}

impl std::fmt::Display for RenderPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderPass::Base => f.write_str("base render"),
            RenderPass::CaptionOverlay => f.write_str("caption overlay"),
            RenderPass::SectionJoin => f.write_str("section join"),
        }
    }
}

/// Top-level error type for ReelForge operations.
#[derive(Debug, thiserror::Error)]
pub enum ReelError {
    /// A referenced source file does not exist at render time.
    #[error("Missing asset: {path}")]
    MissingAsset { path: PathBuf },

    #[error("Unsupported media type: {path}")]
    UnsupportedMedia { path: PathBuf },

    /// Probing failed. Callers that can fall back should log and continue.
    #[error("Probe failed for {path}: {message}")]
    Probe { path: PathBuf, message: String },

    /// The external media engine exited unsuccessfully.
    #[error("Media engine failed during {pass} ({status}): {diagnostics}")]
    Engine {
        pass: RenderPass,
        status: String,
        diagnostics: String,
    },

    #[error("Invalid render request: {message}")]
    InvalidRequest { message: String },

    #[error("Caption error: {message}")]
    Caption { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ReelError.
pub type ReelResult<T> = Result<T, ReelError>;

impl ReelError {
    pub fn missing_asset(path: impl Into<PathBuf>) -> Self {
        Self::MissingAsset { path: path.into() }
    }

    pub fn probe(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Probe {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: msg.into(),
        }
    }

    pub fn caption(msg: impl Into<String>) -> Self {
        Self::Caption {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether this error aborts a render job (as opposed to being absorbed
    /// with a warning by the component that raised it).
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ReelError::Probe { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_surfaces_diagnostics() {
        let err = ReelError::Engine {
            pass: RenderPass::CaptionOverlay,
            status: "exit status: 1".to_string(),
            diagnostics: "Unable to open subtitles.ass".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("caption overlay"));
        assert!(text.contains("Unable to open subtitles.ass"));
    }

    #[test]
    fn test_probe_failures_are_not_fatal() {
        assert!(!ReelError::probe("/tmp/clip.mp4", "no duration").is_fatal());
        assert!(ReelError::missing_asset("/tmp/clip.mp4").is_fatal());
    }
}
