//! Per-job scoped working directory.
//!
//! Everything a job writes besides its final output (base render, subtitle
//! artifact) lives in a [`JobWorkspace`]. Dropping the workspace removes the
//! directory, so it is released on success, on error, and on unwind.

use std::path::{Path, PathBuf};

use reelforge_common::error::ReelResult;
use tempfile::TempDir;

/// File name of the intermediate base render.
pub const BASE_RENDER_FILE_NAME: &str = "base.mp4";

#[derive(Debug)]
pub struct JobWorkspace {
    dir: TempDir,
}

impl JobWorkspace {
    /// Create a fresh workspace under `root`.
    pub fn create(root: &Path) -> ReelResult<Self> {
        std::fs::create_dir_all(root)?;
        let prefix = format!(
            "reelforge-{}-",
            chrono::Local::now().format("%Y%m%d-%H%M%S")
        );
        let dir = tempfile::Builder::new().prefix(&prefix).tempdir_in(root)?;
        tracing::debug!(path = %dir.path().display(), "Job workspace created");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the base render pass writes.
    pub fn base_render_path(&self) -> PathBuf {
        self.dir.path().join(BASE_RENDER_FILE_NAME)
    }

    /// Remove the directory now, reporting failures.
    pub fn close(self) -> ReelResult<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        tracing::debug!(path = %path.display(), "Job workspace removed");
        Ok(())
    }
}
