//! Per-run scratch workspace.
//!
//! Each pipeline invocation owns a unique temp directory; nothing is
//! shared between runs, so no cross-run locking exists anywhere in the
//! pipeline. The directory is removed recursively when the workspace is
//! dropped, which covers every exit path including errors and
//! cancellation.

use crate::error::PipelineError;
use chrono::Local;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;
use uuid::Uuid;

pub struct Workspace {
    task_id: String,
    dir: TempDir,
}

impl Workspace {
    pub fn create(temp_root: &Path) -> Result<Self, PipelineError> {
        std::fs::create_dir_all(temp_root)
            .map_err(|e| PipelineError::Workspace(format!("create temp root: {}", e)))?;

        let task_id = new_task_id();
        let dir = tempfile::Builder::new()
            .prefix(&format!("media_{}_", task_id))
            .tempdir_in(temp_root)
            .map_err(|e| PipelineError::Workspace(format!("create workspace: {}", e)))?;

        debug!(task_id = %task_id, dir = %dir.path().display(), "workspace created");
        Ok(Self { task_id, dir })
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Canonical location for the resolved source video.
    pub fn video_path(&self) -> PathBuf {
        self.dir.path().join(format!("{}.mp4", self.task_id))
    }

    pub fn frames_dir(&self) -> Result<PathBuf, PipelineError> {
        self.subdir("frames")
    }

    pub fn clips_dir(&self) -> Result<PathBuf, PipelineError> {
        self.subdir("clips")
    }

    fn subdir(&self, name: &str) -> Result<PathBuf, PipelineError> {
        let dir = self.dir.path().join(name);
        std::fs::create_dir_all(&dir)
            .map_err(|e| PipelineError::Workspace(format!("create {} dir: {}", name, e)))?;
        Ok(dir)
    }
}

/// Timestamped, collision-free task id, e.g. `20260807_153000_1f2e3d4c`.
fn new_task_id() -> String {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}", stamp, &suffix[..8])
}
