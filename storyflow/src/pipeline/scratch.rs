//! Per-story scratch space.

use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A scratch directory under `temp/<story>/`, removed when dropped.
///
/// Every exit path of a stage (success, error, or panic unwinding) drops the
/// guard, so intermediate chunk files and manifests never outlive the stage.
#[derive(Debug)]
pub struct ScratchSpace {
    dir: PathBuf,
    armed: bool,
}

impl ScratchSpace {
    /// Creates (or reuses) the scratch directory for `story` under `temp_root`.
    pub fn create(temp_root: &Path, story: &str) -> io::Result<Self> {
        let dir = temp_root.join(story);
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, armed: true })
    }

    /// The scratch directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a file inside the scratch directory.
    #[must_use]
    pub fn path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Keeps the directory on drop. Used when debugging a failed transcode.
    pub fn keep(&mut self) {
        self.armed = false;
    }
}

impl Drop for ScratchSpace {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(dir = %self.dir.display(), error = %e, "Failed to remove scratch directory"),
        }
    }
}
