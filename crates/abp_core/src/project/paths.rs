//! Path resolver for a batch directory tree.
//!
//! Maps logical subpaths (like `output/step3`) to absolute locations
//! under the batch root. Each batch has its own tree, so cross-batch
//! interference is avoided by directory isolation rather than locking.

use std::fs;
use std::path::{Path, PathBuf};

/// Resolves logical data paths inside one batch directory.
#[derive(Debug, Clone)]
pub struct BatchPaths {
    /// Root directory of the batch.
    root: PathBuf,
}

impl BatchPaths {
    /// Create a resolver rooted at the given batch directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the batch root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a logical subpath to an absolute location.
    ///
    /// Returns `None` if the batch root does not exist.
    pub fn get_data_path(&self, relative: impl AsRef<Path>) -> Option<PathBuf> {
        if !self.root.exists() {
            return None;
        }
        Some(self.root.join(relative))
    }

    /// Directory holding the source masters.
    pub fn source_dir(&self) -> PathBuf {
        self.root.join("source")
    }

    /// Output directory for a numbered step.
    pub fn step_dir(&self, step: u32) -> PathBuf {
        self.root.join("output").join(format!("step{}", step))
    }

    /// Directory for batch log files.
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Path to the per-batch project file.
    pub fn project_file(&self) -> PathBuf {
        self.root.join("project.json")
    }

    /// Create the batch directory skeleton (source, logs).
    ///
    /// Step output directories are created lazily by the steps that
    /// write into them.
    pub fn ensure_layout(&self) -> std::io::Result<()> {
        fs::create_dir_all(self.source_dir())?;
        fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
