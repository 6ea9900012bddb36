//! Batch specification model.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Specification for one batch of archival images.
///
/// A batch owns a dedicated directory tree: source masters under
/// `source/`, per-step artifacts under `output/stepN/`, and the
/// per-batch project file at the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSpec {
    /// Batch name (used for logging and output naming).
    pub name: String,
    /// Root directory of the batch tree.
    pub root: PathBuf,
    /// Collection identifier the batch belongs to (optional).
    #[serde(default)]
    pub collection: Option<String>,
}

impl BatchSpec {
    /// Create a new batch spec.
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            collection: None,
        }
    }

    /// Set the collection identifier (builder pattern).
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }
}
