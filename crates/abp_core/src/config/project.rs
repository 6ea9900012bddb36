//! Per-batch project store.
//!
//! Each batch keeps a `project.json` at its root holding arbitrary
//! dotted-key values plus the per-step completion flags. The pipeline
//! only depends on the narrow `ConfigStore` trait so the storage
//! format stays a collaborator concern.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::{Map, Value};

/// Narrow configuration interface consumed by the pipeline.
///
/// Step completion flags persist outside the pipeline; the pipeline's
/// only obligation on a successful step is to ask for the flag to be
/// set. Mutators return `false` when the change could not be persisted.
pub trait ConfigStore: Send + Sync {
    /// Get the completion flag for a step (false when unset).
    fn get_step_status(&self, step: u32) -> bool;

    /// Set the completion flag for a step.
    fn update_step_status(&self, step: u32, completed: bool) -> bool;

    /// Get a value by dotted key (e.g. `"worksheet.reviewed"`).
    fn get(&self, key: &str) -> Option<Value>;

    /// Set a value by dotted key, creating intermediate tables.
    fn set(&self, key: &str, value: Value) -> bool;
}

/// JSON-backed per-batch project store.
///
/// Every mutation is persisted immediately with an atomic
/// temp-file-then-rename write.
pub struct ProjectConfig {
    /// Path to the project file.
    path: PathBuf,
    /// In-memory document.
    doc: Mutex<Map<String, Value>>,
}

impl ProjectConfig {
    /// Load the project file, creating an empty one if missing.
    pub fn load_or_create(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();

        let doc = if path.exists() {
            let content = fs::read_to_string(&path)?;
            match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    tracing::warn!("Project file {} is not a JSON object, resetting", path.display());
                    Map::new()
                }
            }
        } else {
            Map::new()
        };

        let config = Self {
            path,
            doc: Mutex::new(doc),
        };
        config.save()?;
        Ok(config)
    }

    /// Get the project file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the current document atomically.
    fn save(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = {
            let doc = self.doc.lock();
            serde_json::to_string_pretty(&Value::Object(doc.clone()))
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?
        };

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &json)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    /// Walk a dotted key down the document, returning a clone of the value.
    fn lookup(doc: &Map<String, Value>, key: &str) -> Option<Value> {
        let mut map = doc;
        let mut parts = key.split('.').peekable();

        while let Some(part) = parts.next() {
            let value = map.get(part)?;
            if parts.peek().is_none() {
                return Some(value.clone());
            }
            map = value.as_object()?;
        }
        None
    }

    /// Walk a dotted key down the document, creating intermediate objects.
    fn insert(doc: &mut Map<String, Value>, key: &str, value: Value) {
        let mut map = doc;
        let mut parts = key.split('.').peekable();

        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                map.insert(part.to_string(), value);
                return;
            }
            let entry = map
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            map = entry.as_object_mut().expect("entry was just made an object");
        }
    }
}

impl ConfigStore for ProjectConfig {
    fn get_step_status(&self, step: u32) -> bool {
        let doc = self.doc.lock();
        Self::lookup(&doc, &format!("steps.{}", step))
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    fn update_step_status(&self, step: u32, completed: bool) -> bool {
        {
            let mut doc = self.doc.lock();
            Self::insert(&mut doc, &format!("steps.{}", step), Value::Bool(completed));
        }
        match self.save() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to persist step {} status: {}", step, e);
                false
            }
        }
    }

    fn get(&self, key: &str) -> Option<Value> {
        let doc = self.doc.lock();
        Self::lookup(&doc, key)
    }

    fn set(&self, key: &str, value: Value) -> bool {
        {
            let mut doc = self.doc.lock();
            Self::insert(&mut doc, key, value);
        }
        match self.save() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to persist key '{}': {}", key, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn step_status_defaults_to_false() {
        let dir = tempdir().unwrap();
        let config = ProjectConfig::load_or_create(dir.path().join("project.json")).unwrap();

        assert!(!config.get_step_status(1));
        assert!(config.update_step_status(1, true));
        assert!(config.get_step_status(1));
        assert!(!config.get_step_status(2));
    }

    #[test]
    fn dotted_keys_create_intermediate_tables() {
        let dir = tempdir().unwrap();
        let config = ProjectConfig::load_or_create(dir.path().join("project.json")).unwrap();

        assert!(config.set("worksheet.reviewed", json!(true)));
        assert!(config.set("worksheet.reviewer", json!("mk")));

        assert_eq!(config.get("worksheet.reviewed"), Some(json!(true)));
        assert_eq!(config.get("worksheet.reviewer"), Some(json!("mk")));
        assert_eq!(config.get("worksheet.missing"), None);
    }

    #[test]
    fn values_persist_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("project.json");

        {
            let config = ProjectConfig::load_or_create(&path).unwrap();
            config.update_step_status(3, true);
            config.set("batch.operator", json!("archivist"));
        }

        let reopened = ProjectConfig::load_or_create(&path).unwrap();
        assert!(reopened.get_step_status(3));
        assert_eq!(reopened.get("batch.operator"), Some(json!("archivist")));
    }

    #[test]
    fn corrupt_file_resets_to_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("project.json");
        fs::write(&path, "not json at all").unwrap();

        let config = ProjectConfig::load_or_create(&path).unwrap();
        assert!(!config.get_step_status(1));
    }
}
