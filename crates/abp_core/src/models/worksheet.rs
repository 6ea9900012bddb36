//! Worksheet record model.
//!
//! One row per source image. Descriptive fields start blank and are
//! filled in by catalogers before the metadata embedding step runs.

use serde::{Deserialize, Serialize};

/// One metadata row in the batch worksheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorksheetRow {
    /// Source image filename (relative to the batch source directory).
    pub filename: String,
    /// Title of the item.
    #[serde(default)]
    pub title: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Date string as recorded by catalogers.
    #[serde(default)]
    pub date: String,
    /// Creator / photographer.
    #[serde(default)]
    pub creator: String,
    /// Semicolon-separated keywords.
    #[serde(default)]
    pub keywords: String,
}

impl WorksheetRow {
    /// Create a blank row for a source image.
    pub fn for_image(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Default::default()
        }
    }

    /// Whether any descriptive field has been filled in.
    pub fn has_metadata(&self) -> bool {
        !(self.title.is_empty()
            && self.description.is_empty()
            && self.date.is_empty()
            && self.creator.is_empty()
            && self.keywords.is_empty())
    }

    /// Split the keywords field into individual keywords.
    pub fn keyword_list(&self) -> Vec<&str> {
        self.keywords
            .split(';')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .collect()
    }
}
