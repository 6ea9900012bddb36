//! exiftool command argument builder.
//!
//! Builds command-line tokens for exiftool based on a WorksheetRow.
//! Empty worksheet fields produce no tag assignment, so partially
//! cataloged rows only write the fields that were filled in.

use std::path::Path;

use crate::config::Settings;
use crate::models::WorksheetRow;

/// Builder for exiftool command-line arguments.
///
/// Generates a list of string tokens ready to pass to exiftool.
pub struct ExiftoolArgsBuilder<'a> {
    row: &'a WorksheetRow,
    settings: &'a Settings,
    target: &'a Path,
}

impl<'a> ExiftoolArgsBuilder<'a> {
    /// Create a new args builder.
    pub fn new(row: &'a WorksheetRow, settings: &'a Settings, target: &'a Path) -> Self {
        Self {
            row,
            settings,
            target,
        }
    }

    /// Build the complete exiftool argument tokens.
    pub fn build(&self) -> Vec<String> {
        let mut tokens = Vec::new();

        self.add_descriptive_tags(&mut tokens);
        self.add_keywords(&mut tokens);
        self.add_tool_tags(&mut tokens);

        // Tag in place; the step works on copies in its own output dir
        tokens.push("-overwrite_original".to_string());
        tokens.push(self.target.to_string_lossy().to_string());

        tokens
    }

    /// Add title, description, date, and creator assignments.
    fn add_descriptive_tags(&self, tokens: &mut Vec<String>) {
        if !self.row.title.is_empty() {
            tokens.push(format!("-XMP-dc:Title={}", self.row.title));
            tokens.push(format!("-IPTC:ObjectName={}", self.row.title));
        }
        if !self.row.description.is_empty() {
            tokens.push(format!("-XMP-dc:Description={}", self.row.description));
            tokens.push(format!(
                "-IPTC:Caption-Abstract={}",
                self.row.description
            ));
        }
        if !self.row.date.is_empty() {
            tokens.push(format!("-XMP-dc:Date={}", self.row.date));
        }
        if !self.row.creator.is_empty() {
            tokens.push(format!("-XMP-dc:Creator={}", self.row.creator));
            tokens.push(format!("-IPTC:By-line={}", self.row.creator));
        }
    }

    /// Add one keyword assignment per worksheet keyword.
    fn add_keywords(&self, tokens: &mut Vec<String>) {
        for keyword in self.row.keyword_list() {
            tokens.push(format!("-IPTC:Keywords+={}", keyword));
            tokens.push(format!("-XMP-dc:Subject+={}", keyword));
        }
    }

    /// Add the creator-tool tag from settings.
    fn add_tool_tags(&self, tokens: &mut Vec<String>) {
        if !self.settings.metadata.creator_tool.is_empty() {
            tokens.push(format!(
                "-XMP-xmp:CreatorTool={}",
                self.settings.metadata.creator_tool
            ));
        }
    }
}
