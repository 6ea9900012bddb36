//! Core types for the orchestrator pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigStore, Settings};
use crate::logging::BatchLogger;
use crate::models::BatchSpec;
use crate::project::BatchPaths;

/// Progress callback type for reporting pipeline progress.
///
/// Arguments: (step_name, percent_complete, message)
pub type ProgressCallback = Box<dyn Fn(&str, u32, &str) + Send + Sync>;

/// Read-only context passed to pipeline steps.
///
/// Bundles the per-run dependencies: batch spec, application settings,
/// the path resolver, the per-batch config store, and the logger.
/// Purely a carrier; mutable step-to-step data goes in `BatchState`.
pub struct Context {
    /// Batch specification.
    pub batch: BatchSpec,
    /// Application settings.
    pub settings: Settings,
    /// Path resolver for the batch tree.
    pub paths: BatchPaths,
    /// Per-batch config store (step completion flags, dotted keys).
    pub config: Arc<dyn ConfigStore>,
    /// Per-batch logger.
    pub logger: Arc<BatchLogger>,
    /// Optional progress callback.
    progress_callback: Option<ProgressCallback>,
}

impl Context {
    /// Create a new context for a batch run.
    pub fn new(
        batch: BatchSpec,
        settings: Settings,
        paths: BatchPaths,
        config: Arc<dyn ConfigStore>,
        logger: Arc<BatchLogger>,
    ) -> Self {
        Self {
            batch,
            settings,
            paths,
            config,
            logger,
            progress_callback: None,
        }
    }

    /// Set the progress callback.
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Report progress to callback (if set).
    pub fn report_progress(&self, step_name: &str, percent: u32, message: &str) {
        if let Some(ref callback) = self.progress_callback {
            callback(step_name, percent, message);
        }
    }

    /// Get the batch name.
    pub fn batch_name(&self) -> &str {
        &self.batch.name
    }
}

/// Result of executing one step: success flag plus a human-readable
/// message surfaced to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    /// Whether the step succeeded.
    pub success: bool,
    /// Human-readable outcome message.
    pub message: String,
}

impl StepResult {
    /// Create a successful result.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// Create a failed result.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Outcome of a precondition or postcondition check.
///
/// Advisory: the run loop never consults it, but callers can (e.g. a
/// "validate project" action before starting a run).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    /// Human-readable validation errors (empty = valid).
    pub errors: Vec<String>,
}

impl ValidationResult {
    /// Create a passing result.
    pub fn ok() -> Self {
        Self::default()
    }

    /// Create a failing result with one error.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
        }
    }

    /// Whether the check passed.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Record an error.
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Absorb the errors of another result.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
    }
}

/// Mutable batch state that accumulates results from pipeline steps.
///
/// One optional section per numbered step. Steps fill in their own
/// section; values written by step K are visible to step K+1 within
/// the same run. Not persisted across runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchState {
    /// Batch identifier.
    pub batch_id: String,
    /// When the run started.
    pub started_at: Option<String>,
    /// Worksheet preparation results (step 1).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worksheet: Option<WorksheetOutput>,
    /// CSV export results (step 2).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<ExportOutput>,
    /// Encoding cleanup results (step 3).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<EncodingOutput>,
    /// Bit-depth conversion results (step 4).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bit_depth: Option<BitDepthOutput>,
    /// Metadata embedding results (step 5).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataOutput>,
    /// Format conversion results (step 6).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion: Option<ConversionOutput>,
    /// Resize results (step 7).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resize: Option<ResizeOutput>,
    /// Watermark results (step 8).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark: Option<WatermarkOutput>,
}

impl BatchState {
    /// Create a new batch state with the given ID.
    pub fn new(batch_id: impl Into<String>) -> Self {
        Self {
            batch_id: batch_id.into(),
            started_at: Some(chrono::Local::now().to_rfc3339()),
            ..Default::default()
        }
    }

    /// Check if the worksheet has been prepared.
    pub fn has_worksheet(&self) -> bool {
        self.worksheet.is_some()
    }

    /// Check if the CSV export has run.
    pub fn has_export(&self) -> bool {
        self.export.is_some()
    }
}

/// Output from the worksheet preparation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorksheetOutput {
    /// Path to the worksheet file.
    pub path: PathBuf,
    /// Number of rows (one per source image).
    pub rows: usize,
}

/// Output from the CSV export step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOutput {
    /// Path to the exported CSV.
    pub path: PathBuf,
    /// Number of data rows written.
    pub rows: usize,
}

/// Output from the encoding cleanup step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingOutput {
    /// Path to the cleaned CSV.
    pub path: PathBuf,
    /// Number of characters replaced or re-decoded.
    pub replacements: usize,
}

/// Output from the bit-depth conversion step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BitDepthOutput {
    /// Produced files (8-bit working copies).
    pub files: Vec<PathBuf>,
    /// How many inputs actually needed conversion.
    pub converted: usize,
}

/// Output from the metadata embedding step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataOutput {
    /// Files carrying embedded metadata.
    pub files: Vec<PathBuf>,
    /// How many files were tagged.
    pub tagged: usize,
}

/// Output from the format conversion step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Produced JPEG derivatives.
    pub files: Vec<PathBuf>,
    /// JPEG quality used.
    pub quality: u8,
}

/// Output from the resize step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResizeOutput {
    /// Produced resized derivatives.
    pub files: Vec<PathBuf>,
    /// Longest-edge bound applied.
    pub max_edge: u32,
}

/// Output from the watermark step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkOutput {
    /// Produced watermarked derivatives.
    pub files: Vec<PathBuf>,
    /// Watermark image that was composited.
    pub watermark: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_state_tracks_sections() {
        let mut state = BatchState::new("batch_001");
        assert!(!state.has_worksheet());

        state.worksheet = Some(WorksheetOutput {
            path: PathBuf::from("/batch/output/step1/worksheet.json"),
            rows: 42,
        });

        assert!(state.has_worksheet());
        assert!(!state.has_export());
    }

    #[test]
    fn batch_state_serializes() {
        let state = BatchState::new("batch_002");
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"batch_id\":\"batch_002\""));
        // Empty sections are omitted
        assert!(!json.contains("worksheet"));
    }

    #[test]
    fn validation_result_merges() {
        let mut result = ValidationResult::ok();
        assert!(result.is_valid());

        result.add_error("source directory is empty");
        result.merge(ValidationResult::error("watermark file missing"));

        assert!(!result.is_valid());
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn step_result_constructors() {
        let ok = StepResult::ok("8 files converted");
        assert!(ok.success);
        let failed = StepResult::failed("exiftool not found");
        assert!(!failed.success);
        assert_eq!(failed.message, "exiftool not found");
    }
}
