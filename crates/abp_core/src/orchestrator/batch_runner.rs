//! Runs one batch end-to-end through the standard pipeline.
//!
//! Owns the per-batch wiring: path layout, project config, logger,
//! context, and a fresh `BatchState`. Callers hand it a `BatchSpec`
//! and get back a `BatchResult`.

use std::sync::Arc;

use crate::config::{ProjectConfig, Settings};
use crate::logging::{BatchLogger, LogConfig, UiLogCallback};
use crate::models::BatchSpec;
use crate::project::BatchPaths;

use super::create_standard_pipeline;
use super::types::{BatchState, Context, ProgressCallback};

/// First step number of the standard pipeline.
pub const FIRST_STEP: u32 = 1;

/// Last step number of the standard pipeline.
pub const LAST_STEP: u32 = 8;

/// Outcome of one batch run.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Batch name.
    pub batch_name: String,
    /// Whether every executed step succeeded.
    pub success: bool,
    /// First failure message, if any.
    pub error: Option<String>,
    /// Step numbers that completed successfully.
    pub steps_completed: Vec<u32>,
}

impl BatchResult {
    fn failed(batch_name: String, error: String) -> Self {
        Self {
            batch_name,
            success: false,
            error: Some(error),
            steps_completed: Vec::new(),
        }
    }
}

/// Drives the standard pipeline for one batch at a time.
pub struct BatchRunner {
    settings: Settings,
}

impl BatchRunner {
    /// Create a runner with the given application settings.
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Run the full pipeline (steps 1 through 8) for a batch.
    pub fn process_batch(
        &self,
        spec: BatchSpec,
        ui_callback: Option<UiLogCallback>,
        progress_callback: Option<ProgressCallback>,
    ) -> BatchResult {
        self.run_range(
            spec,
            FIRST_STEP,
            LAST_STEP,
            false,
            ui_callback,
            progress_callback,
        )
    }

    /// Run a step range for a batch (partial runs, resumes, dry runs).
    pub fn run_range(
        &self,
        spec: BatchSpec,
        start_step: u32,
        end_step: u32,
        dry_run: bool,
        ui_callback: Option<UiLogCallback>,
        progress_callback: Option<ProgressCallback>,
    ) -> BatchResult {
        let batch_name = spec.name.clone();
        tracing::info!(
            batch = %batch_name,
            start_step,
            end_step,
            dry_run,
            "Starting batch run"
        );

        let paths = BatchPaths::new(&spec.root);
        if let Err(e) = paths.ensure_layout() {
            tracing::error!(batch = %batch_name, error = %e, "Could not create batch layout");
            return BatchResult::failed(batch_name, format!("Could not create batch layout: {}", e));
        }

        let config = match ProjectConfig::load_or_create(paths.project_file()) {
            Ok(config) => Arc::new(config),
            Err(e) => {
                tracing::error!(batch = %batch_name, error = %e, "Could not open project file");
                return BatchResult::failed(batch_name, format!("Could not open project file: {}", e));
            }
        };

        let log_config = LogConfig {
            compact: self.settings.logging.compact,
            progress_step: self.settings.logging.progress_step,
            error_tail: self.settings.logging.error_tail as usize,
            ..LogConfig::default()
        };
        let logger = match BatchLogger::new(&batch_name, paths.logs_dir(), log_config, ui_callback)
        {
            Ok(logger) => Arc::new(logger),
            Err(e) => {
                tracing::error!(batch = %batch_name, error = %e, "Could not create batch logger");
                return BatchResult::failed(batch_name, format!("Could not create batch logger: {}", e));
            }
        };

        let mut ctx = Context::new(spec, self.settings.clone(), paths, config, logger);
        if let Some(callback) = progress_callback {
            ctx = ctx.with_progress_callback(callback);
        }

        let pipeline = create_standard_pipeline();
        let mut state = BatchState::new(&batch_name);

        match pipeline.run(&ctx, &mut state, start_step, end_step, dry_run) {
            Ok(result) => {
                if result.success {
                    tracing::info!(
                        batch = %batch_name,
                        steps = ?result.steps_completed,
                        "Batch run finished"
                    );
                } else {
                    tracing::warn!(
                        batch = %batch_name,
                        error = %result.error_message,
                        "Batch run failed"
                    );
                }
                BatchResult {
                    batch_name,
                    success: result.success,
                    error: if result.success {
                        None
                    } else {
                        Some(result.error_message)
                    },
                    steps_completed: result.steps_completed,
                }
            }
            Err(e) => {
                tracing::error!(batch = %batch_name, error = %e, "Batch run aborted");
                BatchResult::failed(batch_name, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::steps::{testing, CSV_FILE, WORKSHEET_FILE};
    use tempfile::tempdir;

    #[test]
    fn runs_worksheet_through_encoding() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("batch_001");
        std::fs::create_dir_all(root.join("source")).unwrap();
        testing::write_rgb_image(&root.join("source"), "scan_0001.png", 8, 8);

        let runner = BatchRunner::new(Settings::default());
        let result = runner.run_range(
            BatchSpec::new("batch_001", &root),
            1,
            3,
            false,
            None,
            None,
        );

        assert!(result.success, "error: {:?}", result.error);
        assert_eq!(result.steps_completed, vec![1, 2, 3]);
        assert!(root.join("output/step1").join(WORKSHEET_FILE).is_file());
        assert!(root.join("output/step2").join(CSV_FILE).is_file());
        assert!(root.join("output/step3").join(CSV_FILE).is_file());

        // Completion flags are persisted in the project file
        let content = std::fs::read_to_string(root.join("project.json")).unwrap();
        assert!(content.contains("\"1\": true"));
        assert!(content.contains("\"3\": true"));
    }

    #[test]
    fn dry_run_touches_nothing() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("batch_001");
        std::fs::create_dir_all(root.join("source")).unwrap();
        testing::write_rgb_image(&root.join("source"), "scan_0001.png", 8, 8);

        let runner = BatchRunner::new(Settings::default());
        let result = runner.run_range(
            BatchSpec::new("batch_001", &root),
            FIRST_STEP,
            LAST_STEP,
            true,
            None,
            None,
        );

        assert!(result.success);
        assert!(result.steps_completed.is_empty());
        assert!(!root.join("output/step1").exists());
    }

    #[test]
    fn empty_batch_fails_at_step_one() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("batch_001");

        let runner = BatchRunner::new(Settings::default());
        let result = runner.run_range(
            BatchSpec::new("batch_001", &root),
            1,
            3,
            false,
            None,
            None,
        );

        assert!(!result.success);
        assert!(result.steps_completed.is_empty());
        assert!(result.error.unwrap().contains("No images"));
    }
}
