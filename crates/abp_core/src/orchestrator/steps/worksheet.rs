//! Step 1: Worksheet preparation.

use crate::models::WorksheetRow;
use crate::orchestrator::errors::StepError;
use crate::orchestrator::step::StepProcessor;
use crate::orchestrator::types::{
    BatchState, Context, StepResult, ValidationResult, WorksheetOutput,
};

use super::{atomic_write, dir_has_images, ensure_step_dir, list_image_files, WORKSHEET_FILE};

/// Step 1: inventory source images into a metadata worksheet.
///
/// Writes `worksheet.json` with one blank row per source image.
/// Catalogers fill in the descriptive fields before the metadata
/// embedding step runs.
pub struct WorksheetStep;

impl WorksheetStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WorksheetStep {
    fn default() -> Self {
        Self::new()
    }
}

impl StepProcessor for WorksheetStep {
    fn number(&self) -> u32 {
        1
    }

    fn name(&self) -> &str {
        "Worksheet preparation"
    }

    fn description(&self) -> &str {
        "Inventory source images into a metadata worksheet"
    }

    fn validate_inputs(&self, ctx: &Context) -> ValidationResult {
        let source = ctx.paths.source_dir();
        if !source.is_dir() {
            return ValidationResult::error(format!(
                "Source directory missing: {}",
                source.display()
            ));
        }
        if !dir_has_images(&source) {
            return ValidationResult::error("Source directory contains no images");
        }
        ValidationResult::ok()
    }

    fn execute(&self, ctx: &Context, state: &mut BatchState) -> Result<StepResult, StepError> {
        let source = ctx.paths.source_dir();
        if !source.is_dir() {
            return Err(StepError::file_not_found(source.display().to_string()));
        }

        let images = list_image_files(&source)?;
        if images.is_empty() {
            return Ok(StepResult::failed("No images found in source directory"));
        }

        let rows: Vec<WorksheetRow> = images
            .iter()
            .filter_map(|p| p.file_name())
            .map(|name| WorksheetRow::for_image(name.to_string_lossy()))
            .collect();

        let dir = ensure_step_dir(ctx, self.number())?;
        let path = dir.join(WORKSHEET_FILE);
        let json = serde_json::to_vec_pretty(&rows)
            .map_err(|e| StepError::json_error("serialize worksheet", e))?;
        atomic_write(&path, &json)?;

        ctx.logger
            .info(&format!("Worksheet written to {}", path.display()));

        let count = rows.len();
        state.worksheet = Some(WorksheetOutput { path, rows: count });
        Ok(StepResult::ok(format!(
            "Inventoried {} source images",
            count
        )))
    }

    fn validate_outputs(&self, _ctx: &Context, state: &BatchState) -> ValidationResult {
        match &state.worksheet {
            Some(out) if out.path.is_file() => ValidationResult::ok(),
            Some(out) => {
                ValidationResult::error(format!("Worksheet file missing: {}", out.path.display()))
            }
            None => ValidationResult::error("Worksheet output not recorded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::steps::testing;
    use tempfile::tempdir;

    #[test]
    fn inventories_source_images() {
        let dir = tempdir().unwrap();
        let ctx = testing::context(&dir);
        testing::write_rgb_image(&ctx.paths.source_dir(), "scan_0002.png", 4, 4);
        testing::write_rgb_image(&ctx.paths.source_dir(), "scan_0001.png", 4, 4);

        let step = WorksheetStep::new();
        assert!(step.validate_inputs(&ctx).is_valid());

        let mut state = BatchState::new("t");
        let result = step.execute(&ctx, &mut state).unwrap();
        assert!(result.success);

        let out = state.worksheet.as_ref().unwrap();
        assert_eq!(out.rows, 2);
        assert!(step.validate_outputs(&ctx, &state).is_valid());

        // Rows are blank and sorted by filename
        let rows = super::super::load_worksheet(&out.path).unwrap();
        assert_eq!(rows[0].filename, "scan_0001.png");
        assert_eq!(rows[1].filename, "scan_0002.png");
        assert!(!rows[0].has_metadata());
    }

    #[test]
    fn empty_source_is_a_failure() {
        let dir = tempdir().unwrap();
        let ctx = testing::context(&dir);

        let step = WorksheetStep::new();
        assert!(!step.validate_inputs(&ctx).is_valid());

        let mut state = BatchState::new("t");
        let result = step.execute(&ctx, &mut state).unwrap();
        assert!(!result.success);
        assert!(state.worksheet.is_none());
    }
}
