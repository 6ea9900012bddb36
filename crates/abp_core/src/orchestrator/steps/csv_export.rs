//! Step 2: CSV export.

use crate::orchestrator::errors::StepError;
use crate::orchestrator::step::StepProcessor;
use crate::orchestrator::types::{BatchState, Context, ExportOutput, StepResult, ValidationResult};

use super::{ensure_step_dir, load_worksheet, worksheet_path, CSV_FILE};

/// Step 2: export the worksheet to a delimiter-separated file.
///
/// The CSV is what catalogers actually edit, so delimiter and header
/// handling are configurable to match their spreadsheet tooling.
pub struct CsvExportStep;

impl CsvExportStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvExportStep {
    fn default() -> Self {
        Self::new()
    }
}

impl StepProcessor for CsvExportStep {
    fn number(&self) -> u32 {
        2
    }

    fn name(&self) -> &str {
        "CSV export"
    }

    fn description(&self) -> &str {
        "Export the worksheet to a delimiter-separated file"
    }

    fn validate_inputs(&self, ctx: &Context) -> ValidationResult {
        let path = worksheet_path(ctx);
        if !path.is_file() {
            return ValidationResult::error(format!("Worksheet not found: {}", path.display()));
        }
        ValidationResult::ok()
    }

    fn execute(&self, ctx: &Context, state: &mut BatchState) -> Result<StepResult, StepError> {
        let ws_path = worksheet_path(ctx);
        if !ws_path.is_file() {
            return Err(StepError::file_not_found(ws_path.display().to_string()));
        }
        let rows = load_worksheet(&ws_path)?;

        let dir = ensure_step_dir(ctx, self.number())?;
        let path = dir.join(CSV_FILE);

        let mut writer = csv::WriterBuilder::new()
            .delimiter(ctx.settings.export.delimiter_byte())
            .has_headers(ctx.settings.export.include_headers)
            .from_path(&path)
            .map_err(|e| StepError::csv_error("open CSV writer", e))?;
        for row in &rows {
            writer
                .serialize(row)
                .map_err(|e| StepError::csv_error("write row", e))?;
        }
        writer
            .flush()
            .map_err(|e| StepError::io_error("flush CSV", e))?;

        ctx.logger
            .info(&format!("CSV exported to {}", path.display()));

        let count = rows.len();
        state.export = Some(ExportOutput { path, rows: count });
        Ok(StepResult::ok(format!("Exported {} rows", count)))
    }

    fn validate_outputs(&self, _ctx: &Context, state: &BatchState) -> ValidationResult {
        match &state.export {
            Some(out) if out.path.is_file() => ValidationResult::ok(),
            Some(out) => {
                ValidationResult::error(format!("CSV file missing: {}", out.path.display()))
            }
            None => ValidationResult::error("Export output not recorded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::models::WorksheetRow;
    use crate::orchestrator::steps::{atomic_write, testing};
    use std::fs;
    use tempfile::tempdir;

    fn seed_worksheet(ctx: &Context, rows: &[WorksheetRow]) {
        let dir = ctx.paths.step_dir(1);
        fs::create_dir_all(&dir).unwrap();
        let json = serde_json::to_vec_pretty(rows).unwrap();
        atomic_write(&dir.join(super::super::WORKSHEET_FILE), &json).unwrap();
    }

    #[test]
    fn exports_worksheet_rows() {
        let dir = tempdir().unwrap();
        let ctx = testing::context(&dir);
        let mut row = WorksheetRow::for_image("scan_0001.tif");
        row.title = "Main quad".to_string();
        seed_worksheet(&ctx, &[row.clone(), WorksheetRow::for_image("scan_0002.tif")]);

        let step = CsvExportStep::new();
        assert!(step.validate_inputs(&ctx).is_valid());

        let mut state = BatchState::new("t");
        let result = step.execute(&ctx, &mut state).unwrap();
        assert!(result.success);

        let out = state.export.as_ref().unwrap();
        assert_eq!(out.rows, 2);

        let mut rdr = csv::Reader::from_path(&out.path).unwrap();
        let parsed: Vec<WorksheetRow> = rdr.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], row);
    }

    #[test]
    fn honors_configured_delimiter() {
        let dir = tempdir().unwrap();
        let mut settings = Settings::default();
        settings.export.delimiter = ";".to_string();
        let ctx = testing::context_with_settings(&dir, settings);
        seed_worksheet(&ctx, &[WorksheetRow::for_image("scan_0001.tif")]);

        let mut state = BatchState::new("t");
        CsvExportStep::new().execute(&ctx, &mut state).unwrap();

        let content = fs::read_to_string(&state.export.unwrap().path).unwrap();
        assert!(content.lines().next().unwrap().contains(';'));
    }

    #[test]
    fn missing_worksheet_is_an_error() {
        let dir = tempdir().unwrap();
        let ctx = testing::context(&dir);

        let step = CsvExportStep::new();
        assert!(!step.validate_inputs(&ctx).is_valid());

        let mut state = BatchState::new("t");
        let err = step.execute(&ctx, &mut state).unwrap_err();
        assert!(matches!(err, StepError::FileNotFound { .. }));
    }
}
