//! Step 5: Metadata embedding.
//!
//! Copies the working images into its own output directory, then tags
//! each copy in place with exiftool using the cataloged worksheet
//! fields. Images without a cataloged row are copied untouched.

use std::collections::HashMap;
use std::fs;
use std::process::Command;

use crate::metadata::ExiftoolArgsBuilder;
use crate::models::WorksheetRow;
use crate::orchestrator::errors::StepError;
use crate::orchestrator::step::StepProcessor;
use crate::orchestrator::types::{
    BatchState, Context, MetadataOutput, StepResult, ValidationResult,
};

use super::{ensure_step_dir, input_dir_for, list_image_files, load_worksheet, worksheet_path};

/// Step 5: write worksheet fields into image tags via exiftool.
pub struct MetadataStep;

impl MetadataStep {
    pub fn new() -> Self {
        Self
    }

    fn exiftool_binary(ctx: &Context) -> String {
        let configured = &ctx.settings.metadata.exiftool_path;
        if configured.is_empty() {
            "exiftool".to_string()
        } else {
            configured.clone()
        }
    }

    /// Run exiftool for one target, feeding output into the batch log.
    fn run_exiftool(ctx: &Context, args: &[String]) -> Result<(), StepError> {
        let binary = Self::exiftool_binary(ctx);

        if ctx.settings.logging.show_command_args {
            ctx.logger.log_command_args("exiftool", args);
        }
        ctx.logger.command(&format!("{} {}", binary, args.join(" ")));

        let output = Command::new(&binary)
            .args(args)
            .output()
            .map_err(|e| StepError::io_error(format!("spawn {}", binary), e))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            ctx.logger.output_line(line, false);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            ctx.logger.output_line(line, true);
        }

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            ctx.logger.show_tail("exiftool");
            return Err(StepError::command_failed(
                "exiftool",
                code,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MetadataStep {
    fn default() -> Self {
        Self::new()
    }
}

impl StepProcessor for MetadataStep {
    fn number(&self) -> u32 {
        5
    }

    fn name(&self) -> &str {
        "Metadata embedding"
    }

    fn description(&self) -> &str {
        "Write worksheet fields into image tags via exiftool"
    }

    fn validate_inputs(&self, ctx: &Context) -> ValidationResult {
        let mut result = ValidationResult::ok();

        let ws_path = worksheet_path(ctx);
        if !ws_path.is_file() {
            result.add_error(format!("Worksheet not found: {}", ws_path.display()));
        }

        let binary = Self::exiftool_binary(ctx);
        match Command::new(&binary).arg("-ver").output() {
            Ok(output) if output.status.success() => {}
            Ok(_) => result.add_error(format!("{} -ver reported failure", binary)),
            Err(e) => result.add_error(format!("exiftool not available ({}): {}", binary, e)),
        }

        result
    }

    fn execute(&self, ctx: &Context, state: &mut BatchState) -> Result<StepResult, StepError> {
        let ws_path = worksheet_path(ctx);
        if !ws_path.is_file() {
            return Err(StepError::file_not_found(ws_path.display().to_string()));
        }
        let rows = load_worksheet(&ws_path)?;
        let by_name: HashMap<&str, &WorksheetRow> =
            rows.iter().map(|r| (r.filename.as_str(), r)).collect();

        let input_dir = input_dir_for(ctx, self.number());
        let images = list_image_files(&input_dir)?;
        if images.is_empty() {
            return Ok(StepResult::failed("No images to tag"));
        }

        let dir = ensure_step_dir(ctx, self.number())?;
        let total = images.len();
        let mut files = Vec::with_capacity(total);
        let mut tagged = 0;

        for (i, input) in images.iter().enumerate() {
            let name = match input.file_name() {
                Some(name) => name,
                None => continue,
            };
            let target = dir.join(name);
            fs::copy(input, &target)
                .map_err(|e| StepError::io_error(format!("copy {}", input.display()), e))?;

            let filename = name.to_string_lossy();
            match by_name.get(filename.as_ref()) {
                Some(row) if row.has_metadata() => {
                    let args = ExiftoolArgsBuilder::new(row, &ctx.settings, &target).build();
                    Self::run_exiftool(ctx, &args)?;
                    tagged += 1;
                }
                Some(_) => ctx.logger.debug(&format!(
                    "{}: worksheet row is blank, copied untouched",
                    filename
                )),
                None => ctx.logger.warn(&format!(
                    "{}: no worksheet row, copied untouched",
                    filename
                )),
            }

            files.push(target);
            ctx.logger.progress(((i + 1) * 100 / total) as u32);
        }

        state.metadata = Some(MetadataOutput { files, tagged });
        Ok(StepResult::ok(format!(
            "Tagged {} of {} images",
            tagged, total
        )))
    }

    fn validate_outputs(&self, _ctx: &Context, state: &BatchState) -> ValidationResult {
        let Some(out) = &state.metadata else {
            return ValidationResult::error("Metadata output not recorded");
        };
        let mut result = ValidationResult::ok();
        for file in &out.files {
            if !file.is_file() {
                result.add_error(format!("Tagged copy missing: {}", file.display()));
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::steps::{atomic_write, testing, WORKSHEET_FILE};
    use tempfile::tempdir;

    fn seed_worksheet(ctx: &Context, rows: &[WorksheetRow]) {
        let dir = ctx.paths.step_dir(1);
        fs::create_dir_all(&dir).unwrap();
        let json = serde_json::to_vec_pretty(rows).unwrap();
        atomic_write(&dir.join(WORKSHEET_FILE), &json).unwrap();
    }

    // Tests only cover the paths that never spawn exiftool; the
    // invocation plumbing itself is exercised by args_builder tests
    // and manual runs against a real exiftool install.

    #[test]
    fn blank_rows_are_copied_without_tagging() {
        let dir = tempdir().unwrap();
        let ctx = testing::context(&dir);
        testing::write_rgb_image(&ctx.paths.source_dir(), "scan_0001.png", 4, 4);
        seed_worksheet(&ctx, &[WorksheetRow::for_image("scan_0001.png")]);

        let step = MetadataStep::new();
        let mut state = BatchState::new("t");
        let result = step.execute(&ctx, &mut state).unwrap();
        assert!(result.success);

        let out = state.metadata.as_ref().unwrap();
        assert_eq!(out.tagged, 0);
        assert_eq!(out.files.len(), 1);
        assert!(ctx.paths.step_dir(5).join("scan_0001.png").is_file());
        assert!(step.validate_outputs(&ctx, &state).is_valid());
    }

    #[test]
    fn uncataloged_images_still_flow_through() {
        let dir = tempdir().unwrap();
        let ctx = testing::context(&dir);
        testing::write_rgb_image(&ctx.paths.source_dir(), "extra.png", 4, 4);
        // Worksheet mentions a different file entirely
        seed_worksheet(&ctx, &[WorksheetRow::for_image("scan_0001.png")]);

        let mut state = BatchState::new("t");
        let result = MetadataStep::new().execute(&ctx, &mut state).unwrap();
        assert!(result.success);
        assert_eq!(state.metadata.unwrap().tagged, 0);
    }

    #[test]
    fn missing_worksheet_is_an_error() {
        let dir = tempdir().unwrap();
        let ctx = testing::context(&dir);
        testing::write_rgb_image(&ctx.paths.source_dir(), "scan_0001.png", 4, 4);

        let mut state = BatchState::new("t");
        let err = MetadataStep::new().execute(&ctx, &mut state).unwrap_err();
        assert!(matches!(err, StepError::FileNotFound { .. }));
    }

    #[test]
    fn binary_defaults_to_path_lookup() {
        let dir = tempdir().unwrap();
        let ctx = testing::context(&dir);
        assert_eq!(MetadataStep::exiftool_binary(&ctx), "exiftool");
    }
}
