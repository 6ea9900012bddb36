//! Step 6: Format conversion.

use crate::imaging::save_jpeg;
use crate::orchestrator::errors::StepError;
use crate::orchestrator::step::StepProcessor;
use crate::orchestrator::types::{
    BatchState, Context, ConversionOutput, StepResult, ValidationResult,
};

use super::{dir_has_images, ensure_step_dir, input_dir_for, list_image_files};

/// Step 6: produce JPEG derivatives at the configured quality.
pub struct ConvertStep;

impl ConvertStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConvertStep {
    fn default() -> Self {
        Self::new()
    }
}

impl StepProcessor for ConvertStep {
    fn number(&self) -> u32 {
        6
    }

    fn name(&self) -> &str {
        "Format conversion"
    }

    fn description(&self) -> &str {
        "Produce JPEG derivatives"
    }

    fn validate_inputs(&self, ctx: &Context) -> ValidationResult {
        let input_dir = input_dir_for(ctx, self.number());
        if !dir_has_images(&input_dir) {
            return ValidationResult::error(format!(
                "No input images in {}",
                input_dir.display()
            ));
        }
        ValidationResult::ok()
    }

    fn execute(&self, ctx: &Context, state: &mut BatchState) -> Result<StepResult, StepError> {
        let input_dir = input_dir_for(ctx, self.number());
        let images = list_image_files(&input_dir)?;
        if images.is_empty() {
            return Ok(StepResult::failed("No images to convert"));
        }

        let dir = ensure_step_dir(ctx, self.number())?;
        let quality = ctx.settings.imaging.jpeg_quality;
        let total = images.len();
        let mut files = Vec::with_capacity(total);

        for (i, input) in images.iter().enumerate() {
            let stem = match input.file_stem() {
                Some(stem) => stem,
                None => continue,
            };
            let out = dir.join(format!("{}.jpg", stem.to_string_lossy()));

            let img = image::open(input)
                .map_err(|e| StepError::image_error(format!("open {}", input.display()), e))?;
            save_jpeg(&img, &out, quality)
                .map_err(|e| StepError::image_error(format!("save {}", out.display()), e))?;

            files.push(out);
            ctx.logger.progress(((i + 1) * 100 / total) as u32);
        }

        let count = files.len();
        state.conversion = Some(ConversionOutput { files, quality });
        Ok(StepResult::ok(format!(
            "Converted {} images to JPEG (quality {})",
            count, quality
        )))
    }

    fn validate_outputs(&self, _ctx: &Context, state: &BatchState) -> ValidationResult {
        let Some(out) = &state.conversion else {
            return ValidationResult::error("Conversion output not recorded");
        };
        let mut result = ValidationResult::ok();
        for file in &out.files {
            if !file.is_file() {
                result.add_error(format!("JPEG derivative missing: {}", file.display()));
            }
        }
        result
    }
}
