//! Step 8: Watermarking.

use std::path::Path;

use crate::imaging::composite_watermark;
use crate::orchestrator::errors::StepError;
use crate::orchestrator::step::StepProcessor;
use crate::orchestrator::types::{
    BatchState, Context, StepResult, ValidationResult, WatermarkOutput,
};

use super::{dir_has_images, ensure_step_dir, input_dir_for, list_image_files, save_derivative};

/// Step 8: composite the configured watermark onto access derivatives.
pub struct WatermarkStep;

impl WatermarkStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WatermarkStep {
    fn default() -> Self {
        Self::new()
    }
}

impl StepProcessor for WatermarkStep {
    fn number(&self) -> u32 {
        8
    }

    fn name(&self) -> &str {
        "Watermarking"
    }

    fn description(&self) -> &str {
        "Composite a watermark onto access derivatives"
    }

    fn validate_inputs(&self, ctx: &Context) -> ValidationResult {
        let mut result = ValidationResult::ok();

        let file = &ctx.settings.watermark.file;
        if file.is_empty() {
            result.add_error("No watermark file configured");
        } else if !Path::new(file).is_file() {
            result.add_error(format!("Watermark file missing: {}", file));
        }

        let input_dir = input_dir_for(ctx, self.number());
        if !dir_has_images(&input_dir) {
            result.add_error(format!("No input images in {}", input_dir.display()));
        }

        result
    }

    fn execute(&self, ctx: &Context, state: &mut BatchState) -> Result<StepResult, StepError> {
        let file = &ctx.settings.watermark.file;
        if file.is_empty() {
            return Err(StepError::precondition_failed("No watermark file configured"));
        }
        let mark_path = Path::new(file);
        if !mark_path.is_file() {
            return Err(StepError::file_not_found(file.clone()));
        }
        let mark = image::open(mark_path)
            .map_err(|e| StepError::image_error(format!("open watermark {}", file), e))?;

        let input_dir = input_dir_for(ctx, self.number());
        let images = list_image_files(&input_dir)?;
        if images.is_empty() {
            return Ok(StepResult::failed("No images to watermark"));
        }

        let dir = ensure_step_dir(ctx, self.number())?;
        let quality = ctx.settings.imaging.jpeg_quality;
        let total = images.len();
        let mut files = Vec::with_capacity(total);

        for (i, input) in images.iter().enumerate() {
            let name = match input.file_name() {
                Some(name) => name,
                None => continue,
            };
            let out = dir.join(name);

            let img = image::open(input)
                .map_err(|e| StepError::image_error(format!("open {}", input.display()), e))?;
            let marked = composite_watermark(&img, &mark, &ctx.settings.watermark);
            save_derivative(&marked, &out, quality)?;

            files.push(out);
            ctx.logger.progress(((i + 1) * 100 / total) as u32);
        }

        let count = files.len();
        state.watermark = Some(WatermarkOutput {
            files,
            watermark: mark_path.to_path_buf(),
        });
        Ok(StepResult::ok(format!("Watermarked {} images", count)))
    }

    fn validate_outputs(&self, _ctx: &Context, state: &BatchState) -> ValidationResult {
        let Some(out) = &state.watermark else {
            return ValidationResult::error("Watermark output not recorded");
        };
        let mut result = ValidationResult::ok();
        for file in &out.files {
            if !file.is_file() {
                result.add_error(format!(
                    "Watermarked derivative missing: {}",
                    file.display()
                ));
            }
        }
        result
    }
}
