//! Step 7: Resizing.

use crate::imaging::resize_max_edge;
use crate::orchestrator::errors::StepError;
use crate::orchestrator::step::StepProcessor;
use crate::orchestrator::types::{BatchState, Context, ResizeOutput, StepResult, ValidationResult};

use super::{dir_has_images, ensure_step_dir, input_dir_for, list_image_files, save_derivative};

/// Step 7: bound the longest edge of each derivative.
///
/// Aspect ratio is preserved; images already within the bound are
/// copied through at full size.
pub struct ResizeStep;

impl ResizeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ResizeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl StepProcessor for ResizeStep {
    fn number(&self) -> u32 {
        7
    }

    fn name(&self) -> &str {
        "Resizing"
    }

    fn description(&self) -> &str {
        "Produce size-bounded access derivatives"
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
            return Ok(StepResult::failed("No images to resize"));
        }

        let dir = ensure_step_dir(ctx, self.number())?;
        let max_edge = ctx.settings.imaging.max_edge;
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
            let resized = resize_max_edge(&img, max_edge);
            save_derivative(&resized, &out, quality)?;

            files.push(out);
            ctx.logger.progress(((i + 1) * 100 / total) as u32);
        }

        let count = files.len();
        state.resize = Some(ResizeOutput { files, max_edge });
        Ok(StepResult::ok(format!(
            "Resized {} images to max edge {}px",
            count, max_edge
        )))
    }

    fn validate_outputs(&self, _ctx: &Context, state: &BatchState) -> ValidationResult {
        let Some(out) = &state.resize else {
            return ValidationResult::error("Resize output not recorded");
        };
        let mut result = ValidationResult::ok();
        for file in &out.files {
            if !file.is_file() {
                result.add_error(format!("Resized derivative missing: {}", file.display()));
            }
        }
        result
    }
}
