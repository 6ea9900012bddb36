//! Step 4: Bit-depth conversion.

use std::fs;

use crate::imaging::{is_sixteen_bit, to_eight_bit};
use crate::orchestrator::errors::StepError;
use crate::orchestrator::step::StepProcessor;
use crate::orchestrator::types::{
    BatchState, Context, BitDepthOutput, StepResult, ValidationResult,
};

use super::{dir_has_images, ensure_step_dir, list_image_files};

/// Step 4: convert 16-bit masters to 8-bit working copies.
///
/// Masters stay untouched in the source directory. Images already at
/// 8 bits per channel are copied through byte-for-byte.
pub struct BitDepthStep;

impl BitDepthStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BitDepthStep {
    fn default() -> Self {
        Self::new()
    }
}

impl StepProcessor for BitDepthStep {
    fn number(&self) -> u32 {
        4
    }

    fn name(&self) -> &str {
        "Bit-depth conversion"
    }

    fn description(&self) -> &str {
        "Convert 16-bit masters to 8-bit working copies"
    }

    fn validate_inputs(&self, ctx: &Context) -> ValidationResult {
        let source = ctx.paths.source_dir();
        if !dir_has_images(&source) {
            return ValidationResult::error(format!(
                "No source images in {}",
                source.display()
            ));
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
            return Ok(StepResult::failed("No images to convert"));
        }

        let dir = ensure_step_dir(ctx, self.number())?;
        let total = images.len();
        let mut files = Vec::with_capacity(total);
        let mut converted = 0;

        for (i, input) in images.iter().enumerate() {
            let name = match input.file_name() {
                Some(name) => name,
                None => continue,
            };
            let out = dir.join(name);

            let img = image::open(input)
                .map_err(|e| StepError::image_error(format!("open {}", input.display()), e))?;

            if is_sixteen_bit(&img) {
                let eight = to_eight_bit(&img);
                eight
                    .save(&out)
                    .map_err(|e| StepError::image_error(format!("save {}", out.display()), e))?;
                converted += 1;
            } else {
                fs::copy(input, &out)
                    .map_err(|e| StepError::io_error(format!("copy {}", input.display()), e))?;
            }

            files.push(out);
            ctx.logger.progress(((i + 1) * 100 / total) as u32);
        }

        state.bit_depth = Some(BitDepthOutput { files, converted });
        Ok(StepResult::ok(format!(
            "{} of {} images needed conversion",
            converted, total
        )))
    }

    fn validate_outputs(&self, _ctx: &Context, state: &BatchState) -> ValidationResult {
        let Some(out) = &state.bit_depth else {
            return ValidationResult::error("Bit-depth output not recorded");
        };
        let mut result = ValidationResult::ok();
        for file in &out.files {
            if !file.is_file() {
                result.add_error(format!("Working copy missing: {}", file.display()));
            }
        }
        result
    }
}
