//! Step orchestration pipeline.
//!
//! Architecture:
//!
//! ```text
//! BatchRunner (one batch end-to-end)
//!    └── Pipeline (BTreeMap<u32, Box<dyn StepProcessor>>)
//!           ├── Step 1: Worksheet preparation
//!           ├── Step 2: CSV export
//!           ├── Step 3: Encoding cleanup
//!           ├── Step 4: Bit-depth conversion
//!           ├── Step 5: Metadata embedding
//!           ├── Step 6: Format conversion
//!           ├── Step 7: Resizing
//!           └── Step 8: Watermarking
//!                  │
//!                  ├── Context (settings, paths, config store, logger)
//!                  └── BatchState (typed per-step outputs)
//! ```
//!
//! Steps execute synchronously in ascending numeric order. The first
//! failure halts the run; completion flags persisted through the
//! config store let a later run resume from the failed step.

pub mod batch_runner;
pub mod errors;
pub mod pipeline;
pub mod step;
pub mod steps;
pub mod types;

pub use batch_runner::{BatchResult, BatchRunner, FIRST_STEP, LAST_STEP};
pub use errors::{PipelineError, StepError};
pub use pipeline::{CancelHandle, Pipeline, PipelineRunResult};
pub use step::StepProcessor;
pub use types::{
    BatchState, Context, ProgressCallback, StepResult, ValidationResult,
};

/// Build the standard eight-step pipeline.
pub fn create_standard_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(steps::WorksheetStep::new())
        .with_step(steps::CsvExportStep::new())
        .with_step(steps::EncodingStep::new())
        .with_step(steps::BitDepthStep::new())
        .with_step(steps::MetadataStep::new())
        .with_step(steps::ConvertStep::new())
        .with_step(steps::ResizeStep::new())
        .with_step(steps::WatermarkStep::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_pipeline_registers_all_steps() {
        let pipeline = create_standard_pipeline();
        assert_eq!(pipeline.step_count(), 8);
        assert_eq!(pipeline.registered_steps(), (1..=8).collect::<Vec<_>>());
    }
}
