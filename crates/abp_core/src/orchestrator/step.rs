//! Step processor trait definition.
//!
//! All numbered pipeline steps implement this trait, providing a
//! consistent interface for validation and execution.

use super::errors::StepError;
use super::types::{BatchState, Context, StepResult, ValidationResult};

/// Trait for numbered pipeline steps.
///
/// Each step in the pipeline implements this trait. A step is
/// identified by its number, which is both its position in the fixed
/// sequence and its registration key.
///
/// The run loop only calls `execute`; the validation hooks are for
/// callers and tests:
///
/// 1. `validate_inputs` - Check preconditions (no side effects)
/// 2. `execute` - Perform the step's work
/// 3. `validate_outputs` - Verify the step produced its artifacts
///
/// # Example
///
/// ```ignore
/// struct WorksheetStep;
///
/// impl StepProcessor for WorksheetStep {
///     fn number(&self) -> u32 { 1 }
///     fn name(&self) -> &str { "Worksheet" }
///
///     fn validate_inputs(&self, ctx: &Context) -> ValidationResult {
///         if !ctx.paths.source_dir().is_dir() {
///             return ValidationResult::error("No source directory");
///         }
///         ValidationResult::ok()
///     }
///
///     fn execute(&self, ctx: &Context, state: &mut BatchState)
///         -> Result<StepResult, StepError>
///     {
///         // Scan images, write the worksheet...
///         state.worksheet = Some(WorksheetOutput { .. });
///         Ok(StepResult::ok("Worksheet prepared"))
///     }
///
///     fn validate_outputs(&self, _ctx: &Context, state: &BatchState) -> ValidationResult {
///         if !state.has_worksheet() {
///             return ValidationResult::error("Worksheet not recorded");
///         }
///         ValidationResult::ok()
///     }
/// }
/// ```
pub trait StepProcessor: Send + Sync {
    /// Get the step number (1-based position in the sequence).
    fn number(&self) -> u32;

    /// Get the step name (for logging and error context).
    fn name(&self) -> &str;

    /// Validate inputs before execution.
    ///
    /// Should check that all required preconditions are met (input
    /// files exist, configuration is present) without side effects.
    /// Advisory: the run loop does not consult it.
    fn validate_inputs(&self, ctx: &Context) -> ValidationResult;

    /// Execute the step's main work.
    ///
    /// Performs the step's file-affecting work and records results in
    /// `state`. Returns a `StepResult` carrying success/failure and a
    /// message; `Err(StepError)` is the fault channel and is converted
    /// by the pipeline into a failing `StepResult`.
    fn execute(&self, ctx: &Context, state: &mut BatchState) -> Result<StepResult, StepError>;

    /// Validate outputs after execution.
    ///
    /// Should verify that the step produced its expected artifacts
    /// (files exist, state section populated). Used by tests and
    /// callers to assert step correctness independent of `execute`.
    fn validate_outputs(&self, ctx: &Context, state: &BatchState) -> ValidationResult;

    /// Human-readable description of what this step does.
    fn description(&self) -> &str {
        self.name()
    }
}
