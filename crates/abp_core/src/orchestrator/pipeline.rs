//! Pipeline runner that executes numbered steps in ascending order.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::errors::PipelineError;
use super::step::StepProcessor;
use super::types::{BatchState, Context, StepResult, ValidationResult};

/// Pipeline that runs a registry of numbered steps.
///
/// Steps execute in strictly ascending numeric order regardless of
/// registration order. The first failure halts the run; resumption is
/// a new `run` call starting at the failed step, relying on idempotent
/// step outputs and the completion flags persisted by the config
/// store rather than any saved pipeline state.
pub struct Pipeline {
    /// Registered steps, keyed and ordered by step number.
    steps: BTreeMap<u32, Box<dyn StepProcessor>>,
    /// Cancellation flag.
    cancelled: Arc<AtomicBool>,
}

impl Pipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self {
            steps: BTreeMap::new(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Register a step processor under its step number.
    ///
    /// Registering a second processor for an already-used number
    /// silently replaces the first.
    pub fn register_step<S: StepProcessor + 'static>(&mut self, step: S) -> &mut Self {
        self.steps.insert(step.number(), Box::new(step));
        self
    }

    /// Register a step (builder pattern).
    pub fn with_step<S: StepProcessor + 'static>(mut self, step: S) -> Self {
        self.register_step(step);
        self
    }

    /// Get a cancellation handle.
    ///
    /// Call `cancel()` on the returned handle to stop the pipeline at
    /// the next step boundary. An in-flight `execute` is never
    /// interrupted.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            flag: Arc::clone(&self.cancelled),
        }
    }

    /// Check if pipeline has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Get the number of registered steps.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Whether a processor is registered for the given step number.
    pub fn is_registered(&self, step: u32) -> bool {
        self.steps.contains_key(&step)
    }

    /// Get the registered step numbers in ascending order.
    pub fn registered_steps(&self) -> Vec<u32> {
        self.steps.keys().copied().collect()
    }

    /// Run input validation for every registered step in the range.
    ///
    /// This is the caller-side "validate project" action; it never
    /// executes anything.
    pub fn validate(
        &self,
        ctx: &Context,
        start_step: u32,
        end_step: u32,
    ) -> Result<Vec<(u32, ValidationResult)>, PipelineError> {
        if start_step > end_step {
            return Err(PipelineError::invalid_range(start_step, end_step));
        }

        let mut results = Vec::new();
        for (&n, step) in self.steps.range(start_step..=end_step) {
            ctx.logger
                .validation(&format!("Checking inputs for step {}: {}", n, step.name()));
            results.push((n, step.validate_inputs(ctx)));
        }
        Ok(results)
    }

    /// Run the requested step range in ascending order.
    ///
    /// For each number in `[start_step, end_step]`:
    /// - unregistered numbers are skipped silently;
    /// - with `dry_run`, intent is logged and nothing executes or is
    ///   recorded;
    /// - otherwise `execute` runs inside a fault boundary: an `Err` or
    ///   a panic becomes a failing recorded `StepResult`.
    ///
    /// Each successful step's completion flag is persisted through the
    /// config store immediately, so flags survive a later failure. The
    /// first failure stops the run and the partial result is returned.
    pub fn run(
        &self,
        ctx: &Context,
        state: &mut BatchState,
        start_step: u32,
        end_step: u32,
        dry_run: bool,
    ) -> Result<PipelineRunResult, PipelineError> {
        if start_step > end_step {
            return Err(PipelineError::invalid_range(start_step, end_step));
        }

        let mut result = PipelineRunResult::new();
        let total = u64::from(end_step - start_step + 1);

        for (i, n) in (start_step..=end_step).enumerate() {
            // Check for cancellation at the step boundary
            if self.is_cancelled() {
                ctx.logger
                    .warn(&format!("Pipeline cancelled before step {}", n));
                return Err(PipelineError::cancelled(ctx.batch_name(), n));
            }

            let step = match self.steps.get(&n) {
                Some(step) => step,
                None => {
                    ctx.logger
                        .debug(&format!("No processor registered for step {}, skipping", n));
                    continue;
                }
            };
            let step_name = step.name();

            if dry_run {
                ctx.logger
                    .info(&format!("[dry run] Would execute step {}: {}", n, step_name));
                continue;
            }

            ctx.logger.phase(&format!("Step {}: {}", n, step_name));

            let percent = ((i as u64 * 100) / total) as u32;
            ctx.report_progress(step_name, percent, &format!("Starting {}", step_name));

            // Fault boundary: Err and panics both become a failing result
            let step_result =
                match panic::catch_unwind(AssertUnwindSafe(|| step.execute(ctx, state))) {
                    Ok(Ok(res)) => res,
                    Ok(Err(e)) => {
                        ctx.logger.error(&format!("Step {} failed: {}", n, e));
                        StepResult::failed(e.to_string())
                    }
                    Err(payload) => {
                        let msg = panic_message(payload);
                        ctx.logger
                            .error(&format!("Step {} panicked: {}", n, msg));
                        StepResult::failed(msg)
                    }
                };

            if step_result.success {
                ctx.logger
                    .success(&format!("{} completed: {}", step_name, step_result.message));

                // Persist the flag now so it survives a later failure
                if !ctx.config.update_step_status(n, true) {
                    ctx.logger
                        .warn(&format!("Could not persist completion flag for step {}", n));
                }
            }

            let failed = !step_result.success;
            result.add_step_result(n, step_result);

            if failed {
                return Ok(result);
            }
        }

        if !dry_run {
            ctx.report_progress("Complete", 100, "Pipeline finished");
            ctx.logger.success("Pipeline completed");
        }

        Ok(result)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract a readable message from a panic payload.
fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "step execution failed".to_string()
    }
}

/// Handle for cancelling a running pipeline.
#[derive(Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Cancel the pipeline.
    ///
    /// The pipeline will stop at the next step boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Aggregate outcome of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineRunResult {
    /// Recorded (step number, result) pairs in execution order.
    pub step_results: Vec<(u32, StepResult)>,
    /// Step numbers that completed successfully, ascending.
    pub steps_completed: Vec<u32>,
    /// True only if every recorded result succeeded.
    pub success: bool,
    /// Message of the first failing result, empty if none failed.
    pub error_message: String,
}

impl PipelineRunResult {
    /// Create an empty (successful) result.
    pub fn new() -> Self {
        Self {
            step_results: Vec::new(),
            steps_completed: Vec::new(),
            success: true,
            error_message: String::new(),
        }
    }

    /// Record one step's result.
    ///
    /// Updates `success` by AND, appends to `steps_completed` on
    /// success, and captures the first failure's message.
    pub fn add_step_result(&mut self, step: u32, result: StepResult) {
        if result.success {
            self.steps_completed.push(step);
        } else if self.success {
            self.error_message = result.message.clone();
        }
        self.success &= result.success;
        self.step_results.push((step, result));
    }
}

impl Default for PipelineRunResult {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigStore, Settings};
    use crate::logging::{BatchLogger, LogConfig};
    use crate::models::BatchSpec;
    use crate::orchestrator::errors::StepError;
    use crate::project::BatchPaths;
    use parking_lot::Mutex;
    use serde_json::Value;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// In-memory config store for pipeline tests.
    #[derive(Default)]
    struct MemoryConfig {
        flags: Mutex<HashMap<u32, bool>>,
        values: Mutex<HashMap<String, Value>>,
    }

    impl ConfigStore for MemoryConfig {
        fn get_step_status(&self, step: u32) -> bool {
            self.flags.lock().get(&step).copied().unwrap_or(false)
        }

        fn update_step_status(&self, step: u32, completed: bool) -> bool {
            self.flags.lock().insert(step, completed);
            true
        }

        fn get(&self, key: &str) -> Option<Value> {
            self.values.lock().get(key).cloned()
        }

        fn set(&self, key: &str, value: Value) -> bool {
            self.values.lock().insert(key.to_string(), value);
            true
        }
    }

    /// Step that records executions into a shared log.
    struct RecordingStep {
        number: u32,
        name: &'static str,
        executed: Arc<Mutex<Vec<u32>>>,
        fail: bool,
        panic: bool,
    }

    impl RecordingStep {
        fn ok(number: u32, executed: Arc<Mutex<Vec<u32>>>) -> Self {
            Self {
                number,
                name: "Recording",
                executed,
                fail: false,
                panic: false,
            }
        }

        fn failing(number: u32, executed: Arc<Mutex<Vec<u32>>>) -> Self {
            Self {
                fail: true,
                ..Self::ok(number, executed)
            }
        }

        fn panicking(number: u32, executed: Arc<Mutex<Vec<u32>>>) -> Self {
            Self {
                panic: true,
                ..Self::ok(number, executed)
            }
        }
    }

    impl StepProcessor for RecordingStep {
        fn number(&self) -> u32 {
            self.number
        }

        fn name(&self) -> &str {
            self.name
        }

        fn validate_inputs(&self, _ctx: &Context) -> ValidationResult {
            ValidationResult::ok()
        }

        fn execute(
            &self,
            _ctx: &Context,
            _state: &mut BatchState,
        ) -> Result<StepResult, StepError> {
            self.executed.lock().push(self.number);
            if self.panic {
                panic!("step {} blew up", self.number);
            }
            if self.fail {
                return Ok(StepResult::failed(format!("step {} failed", self.number)));
            }
            Ok(StepResult::ok(format!("step {} done", self.number)))
        }

        fn validate_outputs(&self, _ctx: &Context, _state: &BatchState) -> ValidationResult {
            ValidationResult::ok()
        }
    }

    fn test_context(dir: &TempDir) -> (Context, Arc<MemoryConfig>) {
        let config = Arc::new(MemoryConfig::default());
        let logger = Arc::new(
            BatchLogger::new("test_batch", dir.path().join("logs"), LogConfig::default(), None)
                .unwrap(),
        );
        let ctx = Context::new(
            BatchSpec::new("test_batch", dir.path()),
            Settings::default(),
            BatchPaths::new(dir.path()),
            config.clone(),
            logger,
        );
        (ctx, config)
    }

    #[test]
    fn pipeline_builds_correctly() {
        let executed = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new()
            .with_step(RecordingStep::ok(1, executed.clone()))
            .with_step(RecordingStep::ok(2, executed));

        assert_eq!(pipeline.step_count(), 2);
        assert_eq!(pipeline.registered_steps(), vec![1, 2]);
        assert!(pipeline.is_registered(1));
        assert!(!pipeline.is_registered(3));
    }

    #[test]
    fn registration_overwrites_silently() {
        let executed = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new()
            .with_step(RecordingStep::failing(4, executed.clone()))
            .with_step(RecordingStep::ok(4, executed.clone()));

        assert_eq!(pipeline.step_count(), 1);

        let dir = TempDir::new().unwrap();
        let (ctx, _) = test_context(&dir);
        let mut state = BatchState::new("t");
        let result = pipeline.run(&ctx, &mut state, 4, 4, false).unwrap();

        // The replacement (succeeding) step ran
        assert!(result.success);
        assert_eq!(result.steps_completed, vec![4]);
    }

    #[test]
    fn steps_run_in_ascending_order_regardless_of_registration() {
        let executed = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new()
            .with_step(RecordingStep::ok(7, executed.clone()))
            .with_step(RecordingStep::ok(2, executed.clone()))
            .with_step(RecordingStep::ok(5, executed.clone()));

        let dir = TempDir::new().unwrap();
        let (ctx, _) = test_context(&dir);
        let mut state = BatchState::new("t");
        let result = pipeline.run(&ctx, &mut state, 1, 8, false).unwrap();

        assert!(result.success);
        assert_eq!(*executed.lock(), vec![2, 5, 7]);
        assert_eq!(result.steps_completed, vec![2, 5, 7]);
    }

    #[test]
    fn dry_run_records_nothing_and_executes_nothing() {
        let executed = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new()
            .with_step(RecordingStep::ok(1, executed.clone()))
            .with_step(RecordingStep::ok(2, executed.clone()));

        let dir = TempDir::new().unwrap();
        let (ctx, config) = test_context(&dir);
        let mut state = BatchState::new("t");
        let result = pipeline.run(&ctx, &mut state, 1, 2, true).unwrap();

        assert!(result.success);
        assert!(result.step_results.is_empty());
        assert!(result.steps_completed.is_empty());
        assert!(executed.lock().is_empty());
        assert!(!config.get_step_status(1));
    }

    #[test]
    fn failure_halts_before_next_step() {
        let executed = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new()
            .with_step(RecordingStep::ok(1, executed.clone()))
            .with_step(RecordingStep::failing(2, executed.clone()))
            .with_step(RecordingStep::ok(3, executed.clone()));

        let dir = TempDir::new().unwrap();
        let (ctx, config) = test_context(&dir);
        let mut state = BatchState::new("t");
        let result = pipeline.run(&ctx, &mut state, 1, 3, false).unwrap();

        assert!(!result.success);
        assert_eq!(result.steps_completed, vec![1]);
        assert_eq!(result.error_message, "step 2 failed");
        // Step 3 never executed
        assert_eq!(*executed.lock(), vec![1, 2]);
        // Step 1's flag persisted despite the later failure
        assert!(config.get_step_status(1));
        assert!(!config.get_step_status(2));
    }

    #[test]
    fn unregistered_steps_are_skipped_silently() {
        let executed = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new()
            .with_step(RecordingStep::ok(1, executed.clone()))
            .with_step(RecordingStep::ok(3, executed.clone()));

        let dir = TempDir::new().unwrap();
        let (ctx, _) = test_context(&dir);
        let mut state = BatchState::new("t");
        let result = pipeline.run(&ctx, &mut state, 1, 3, false).unwrap();

        assert!(result.success);
        assert_eq!(result.steps_completed, vec![1, 3]);
        assert_eq!(result.step_results.len(), 2);
    }

    #[test]
    fn single_step_range_executes_exactly_that_step() {
        let executed = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new()
            .with_step(RecordingStep::ok(1, executed.clone()))
            .with_step(RecordingStep::ok(2, executed.clone()))
            .with_step(RecordingStep::ok(3, executed.clone()));

        let dir = TempDir::new().unwrap();
        let (ctx, _) = test_context(&dir);
        let mut state = BatchState::new("t");
        let result = pipeline.run(&ctx, &mut state, 2, 2, false).unwrap();

        assert_eq!(*executed.lock(), vec![2]);
        assert_eq!(result.steps_completed, vec![2]);
    }

    #[test]
    fn inverted_range_is_a_usage_error() {
        let pipeline = Pipeline::new();
        let dir = TempDir::new().unwrap();
        let (ctx, _) = test_context(&dir);
        let mut state = BatchState::new("t");

        let err = pipeline.run(&ctx, &mut state, 5, 2, false).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRange { start: 5, end: 2 }));
    }

    #[test]
    fn panicking_step_becomes_failing_result() {
        let executed = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new()
            .with_step(RecordingStep::panicking(1, executed.clone()))
            .with_step(RecordingStep::ok(2, executed.clone()));

        let dir = TempDir::new().unwrap();
        let (ctx, _) = test_context(&dir);
        let mut state = BatchState::new("t");
        let result = pipeline.run(&ctx, &mut state, 1, 2, false).unwrap();

        assert!(!result.success);
        assert!(result.error_message.contains("step 1 blew up"));
        assert!(result.steps_completed.is_empty());
        // Step 2 never ran
        assert_eq!(*executed.lock(), vec![1]);
    }

    #[test]
    fn resume_run_shares_completion_flags() {
        let dir = TempDir::new().unwrap();
        let (ctx, config) = test_context(&dir);

        // First attempt: step 2 fails
        let executed = Arc::new(Mutex::new(Vec::new()));
        let pipeline_a = Pipeline::new()
            .with_step(RecordingStep::ok(1, executed.clone()))
            .with_step(RecordingStep::failing(2, executed.clone()))
            .with_step(RecordingStep::ok(3, executed.clone()));

        let mut state = BatchState::new("t");
        let result_a = pipeline_a.run(&ctx, &mut state, 1, 3, false).unwrap();
        assert!(!result_a.success);
        assert_eq!(result_a.steps_completed, vec![1]);

        // Second attempt: fresh pipeline with the remaining (fixed) steps
        let pipeline_b = Pipeline::new()
            .with_step(RecordingStep::ok(2, executed.clone()))
            .with_step(RecordingStep::ok(3, executed.clone()));

        let mut state_b = BatchState::new("t");
        let result_b = pipeline_b.run(&ctx, &mut state_b, 2, 3, false).unwrap();
        assert!(result_b.success);
        assert_eq!(result_b.steps_completed, vec![2, 3]);

        // All three steps now flagged complete in the shared store
        assert!(config.get_step_status(1));
        assert!(config.get_step_status(2));
        assert!(config.get_step_status(3));
    }

    #[test]
    fn cancel_handle_stops_at_step_boundary() {
        let executed = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new().with_step(RecordingStep::ok(1, executed.clone()));

        let handle = pipeline.cancel_handle();
        assert!(!pipeline.is_cancelled());
        handle.cancel();
        assert!(pipeline.is_cancelled());

        let dir = TempDir::new().unwrap();
        let (ctx, _) = test_context(&dir);
        let mut state = BatchState::new("t");
        let err = pipeline.run(&ctx, &mut state, 1, 1, false).unwrap_err();

        assert!(matches!(err, PipelineError::Cancelled { .. }));
        assert!(executed.lock().is_empty());
    }

    #[test]
    fn run_result_accumulates() {
        let mut result = PipelineRunResult::new();
        result.add_step_result(1, StepResult::ok("a"));
        result.add_step_result(2, StepResult::ok("b"));
        result.add_step_result(3, StepResult::ok("c"));

        assert!(result.success);
        assert_eq!(result.steps_completed, vec![1, 2, 3]);
        assert!(result.error_message.is_empty());

        result.add_step_result(4, StepResult::failed("no watermark file"));

        assert!(!result.success);
        assert_eq!(result.steps_completed, vec![1, 2, 3]);
        assert_eq!(result.error_message, "no watermark file");
    }
}
