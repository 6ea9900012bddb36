//! Error types for the orchestrator pipeline.
//!
//! Errors carry context that chains through layers:
//! Batch → Step → Operation → Detail

use std::io;

use thiserror::Error;

/// Top-level pipeline error (caller contract violations).
///
/// Step failures are not errors at this level: they are recorded in
/// the run result and halt the run. Only misuse of the pipeline or a
/// cancellation request surfaces as a `PipelineError`.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A step range with start after end was requested.
    #[error("Invalid step range: start {start} is greater than end {end}")]
    InvalidRange { start: u32, end: u32 },

    /// Pipeline was cancelled before the given step.
    #[error("Batch '{batch_name}' was cancelled before step {step}")]
    Cancelled { batch_name: String, step: u32 },
}

impl PipelineError {
    /// Create an invalid range error.
    pub fn invalid_range(start: u32, end: u32) -> Self {
        Self::InvalidRange { start, end }
    }

    /// Create a cancelled error.
    pub fn cancelled(batch_name: impl Into<String>, step: u32) -> Self {
        Self::Cancelled {
            batch_name: batch_name.into(),
            step,
        }
    }
}

/// Error from a pipeline step with operation context.
#[derive(Error, Debug)]
pub enum StepError {
    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    /// Output validation failed.
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    /// An external command failed.
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    IoError {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// A required file was not found.
    #[error("Required file not found: {path}")]
    FileNotFound { path: String },

    /// Image decode/encode error.
    #[error("Image operation '{operation}' failed: {source}")]
    ImageError {
        operation: String,
        #[source]
        source: image::ImageError,
    },

    /// CSV read/write error.
    #[error("CSV error in {operation}: {source}")]
    CsvError {
        operation: String,
        #[source]
        source: csv::Error,
    },

    /// JSON read/write error.
    #[error("JSON error in {operation}: {source}")]
    JsonError {
        operation: String,
        #[source]
        source: serde_json::Error,
    },

    /// A precondition was not met.
    #[error("Precondition not met: {0}")]
    PreconditionFailed(String),

    /// Generic step error with message.
    #[error("{0}")]
    Other(String),
}

impl StepError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an invalid output error.
    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    /// Create a command failed error.
    pub fn command_failed(
        tool: impl Into<String>,
        exit_code: i32,
        message: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            tool: tool.into(),
            exit_code,
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::IoError {
            operation: operation.into(),
            source,
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create an image error with context.
    pub fn image_error(operation: impl Into<String>, source: image::ImageError) -> Self {
        Self::ImageError {
            operation: operation.into(),
            source,
        }
    }

    /// Create a CSV error with context.
    pub fn csv_error(operation: impl Into<String>, source: csv::Error) -> Self {
        Self::CsvError {
            operation: operation.into(),
            source,
        }
    }

    /// Create a JSON error with context.
    pub fn json_error(operation: impl Into<String>, source: serde_json::Error) -> Self {
        Self::JsonError {
            operation: operation.into(),
            source,
        }
    }

    /// Create a precondition failed error.
    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::PreconditionFailed(message.into())
    }

    /// Create a generic error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}
