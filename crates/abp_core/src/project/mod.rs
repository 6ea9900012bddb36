//! Per-batch project layout.

mod paths;

pub use paths::BatchPaths;
