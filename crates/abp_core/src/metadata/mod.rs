//! Metadata embedding support.
//!
//! Builds exiftool invocations from worksheet rows. Executing the
//! external tool is the metadata step's job; this module only knows
//! how to translate a row into command-line tokens.

mod args_builder;

pub use args_builder::ExiftoolArgsBuilder;
