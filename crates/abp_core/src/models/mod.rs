//! Data models shared across the crate.

mod batch;
mod worksheet;

pub use batch::BatchSpec;
pub use worksheet::WorksheetRow;
