//! Output handler traits and types
//!
//! The crawl core hands its records and summary to an `OutputHandler`; the
//! handler decides where and in which format they land.

use crate::output::summary::RunSummary;
use crate::platform::Platform;
use crate::record::MovieRecord;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to encode or decode records: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Trait for output handlers
///
/// Each method returns the location it wrote to.
pub trait OutputHandler {
    /// Writes the records collected for one platform
    ///
    /// # Arguments
    ///
    /// * `platform` - Platform the records were crawled from
    /// * `records` - Accepted records, in crawl order
    fn write_records(&self, platform: Platform, records: &[MovieRecord]) -> OutputResult<PathBuf>;

    /// Writes the run summary
    ///
    /// # Arguments
    ///
    /// * `summary` - Finalized summary of the run
    fn write_summary(&self, summary: &RunSummary) -> OutputResult<PathBuf>;

    /// Writes the result of merging two record collections
    ///
    /// # Arguments
    ///
    /// * `records` - Deduplicated union of both collections
    fn write_merged(&self, records: &[MovieRecord]) -> OutputResult<PathBuf>;
}
