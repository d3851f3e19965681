//! Output module for run statistics, summaries and record export
//!
//! This module handles:
//! - Counting what happened during a crawl (`CrawlStats`)
//! - Merging per-platform outcomes into a `RunSummary`
//! - Writing records and summaries through an `OutputHandler`
//! - Naming structured log events

pub mod events;
mod json_output;
pub mod stats;
pub mod summary;
mod traits;

pub use json_output::{load_records, JsonOutputHandler};
pub use stats::{print_statistics, CrawlStats};
pub use summary::{print_summary, CategoryReport, JobStatus, PlatformSummary, RunSummary};
pub use traits::{OutputError, OutputHandler, OutputResult};
