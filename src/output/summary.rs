//! Run summaries
//!
//! The coordinator builds one `RunSummary` per run from the outcomes of every
//! platform job. Writes to it are serialized through the coordinator.

use crate::output::stats::{print_statistics, CrawlStats};
use crate::platform::Platform;
use crate::state::CrawlState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a platform job ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    /// Every category finished normally
    Completed,
    /// At least one category was aborted; its records are kept
    Partial { reason: String },
    /// The job could not run (e.g. the fetch mechanism could not be set up)
    Failed { reason: String },
}

impl JobStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, JobStatus::Failed { .. })
    }
}

/// Outcome of one category crawl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryReport {
    pub category: String,
    pub state: CrawlState,
    pub records: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<String>,
    pub stats: CrawlStats,
}

/// Outcome of one platform job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformSummary {
    pub platform: Platform,
    pub status: JobStatus,
    pub records: u64,
    pub categories: Vec<CategoryReport>,
    pub stats: CrawlStats,
}

impl PlatformSummary {
    /// Summary for a job that never got to crawl
    pub fn failed(platform: Platform, reason: impl Into<String>) -> Self {
        Self {
            platform,
            status: JobStatus::Failed {
                reason: reason.into(),
            },
            records: 0,
            categories: Vec::new(),
            stats: CrawlStats::default(),
        }
    }
}

/// Merged summary of a whole run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub total_records: u64,
    pub requests_issued: u64,
    /// Records dropped while merging platform results into the run set
    pub merge_duplicates_dropped: u64,
    pub cancelled: bool,
    pub platforms: BTreeMap<Platform, PlatformSummary>,
    /// Failure counts by reason across all platforms, including
    /// `platform_failed` for jobs that could not run
    pub failure_breakdown: BTreeMap<String, u64>,
    pub stats: CrawlStats,
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            total_records: 0,
            requests_issued: 0,
            merge_duplicates_dropped: 0,
            cancelled: false,
            platforms: BTreeMap::new(),
            failure_breakdown: BTreeMap::new(),
            stats: CrawlStats::default(),
        }
    }

    /// Adds a platform's outcome to the run totals
    pub fn record_platform(&mut self, summary: PlatformSummary) {
        self.stats.absorb(&summary.stats);
        for (reason, count) in &summary.stats.failed_by_reason {
            *self.failure_breakdown.entry(reason.clone()).or_insert(0) += count;
        }
        if summary.status.is_failed() {
            *self
                .failure_breakdown
                .entry("platform_failed".to_string())
                .or_insert(0) += 1;
        }
        self.platforms.insert(summary.platform, summary);
    }

    /// Stamps totals and the finish time
    pub fn finalize(&mut self, total_records: u64, requests_issued: u64, cancelled: bool) {
        self.total_records = total_records;
        self.requests_issued = requests_issued;
        self.cancelled = cancelled;
        self.finished_at = Some(Utc::now());
        self.stats.finalize();
    }

    pub fn platform(&self, platform: Platform) -> Option<&PlatformSummary> {
        self.platforms.get(&platform)
    }

    /// Records kept for a platform after the run merge
    pub fn records_for(&self, platform: Platform) -> u64 {
        self.platform(platform).map_or(0, |p| p.records)
    }

    pub fn failed_platforms(&self) -> Vec<Platform> {
        self.platforms
            .values()
            .filter(|p| p.status.is_failed())
            .map(|p| p.platform)
            .collect()
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}

/// Prints a run summary to stdout
pub fn print_summary(summary: &RunSummary) {
    println!("=== Crawl Summary ===\n");

    println!("Overview:");
    println!("  Total records: {}", summary.total_records);
    println!("  Requests issued: {}", summary.requests_issued);
    if summary.merge_duplicates_dropped > 0 {
        println!(
            "  Dropped while merging: {}",
            summary.merge_duplicates_dropped
        );
    }
    if summary.cancelled {
        println!("  Run was cancelled; partial results kept");
    }
    println!();

    for platform in summary.platforms.values() {
        let status = match &platform.status {
            JobStatus::Completed => "completed".to_string(),
            JobStatus::Partial { reason } => format!("partial ({})", reason),
            JobStatus::Failed { reason } => format!("failed ({})", reason),
        };
        println!(
            "{}: {} records, {}",
            platform.platform.display_name(),
            platform.records,
            status
        );
        for category in &platform.categories {
            match &category.abort_reason {
                Some(reason) => println!(
                    "  - {}: {} records, {} ({})",
                    category.category, category.records, category.state, reason
                ),
                None => println!(
                    "  - {}: {} records, {}",
                    category.category, category.records, category.state
                ),
            }
        }
    }
    println!();

    print_statistics(&summary.stats);
}
