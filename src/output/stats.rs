//! Crawl statistics
//!
//! `CrawlStats` is created when a category crawl starts, mutated only by the
//! orchestrator driving that crawl, and finalized when the crawl ends.
//! Platform and run totals are built by absorbing category stats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counters for one category crawl, or an aggregate of several
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlStats {
    /// Listing pages the orchestrator tried to fetch
    pub pages_attempted: u64,
    pub pages_fetched: u64,
    /// Listing pages lost to fetch exhaustion or a blocked response
    pub pages_failed: u64,

    /// Items taken off parsed pages (before the pipeline)
    pub items_attempted: u64,
    /// Valid, first-seen records kept
    pub succeeded: u64,
    /// Records rejected by validation
    pub rejected: u64,
    pub duplicates_dropped: u64,
    /// Detail pages that could not be fetched or parsed
    pub detail_fetch_failures: u64,

    /// Failure counts keyed by reason
    pub failed_by_reason: BTreeMap<String, u64>,

    /// Accepted records per category name
    pub per_category: BTreeMap<String, u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl CrawlStats {
    /// Creates empty stats stamped with the current time
    pub fn started() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    pub fn record_failure(&mut self, reason: &str) {
        *self.failed_by_reason.entry(reason.to_string()).or_insert(0) += 1;
    }

    pub fn record_success(&mut self, category: &str) {
        self.succeeded += 1;
        *self.per_category.entry(category.to_string()).or_insert(0) += 1;
    }

    /// Sum of every failure reason count
    pub fn total_failures(&self) -> u64 {
        self.failed_by_reason.values().sum()
    }

    /// Stamps the finish time
    pub fn finalize(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Adds another set of counters into this one.
    ///
    /// The time window widens to cover both.
    pub fn absorb(&mut self, other: &CrawlStats) {
        self.pages_attempted += other.pages_attempted;
        self.pages_fetched += other.pages_fetched;
        self.pages_failed += other.pages_failed;
        self.items_attempted += other.items_attempted;
        self.succeeded += other.succeeded;
        self.rejected += other.rejected;
        self.duplicates_dropped += other.duplicates_dropped;
        self.detail_fetch_failures += other.detail_fetch_failures;

        for (reason, count) in &other.failed_by_reason {
            *self.failed_by_reason.entry(reason.clone()).or_insert(0) += count;
        }
        for (category, count) in &other.per_category {
            *self.per_category.entry(category.clone()).or_insert(0) += count;
        }

        self.started_at = match (self.started_at, other.started_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.finished_at = match (self.finished_at, other.finished_at) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    /// Share of attempted items that became records, as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.items_attempted == 0 {
            return 0.0;
        }
        (self.succeeded as f64 / self.items_attempted as f64) * 100.0
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_seconds()),
            _ => None,
        }
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStats) {
    println!("Pages:");
    println!("  Attempted: {}", stats.pages_attempted);
    println!("  Fetched:   {}", stats.pages_fetched);
    println!("  Failed:    {}", stats.pages_failed);
    println!();

    println!("Items:");
    println!("  Attempted:          {}", stats.items_attempted);
    println!("  Succeeded:          {}", stats.succeeded);
    println!("  Rejected:           {}", stats.rejected);
    println!("  Duplicates dropped: {}", stats.duplicates_dropped);
    if stats.detail_fetch_failures > 0 {
        println!("  Detail failures:    {}", stats.detail_fetch_failures);
    }
    println!();

    if !stats.per_category.is_empty() {
        println!("Records by Category:");
        for (category, count) in &stats.per_category {
            println!("  {}: {}", category, count);
        }
        println!();
    }

    if !stats.failed_by_reason.is_empty() {
        println!("Failures by Reason:");
        // Sort reasons by count (descending)
        let mut reasons: Vec<_> = stats.failed_by_reason.iter().collect();
        reasons.sort_by(|a, b| b.1.cmp(a.1));
        for (reason, count) in reasons {
            println!("  {}: {}", reason, count);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} items became records)",
        stats.success_rate(),
        stats.succeeded,
        stats.items_attempted
    );
}
