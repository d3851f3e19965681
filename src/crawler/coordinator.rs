//! Multi-platform coordination
//!
//! The coordinator turns the requested platforms and categories into
//! `PlatformJob`s, runs them sequentially or concurrently, and merges their
//! results through a single writer: the run-level deduplicator and the
//! `RunSummary` are only touched here, after each job hands back its records.

use crate::config::{Config, ExecutionMode};
use crate::context::RunContext;
use crate::crawler::fetcher::DEFAULT_USER_AGENT;
use crate::crawler::orchestrator::{AbortReason, CrawlOrchestrator, PlatformPipeline};
use crate::output::events;
use crate::output::{CrawlStats, JobStatus, PlatformSummary, RunSummary};
use crate::pipeline::Deduplicator;
use crate::platform::{lookup, Category, Platform};
use crate::record::MovieRecord;
use crate::CatalogError;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The work assigned to one platform
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformJob {
    pub platform: Platform,
    pub categories: Vec<&'static Category>,
    /// Records this platform may contribute across all its categories
    pub max_movies: usize,
}

impl PlatformJob {
    /// Resolves category names for one platform. No names means the
    /// platform's default categories.
    pub fn new(platform: Platform, names: &[String], max_movies: usize) -> Result<Self, CatalogError> {
        let categories = if names.is_empty() {
            platform
                .default_categories()
                .iter()
                .map(|name| lookup(platform, name))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            names
                .iter()
                .map(|name| lookup(platform, name))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self {
            platform,
            categories,
            max_movies,
        })
    }
}

/// Plans one job per platform.
///
/// With several platforms, each requested category goes to the platforms
/// that offer it; a name no selected platform knows is an error. A platform
/// left with no categories gets no job.
pub fn plan_jobs(
    platforms: &[Platform],
    categories: &[String],
    max_movies: usize,
) -> Result<Vec<PlatformJob>, CatalogError> {
    if categories.is_empty() || platforms.len() == 1 {
        return platforms
            .iter()
            .map(|&platform| PlatformJob::new(platform, categories, max_movies))
            .collect();
    }

    for name in categories {
        if !platforms.iter().any(|&p| lookup(p, name).is_ok()) {
            return Err(CatalogError::NotInAnyCatalog(name.clone()));
        }
    }

    let mut jobs = Vec::new();
    for &platform in platforms {
        let offered: Vec<String> = categories
            .iter()
            .filter(|name| lookup(platform, name).is_ok())
            .cloned()
            .collect();
        if offered.is_empty() {
            tracing::info!(platform = %platform, "No requested category on this platform, skipping");
            continue;
        }
        jobs.push(PlatformJob::new(platform, &offered, max_movies)?);
    }
    Ok(jobs)
}

/// Records and summary of a whole run
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub records: Vec<MovieRecord>,
    pub summary: RunSummary,
}

impl RunOutput {
    pub fn records_for(&self, platform: Platform) -> Vec<&MovieRecord> {
        self.records.iter().filter(|r| r.platform == platform).collect()
    }
}

/// Result of a connectivity probe
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionReport {
    pub platform: Platform,
    pub reachable: bool,
    pub latency: Option<Duration>,
    pub status: Option<u16>,
    pub message: String,
}

/// Runs platform jobs and merges their output
pub struct MultiPlatformCoordinator {
    config: Arc<Config>,
    ctx: RunContext,
}

impl MultiPlatformCoordinator {
    pub fn new(config: Config) -> Self {
        Self::with_context(config, RunContext::new())
    }

    pub fn with_context(config: Config, ctx: RunContext) -> Self {
        Self {
            config: Arc::new(config),
            ctx,
        }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Requests cancellation of the running jobs. Records gathered so far
    /// are still returned.
    pub fn cancel(&self) {
        self.ctx.cancel();
    }

    pub async fn run(&self, jobs: Vec<PlatformJob>) -> RunOutput {
        let summary = RunSummary::new();
        tracing::info!(
            jobs = jobs.len(),
            execution = ?self.config.crawler.execution,
            "Starting run"
        );

        let results = match self.config.crawler.execution {
            ExecutionMode::Sequential => {
                let mut results = Vec::with_capacity(jobs.len());
                for job in jobs {
                    results.push(run_platform_job(self.config.clone(), self.ctx.clone(), job).await);
                }
                results
            }
            ExecutionMode::Concurrent => {
                let handles: Vec<_> = jobs
                    .into_iter()
                    .map(|job| {
                        let platform = job.platform;
                        let handle = tokio::spawn(run_platform_job(self.config.clone(), self.ctx.clone(), job));
                        (platform, handle)
                    })
                    .collect();

                let mut results = Vec::with_capacity(handles.len());
                for (platform, handle) in handles {
                    match handle.await {
                        Ok(result) => results.push(result),
                        Err(e) => {
                            tracing::error!(
                                event = events::PLATFORM_FAILED,
                                platform = %platform,
                                error = %e,
                                "Platform job panicked"
                            );
                            results.push((Vec::new(), PlatformSummary::failed(platform, e.to_string())));
                        }
                    }
                }
                results
            }
        };

        self.merge(summary, results)
    }

    /// Folds job results into the run's record set and summary
    fn merge(&self, mut summary: RunSummary, results: Vec<(Vec<MovieRecord>, PlatformSummary)>) -> RunOutput {
        let mut dedup = Deduplicator::new();
        let mut records = Vec::new();

        for (job_records, mut platform_summary) in results {
            let mut kept = 0u64;
            for record in job_records {
                if dedup.admit(record.platform, &record.source_id) {
                    records.push(record);
                    kept += 1;
                } else {
                    summary.merge_duplicates_dropped += 1;
                }
            }
            platform_summary.records = kept;
            summary.record_platform(platform_summary);
        }

        summary.finalize(records.len() as u64, self.ctx.request_count(), self.ctx.is_cancelled());
        tracing::info!(
            records = records.len(),
            requests = summary.requests_issued,
            cancelled = summary.cancelled,
            elapsed_ms = self.ctx.elapsed().as_millis() as u64,
            "Run finished"
        );

        RunOutput { records, summary }
    }

    /// Issues one plain GET to the platform's base URL
    pub async fn test_connection(&self, platform: Platform) -> ConnectionReport {
        let settings = self.config.platform(platform);
        let agent = self
            .config
            .user_agent
            .pool
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_USER_AGENT);

        let client = match Client::builder().timeout(settings.request_timeout).build() {
            Ok(client) => client,
            Err(e) => return unreachable(platform, None, e.to_string()),
        };

        let started = Instant::now();
        self.ctx.record_request();
        let response = client
            .get(&settings.base_url)
            .header(USER_AGENT, agent)
            .header(reqwest::header::ACCEPT_LANGUAGE, platform.accept_language())
            .send()
            .await;
        let latency = started.elapsed();

        match response {
            Ok(response) => {
                let status = response.status();
                ConnectionReport {
                    platform,
                    reachable: status.is_success(),
                    latency: Some(latency),
                    status: Some(status.as_u16()),
                    message: format!("HTTP {}", status),
                }
            }
            Err(e) => unreachable(platform, Some(latency), e.to_string()),
        }
    }
}

fn unreachable(platform: Platform, latency: Option<Duration>, message: String) -> ConnectionReport {
    ConnectionReport {
        platform,
        reachable: false,
        latency,
        status: None,
        message,
    }
}

/// Runs every category of one platform job.
///
/// Never fails: setup problems become a `Failed` summary so that other
/// platforms keep running.
async fn run_platform_job(
    config: Arc<Config>,
    ctx: RunContext,
    job: PlatformJob,
) -> (Vec<MovieRecord>, PlatformSummary) {
    let platform = job.platform;

    if !config.platform(platform).enabled {
        tracing::warn!(event = events::PLATFORM_FAILED, platform = %platform, "Platform disabled in configuration");
        return (Vec::new(), PlatformSummary::failed(platform, "disabled in configuration"));
    }

    let pipeline = match PlatformPipeline::build(&config, platform, ctx).await {
        Ok(pipeline) => pipeline,
        Err(e) => {
            tracing::error!(
                event = events::PLATFORM_FAILED,
                platform = %platform,
                error = %e,
                "Platform job could not start"
            );
            return (Vec::new(), PlatformSummary::failed(platform, e.to_string()));
        }
    };

    run_pipeline(Arc::new(pipeline), job).await
}

/// Crawls the job's categories on their own task, then releases the
/// pipeline whether that task finished or panicked
async fn run_pipeline(pipeline: Arc<PlatformPipeline>, job: PlatformJob) -> (Vec<MovieRecord>, PlatformSummary) {
    let platform = job.platform;
    let joined = tokio::spawn(crawl_categories(pipeline.clone(), job)).await;
    pipeline.release().await;

    match joined {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(
                event = events::PLATFORM_FAILED,
                platform = %platform,
                error = %e,
                "Platform job panicked"
            );
            (Vec::new(), PlatformSummary::failed(platform, e.to_string()))
        }
    }
}

async fn crawl_categories(pipeline: Arc<PlatformPipeline>, job: PlatformJob) -> (Vec<MovieRecord>, PlatformSummary) {
    let platform = job.platform;
    let mut dedup = Deduplicator::new();
    let mut records: Vec<MovieRecord> = Vec::new();
    let mut reports = Vec::with_capacity(job.categories.len());
    let mut stats = CrawlStats::started();
    let mut status = JobStatus::Completed;

    for &category in &job.categories {
        let remaining = job.max_movies.saturating_sub(records.len());
        if remaining == 0 {
            tracing::info!(platform = %platform, "Movie cap reached, skipping remaining categories");
            break;
        }

        let outcome = CrawlOrchestrator::new(&pipeline, category, remaining)
            .run(&mut dedup)
            .await;
        stats.absorb(&outcome.stats);
        reports.push(outcome.report());
        records.extend(outcome.records);

        if let Some(reason) = outcome.abort_reason {
            let message = format!("{}: {}", category.name, reason);
            status = match &reason {
                AbortReason::ConnectionSetup(_) if records.is_empty() => JobStatus::Failed { reason: message },
                _ => JobStatus::Partial { reason: message },
            };
            if reason.ends_job() {
                break;
            }
        }
    }

    stats.finalize();

    if status.is_failed() {
        tracing::error!(event = events::PLATFORM_FAILED, platform = %platform, "Platform job failed");
    }

    let summary = PlatformSummary {
        platform,
        status,
        records: records.len() as u64,
        categories: reports,
        stats,
    };
    (records, summary)
}
