//! Category crawl orchestration
//!
//! A `CrawlOrchestrator` drives one category of one platform through the
//! crawl state machine:
//!
//! ```text
//! Idle -> Paginating -> Fetching -> Parsing -> [Normalizing -> Validating -> Deduping]* -> Paginating
//!                    \-> Done                                      (any) -> Aborted
//! ```
//!
//! Pages are fetched sequentially through the platform's shared
//! `FetchClient`. Items flow through normalization, validation and the
//! platform's `Deduplicator` one at a time; only accepted records count
//! toward the movie cap.

use crate::config::Config;
use crate::context::RunContext;
use crate::crawler::fetcher::{
    FetchClient, FetchFailure, FetchTarget, HttpMechanism, RetryPolicy, UserAgentPool,
};
use crate::crawler::limiter::RateLimiter;
use crate::crawler::parser::{PageParser, SourceParser};
use crate::crawler::render::{BrowserMechanism, WebDriverSettings};
use crate::output::events;
use crate::output::{CategoryReport, CrawlStats};
use crate::pipeline::{Deduplicator, FieldNormalizer, RecordValidator};
use crate::platform::{Category, Platform, RenderMode};
use crate::record::{CandidateRecord, MovieRecord};
use crate::state::CrawlState;
use crate::url::resolve_link;
use crate::SiftError;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Limits applied to every category of a platform job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryJobSettings {
    pub max_pages: u32,
    pub max_consecutive_page_failures: u32,
    pub fetch_details: bool,
    pub render_mode: RenderMode,
}

impl CategoryJobSettings {
    pub fn from_config(config: &Config, platform: Platform) -> Self {
        let settings = config.platform(platform);
        Self {
            max_pages: config.crawler.max_pages,
            max_consecutive_page_failures: config.crawler.max_consecutive_page_failures,
            fetch_details: settings.fetch_details,
            render_mode: settings.rendering,
        }
    }
}

/// Everything a platform job needs to crawl its categories
///
/// Owns the platform's fetch client (and through it the rate limiter and any
/// browser session), its parser and the record pipeline stages.
pub struct PlatformPipeline {
    platform: Platform,
    base_url: Url,
    fetcher: FetchClient,
    parser: SourceParser,
    normalizer: FieldNormalizer,
    validator: RecordValidator,
    settings: CategoryJobSettings,
}

impl PlatformPipeline {
    pub fn new(platform: Platform, base_url: Url, fetcher: FetchClient, settings: CategoryJobSettings) -> Self {
        Self {
            platform,
            validator: RecordValidator::new(platform, &base_url),
            base_url,
            fetcher,
            parser: SourceParser::for_platform(platform),
            normalizer: FieldNormalizer::new(),
            settings,
        }
    }

    /// Builds the pipeline from configuration.
    ///
    /// For script rendering this opens the browser session; failing to do so
    /// is a connection setup error for the platform.
    pub async fn build(config: &Config, platform: Platform, ctx: RunContext) -> Result<Self, SiftError> {
        let settings = config.platform(platform);
        let base_url = Url::parse(&settings.base_url)?;

        let plain = HttpMechanism::new(settings.request_timeout, platform.accept_language())?;
        let agents = UserAgentPool::new(config.user_agent.pool.clone());
        let primary_agent = agents.primary().to_string();

        let mut fetcher = FetchClient::new(
            Arc::new(plain),
            RateLimiter::new(settings.min_delay, settings.max_delay),
            settings.retry,
            agents,
            ctx,
        );

        if settings.rendering == RenderMode::Script {
            let webdriver = WebDriverSettings::from_config(&config.webdriver).map_err(|e| {
                SiftError::ConnectionSetup {
                    platform,
                    reason: format!("invalid WebDriver endpoint: {}", e),
                }
            })?;
            let browser = BrowserMechanism::open(webdriver, &primary_agent, settings.request_timeout)
                .await
                .map_err(|e| SiftError::ConnectionSetup {
                    platform,
                    reason: e.to_string(),
                })?;
            fetcher = fetcher.with_renderer(Arc::new(browser));
        }

        Ok(Self::new(
            platform,
            base_url,
            fetcher,
            CategoryJobSettings::from_config(config, platform),
        ))
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.fetcher.retry_policy()
    }

    /// Releases the browser session, if one was opened
    pub async fn release(&self) {
        self.fetcher.release().await;
    }
}

/// Why a category ended in `Aborted`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbortReason {
    #[error("{failures} consecutive listing pages failed")]
    ConsecutivePageFailures { failures: u32 },

    #[error("connection setup failed: {0}")]
    ConnectionSetup(String),

    #[error("cancelled")]
    Cancelled,

    #[error("cannot build listing page URL: {0}")]
    InvalidPageUrl(String),
}

impl AbortReason {
    pub fn key(&self) -> &'static str {
        match self {
            AbortReason::ConsecutivePageFailures { .. } => "consecutive_page_failures",
            AbortReason::ConnectionSetup(_) => "connection_setup",
            AbortReason::Cancelled => "cancelled",
            AbortReason::InvalidPageUrl(_) => "invalid_page_url",
        }
    }

    /// Whether the rest of the platform job should stop too
    pub fn ends_job(&self) -> bool {
        matches!(self, AbortReason::ConnectionSetup(_) | AbortReason::Cancelled)
    }
}

/// Result of one category crawl
#[derive(Debug, Clone)]
pub struct CategoryOutcome {
    pub platform: Platform,
    pub category: &'static str,
    pub records: Vec<MovieRecord>,
    pub stats: CrawlStats,
    pub state: CrawlState,
    pub abort_reason: Option<AbortReason>,
}

impl CategoryOutcome {
    pub fn report(&self) -> CategoryReport {
        CategoryReport {
            category: self.category.to_string(),
            state: self.state,
            records: self.records.len() as u64,
            abort_reason: self.abort_reason.as_ref().map(ToString::to_string),
            stats: self.stats.clone(),
        }
    }
}

/// Crawls one category of a platform
pub struct CrawlOrchestrator<'a> {
    pipeline: &'a PlatformPipeline,
    category: &'static Category,
    max_movies: usize,
    state: CrawlState,
    stats: CrawlStats,
    records: Vec<MovieRecord>,
}

impl<'a> CrawlOrchestrator<'a> {
    /// `max_movies` is the number of records this category may still add
    pub fn new(pipeline: &'a PlatformPipeline, category: &'static Category, max_movies: usize) -> Self {
        Self {
            pipeline,
            category,
            max_movies,
            state: CrawlState::Idle,
            stats: CrawlStats::started(),
            records: Vec::new(),
        }
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    fn advance(&mut self, next: CrawlState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid crawl transition {} -> {}",
            self.state,
            next
        );
        tracing::trace!(category = self.category.name, from = %self.state, to = %next, "State change");
        self.state = next;
    }

    fn cap_reached(&self) -> bool {
        self.records.len() >= self.max_movies
    }

    /// Runs the category to completion.
    ///
    /// `dedup` is shared with the platform's other categories so an id seen in
    /// an earlier category is not accepted again.
    pub async fn run(mut self, dedup: &mut Deduplicator) -> CategoryOutcome {
        let pipeline = self.pipeline;
        let category = self.category;
        let ctx = pipeline.fetcher.context().clone();
        let page_limit = pipeline.settings.max_pages.min(category.max_pages).max(1);
        let max_failures = pipeline.settings.max_consecutive_page_failures.max(1);

        tracing::info!(
            platform = %pipeline.platform,
            category = category.name,
            max_movies = self.max_movies,
            page_limit,
            "Starting category crawl"
        );

        self.advance(CrawlState::Paginating);

        let mut page_index = 0u32;
        let mut consecutive_failures = 0u32;
        let mut next_url = match category.page_url(&pipeline.base_url, 0) {
            Ok(url) => url,
            Err(e) => return self.abort(AbortReason::InvalidPageUrl(e.to_string())),
        };

        loop {
            if ctx.is_cancelled() {
                return self.abort(AbortReason::Cancelled);
            }
            if self.cap_reached() || page_index >= page_limit {
                break;
            }

            self.advance(CrawlState::Fetching);
            self.stats.pages_attempted += 1;
            let target = FetchTarget::new(
                next_url.clone(),
                pipeline.settings.render_mode,
                Some(category.ready_selector),
            );

            let page = match pipeline.fetcher.fetch(&target).await {
                Ok(page) => page,
                Err(FetchFailure::Cancelled { .. }) => return self.abort(AbortReason::Cancelled),
                Err(FetchFailure::Setup { reason, .. }) => {
                    return self.abort(AbortReason::ConnectionSetup(reason))
                }
                Err(failure @ FetchFailure::Exhausted { .. }) => {
                    self.page_failed("page_fetch_failed", &next_url, &failure.to_string());
                    consecutive_failures += 1;
                    if consecutive_failures >= max_failures {
                        return self.abort(AbortReason::ConsecutivePageFailures {
                            failures: consecutive_failures,
                        });
                    }
                    page_index += 1;
                    next_url = match category.page_url(&pipeline.base_url, page_index) {
                        Ok(url) => url,
                        Err(e) => return self.abort(AbortReason::InvalidPageUrl(e.to_string())),
                    };
                    continue;
                }
            };
            self.stats.pages_fetched += 1;

            self.advance(CrawlState::Parsing);
            let parsed = match pipeline.parser.parse(&page, category) {
                Ok(parsed) => parsed,
                Err(e) => {
                    self.page_failed("page_blocked", &next_url, &e.to_string());
                    consecutive_failures += 1;
                    if consecutive_failures >= max_failures {
                        return self.abort(AbortReason::ConsecutivePageFailures {
                            failures: consecutive_failures,
                        });
                    }
                    page_index += 1;
                    next_url = match category.page_url(&pipeline.base_url, page_index) {
                        Ok(url) => url,
                        Err(e) => return self.abort(AbortReason::InvalidPageUrl(e.to_string())),
                    };
                    continue;
                }
            };
            consecutive_failures = 0;

            tracing::debug!(
                category = category.name,
                page = page_index + 1,
                items = parsed.items.len(),
                has_more = parsed.pagination.has_more,
                "Parsed listing page"
            );

            for item in parsed.items {
                if self.cap_reached() {
                    break;
                }
                self.stats.items_attempted += 1;

                let candidate = match item {
                    Ok(candidate) => candidate,
                    Err(e) => {
                        self.stats.record_failure(e.key());
                        tracing::debug!(
                            event = events::PARSE_SKIPPED,
                            category = category.name,
                            error = %e,
                            "Skipping listing item"
                        );
                        continue;
                    }
                };

                if let Err(reason) = self.process_item(candidate, dedup).await {
                    return self.abort(reason);
                }
            }

            self.advance(CrawlState::Paginating);
            if !parsed.pagination.has_more {
                break;
            }

            page_index += 1;
            let linked = parsed
                .pagination
                .next_page_token
                .as_deref()
                .and_then(|token| resolve_link(token, &page.url));
            next_url = match linked {
                Some(url) => url,
                None => match category.page_url(&pipeline.base_url, page_index) {
                    Ok(url) => url,
                    Err(e) => return self.abort(AbortReason::InvalidPageUrl(e.to_string())),
                },
            };
        }

        self.advance(CrawlState::Done);
        self.finish(None)
    }

    /// Runs one listing item through enrichment, normalization, validation
    /// and deduplication
    async fn process_item(
        &mut self,
        mut candidate: CandidateRecord,
        dedup: &mut Deduplicator,
    ) -> Result<(), AbortReason> {
        let pipeline = self.pipeline;
        let platform = pipeline.platform;

        // Known ids are dropped before spending a detail fetch on them
        if let Some(id) = candidate.source_id.as_deref() {
            if dedup.seen(platform, id) {
                self.duplicate(id);
                return Ok(());
            }
        }

        if pipeline.settings.fetch_details {
            self.enrich(&mut candidate).await?;
        }

        self.advance(CrawlState::Normalizing);
        let draft = pipeline.normalizer.normalize(&candidate);

        self.advance(CrawlState::Validating);
        let record = match pipeline.validator.validate(draft) {
            Ok(record) => record,
            Err(rejection) => {
                self.stats.rejected += 1;
                for reason in &rejection.reasons {
                    self.stats.record_failure(reason.key());
                }
                tracing::warn!(
                    event = events::VALIDATION_REJECTED,
                    platform = %platform,
                    category = self.category.name,
                    reasons = ?rejection.keys(),
                    "{}",
                    rejection
                );
                return Ok(());
            }
        };

        self.advance(CrawlState::Deduping);
        if !dedup.admit(platform, &record.source_id) {
            self.duplicate(&record.source_id);
            return Ok(());
        }

        self.stats.record_success(self.category.name);
        self.records.push(record);
        Ok(())
    }

    /// Overlays the item's detail page; failures keep the listing data
    async fn enrich(&mut self, candidate: &mut CandidateRecord) -> Result<(), AbortReason> {
        let pipeline = self.pipeline;
        let platform = pipeline.platform;

        let detail_url = candidate
            .url
            .as_deref()
            .and_then(|url| Url::parse(url).ok())
            .or_else(|| {
                candidate
                    .source_id
                    .as_deref()
                    .and_then(|id| platform.detail_url(&pipeline.base_url, id).ok())
            });
        let Some(detail_url) = detail_url else {
            return Ok(());
        };

        self.advance(CrawlState::Fetching);
        let target = FetchTarget::new(
            detail_url,
            pipeline.settings.render_mode,
            Some(platform.detail_ready_selector()),
        );
        let page = match pipeline.fetcher.fetch(&target).await {
            Ok(page) => page,
            Err(FetchFailure::Cancelled { .. }) => return Err(AbortReason::Cancelled),
            Err(FetchFailure::Setup { reason, .. }) => return Err(AbortReason::ConnectionSetup(reason)),
            Err(failure) => {
                // Nothing to parse; the listing data goes on as is
                self.advance(CrawlState::Parsing);
                self.detail_failed(&failure.to_string());
                return Ok(());
            }
        };

        self.advance(CrawlState::Parsing);
        match pipeline.parser.parse_detail(&page) {
            Ok(detail) => candidate.merge_detail(detail),
            Err(e) => self.detail_failed(&e.to_string()),
        }
        Ok(())
    }

    fn duplicate(&mut self, source_id: &str) {
        self.stats.duplicates_dropped += 1;
        tracing::debug!(
            event = events::DUPLICATE_DROPPED,
            platform = %self.pipeline.platform,
            category = self.category.name,
            source_id,
            "Dropping duplicate record"
        );
    }

    fn detail_failed(&mut self, error: &str) {
        self.stats.detail_fetch_failures += 1;
        self.stats.record_failure("detail_fetch_failed");
        tracing::warn!(
            platform = %self.pipeline.platform,
            category = self.category.name,
            error,
            "Detail page unavailable, keeping listing data"
        );
    }

    fn page_failed(&mut self, reason: &str, url: &Url, error: &str) {
        self.stats.pages_failed += 1;
        self.stats.record_failure(reason);
        tracing::warn!(
            event = events::PAGE_FAILED,
            platform = %self.pipeline.platform,
            category = self.category.name,
            url = %url,
            error,
            "Listing page failed"
        );
        self.advance(CrawlState::Paginating);
    }

    fn abort(mut self, reason: AbortReason) -> CategoryOutcome {
        self.advance(CrawlState::Aborted);
        tracing::warn!(
            event = events::CATEGORY_ABORTED,
            platform = %self.pipeline.platform,
            category = self.category.name,
            reason = reason.key(),
            kept = self.records.len(),
            "Category aborted: {}",
            reason
        );
        self.finish(Some(reason))
    }

    fn finish(mut self, abort_reason: Option<AbortReason>) -> CategoryOutcome {
        self.stats.finalize();
        tracing::info!(
            platform = %self.pipeline.platform,
            category = self.category.name,
            state = %self.state,
            records = self.records.len(),
            duplicates = self.stats.duplicates_dropped,
            rejected = self.stats.rejected,
            "Category crawl finished"
        );
        CategoryOutcome {
            platform: self.pipeline.platform,
            category: self.category.name,
            records: self.records,
            stats: self.stats,
            state: self.state,
            abort_reason,
        }
    }
}
