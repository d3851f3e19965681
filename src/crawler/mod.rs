//! Crawler module for listing and detail page acquisition
//!
//! This module contains the core crawling logic, including:
//! - Fetching with bounded retries, user agent rotation and randomized delays
//! - Optional script rendering through a WebDriver session
//! - Per-platform page parsing
//! - The per-category crawl state machine and multi-platform coordination

mod coordinator;
mod fetcher;
mod limiter;
mod orchestrator;
mod parser;
mod render;

pub use coordinator::{plan_jobs, ConnectionReport, MultiPlatformCoordinator, PlatformJob, RunOutput};
pub use fetcher::{
    AttemptError, Backoff, FetchClient, FetchFailure, FetchMechanism, FetchTarget, HttpMechanism,
    PageContent, RetryPolicy, UserAgentPool, DEFAULT_USER_AGENT,
};
pub use limiter::RateLimiter;
pub use orchestrator::{
    AbortReason, CategoryJobSettings, CategoryOutcome, CrawlOrchestrator, PlatformPipeline,
};
pub use parser::{
    DoubanParser, ImdbParser, ItemParseError, PageParseError, PageParser, PaginationInfo,
    ParsedPage, SourceParser,
};
pub use render::{BrowserMechanism, WebDriverSettings};
