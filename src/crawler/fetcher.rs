//! Page fetching with bounded retries
//!
//! This module handles every outbound request a crawl makes:
//! - `FetchMechanism` is one way of retrieving a page (plain HTTP here,
//!   a WebDriver session in `render`), tried exactly once per call
//! - `FetchClient` wraps mechanisms with the rate limiter, user agent
//!   rotation and an explicit bounded retry loop
//! - Attempt errors are classified as transient (retried) or setup failures
//!   (returned immediately)

use crate::context::RunContext;
use crate::crawler::limiter::RateLimiter;
use crate::output::events;
use crate::platform::RenderMode;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Used when the configured pool is empty
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// A page to fetch and how to fetch it
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTarget {
    pub url: Url,
    pub mode: RenderMode,
    /// For script rendering: CSS selector that must match before the page
    /// counts as loaded
    pub ready_selector: Option<String>,
}

impl FetchTarget {
    pub fn new(url: Url, mode: RenderMode, ready_selector: Option<&str>) -> Self {
        Self {
            url,
            mode,
            ready_selector: ready_selector.map(str::to_string),
        }
    }

    pub fn plain(url: Url) -> Self {
        Self::new(url, RenderMode::Plain, None)
    }
}

/// Successfully fetched page
#[derive(Debug, Clone)]
pub struct PageContent {
    pub url: Url,
    pub body: String,
    pub fetched_at: DateTime<Utc>,
    /// Attempts it took, the successful one included
    pub attempts: u32,
}

impl PageContent {
    /// Wraps a body that did not come from the network (tests, replays)
    pub fn new(url: Url, body: impl Into<String>) -> Self {
        Self {
            url,
            body: body.into(),
            fetched_at: Utc::now(),
            attempts: 1,
        }
    }
}

/// Outcome of a single failed attempt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("empty response body")]
    EmptyBody,

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("content not ready after {timeout_ms}ms (waiting for '{selector}')")]
    RenderTimeout { selector: String, timeout_ms: u64 },

    #[error("fetch mechanism unavailable: {0}")]
    Setup(String),
}

impl AttemptError {
    /// Transient errors are retried; setup errors end the fetch at once
    pub fn is_transient(&self) -> bool {
        !matches!(self, AttemptError::Setup(_))
    }

    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            AttemptError::Timeout => "timeout",
            AttemptError::Status(_) => "status",
            AttemptError::EmptyBody => "empty_body",
            AttemptError::Malformed(_) => "malformed",
            AttemptError::Network(_) => "network",
            AttemptError::RenderTimeout { .. } => "render_timeout",
            AttemptError::Setup(_) => "setup",
        }
    }
}

/// Terminal result of a fetch that did not produce a page
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchFailure {
    #[error("gave up on {url} after {attempts} attempts: {last_error}")]
    Exhausted {
        url: String,
        attempts: u32,
        last_error: AttemptError,
    },

    #[error("cannot fetch {url}: {reason}")]
    Setup { url: String, reason: String },

    #[error("fetch of {url} cancelled after {attempts} attempts")]
    Cancelled { url: String, attempts: u32 },
}

impl FetchFailure {
    pub fn attempts(&self) -> u32 {
        match self {
            FetchFailure::Exhausted { attempts, .. } | FetchFailure::Cancelled { attempts, .. } => {
                *attempts
            }
            FetchFailure::Setup { .. } => 0,
        }
    }
}

/// One way of retrieving a page. Implementations make a single attempt.
#[async_trait]
pub trait FetchMechanism: Send + Sync {
    async fn attempt(&self, target: &FetchTarget, user_agent: &str) -> Result<String, AttemptError>;

    /// Releases any resource held by the mechanism
    async fn release(&self) {}
}

/// Plain HTTP GET through reqwest
#[derive(Debug, Clone)]
pub struct HttpMechanism {
    client: Client,
}

impl HttpMechanism {
    /// Builds the HTTP client used for plain fetches
    pub fn new(timeout: Duration, accept_language: &'static str) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(accept_language));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .gzip(true)
            .brotli(true)
            .build()?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn classify_reqwest_error(error: reqwest::Error) -> AttemptError {
    if error.is_timeout() {
        AttemptError::Timeout
    } else if error.is_decode() || error.is_body() {
        AttemptError::Malformed(error.to_string())
    } else if error.is_connect() {
        AttemptError::Network(format!("connection failed: {}", error))
    } else {
        AttemptError::Network(error.to_string())
    }
}

#[async_trait]
impl FetchMechanism for HttpMechanism {
    async fn attempt(&self, target: &FetchTarget, user_agent: &str) -> Result<String, AttemptError> {
        let response = self
            .client
            .get(target.url.clone())
            .header(USER_AGENT, user_agent)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(classify_reqwest_error)?;
        if body.trim().is_empty() {
            return Err(AttemptError::EmptyBody);
        }
        Ok(body)
    }
}

/// Delay between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    /// `base * 2^(n-1)` after the n-th failed attempt, capped at `max`
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Delay after `failed_attempts` attempts have failed (1-based)
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, max } => {
                let exponent = failed_attempts.saturating_sub(1).min(16);
                base.saturating_mul(1u32 << exponent).min(max)
            }
        }
    }
}

/// How many attempts a fetch gets and how long to wait between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Retries immediately; used by tests and connectivity checks
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed(Duration::ZERO),
        }
    }
}

/// Round-robin user agent rotation
#[derive(Debug)]
pub struct UserAgentPool {
    agents: Vec<String>,
    next: AtomicUsize,
}

impl UserAgentPool {
    pub fn new(agents: Vec<String>) -> Self {
        Self {
            agents,
            next: AtomicUsize::new(0),
        }
    }

    /// Returns the next user agent in the rotation
    pub fn next_agent(&self) -> &str {
        if self.agents.is_empty() {
            return DEFAULT_USER_AGENT;
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.agents.len();
        &self.agents[index]
    }

    /// First agent of the pool, used for long-lived browser sessions
    pub fn primary(&self) -> &str {
        self.agents.first().map_or(DEFAULT_USER_AGENT, String::as_str)
    }
}

/// Fetches pages through a mechanism selected by render mode, with rate
/// limiting and bounded retries
pub struct FetchClient {
    plain: Arc<dyn FetchMechanism>,
    rendered: Option<Arc<dyn FetchMechanism>>,
    limiter: RateLimiter,
    retry: RetryPolicy,
    agents: UserAgentPool,
    ctx: RunContext,
}

impl FetchClient {
    pub fn new(
        plain: Arc<dyn FetchMechanism>,
        limiter: RateLimiter,
        retry: RetryPolicy,
        agents: UserAgentPool,
        ctx: RunContext,
    ) -> Self {
        Self {
            plain,
            rendered: None,
            limiter,
            retry,
            agents,
            ctx,
        }
    }

    /// Adds the mechanism used for `RenderMode::Script` targets
    pub fn with_renderer(mut self, rendered: Arc<dyn FetchMechanism>) -> Self {
        self.rendered = Some(rendered);
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Fetches a target, retrying transient failures.
    ///
    /// Every attempt is preceded by a rate-limit wait and counted in the run's
    /// request counter. Cancellation is checked before each attempt and
    /// interrupts any wait.
    pub async fn fetch(&self, target: &FetchTarget) -> Result<PageContent, FetchFailure> {
        let url = target.url.to_string();
        let mechanism = match target.mode {
            RenderMode::Plain => &self.plain,
            RenderMode::Script => match &self.rendered {
                Some(rendered) => rendered,
                None => {
                    return Err(FetchFailure::Setup {
                        url,
                        reason: "no rendering engine available".to_string(),
                    })
                }
            },
        };

        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempts = 0;
        let mut last_error = None;

        while attempts < max_attempts {
            if self.ctx.is_cancelled() {
                return Err(FetchFailure::Cancelled { url, attempts });
            }

            tokio::select! {
                _ = self.limiter.wait() => {}
                _ = self.ctx.cancelled() => {
                    return Err(FetchFailure::Cancelled { url, attempts });
                }
            }

            attempts += 1;
            self.ctx.record_request();
            let user_agent = self.agents.next_agent();
            tracing::debug!(
                event = events::FETCH_ATTEMPT,
                url = %url,
                attempt = attempts,
                max_attempts,
                "Fetching page"
            );

            let result = tokio::select! {
                result = mechanism.attempt(target, user_agent) => result,
                _ = self.ctx.cancelled() => {
                    return Err(FetchFailure::Cancelled { url, attempts });
                }
            };

            match result {
                Ok(body) => {
                    return Ok(PageContent {
                        url: target.url.clone(),
                        body,
                        fetched_at: Utc::now(),
                        attempts,
                    })
                }
                Err(error) if !error.is_transient() => {
                    tracing::error!(
                        event = events::FETCH_FAILED,
                        url = %url,
                        error = %error,
                        "Fetch mechanism unavailable"
                    );
                    return Err(FetchFailure::Setup {
                        url,
                        reason: error.to_string(),
                    });
                }
                Err(error) => {
                    tracing::warn!(
                        event = events::FETCH_RETRY,
                        url = %url,
                        attempt = attempts,
                        kind = error.kind(),
                        error = %error,
                        "Fetch attempt failed"
                    );
                    last_error = Some(error);
                }
            }

            if attempts < max_attempts {
                let delay = self.retry.backoff.delay_for(attempts);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = self.ctx.cancelled() => {
                        return Err(FetchFailure::Cancelled { url, attempts });
                    }
                }
            }
        }

        let last_error = last_error.unwrap_or(AttemptError::Network("no attempt made".to_string()));
        tracing::warn!(
            event = events::FETCH_FAILED,
            url = %url,
            attempts,
            error = %last_error,
            "Giving up on page"
        );
        Err(FetchFailure::Exhausted {
            url,
            attempts,
            last_error,
        })
    }

    /// Releases the rendering engine, if any
    pub async fn release(&self) {
        if let Some(rendered) = &self.rendered {
            rendered.release().await;
        }
        self.plain.release().await;
    }
}
