use crate::crawler::{Backoff, RetryPolicy};
use crate::platform::{Platform, RenderMode};
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Cinesift
///
/// Every section and key is optional; missing values fall back to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub webdriver: WebDriverConfig,
    pub platforms: PlatformsConfig,
}

/// How platform jobs are scheduled relative to each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Sequential,
    Concurrent,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of records kept per platform
    #[serde(rename = "max-movies")]
    pub max_movies: usize,

    /// Upper bound on listing pages per category
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Consecutive listing page failures tolerated before a category aborts
    #[serde(rename = "max-consecutive-page-failures")]
    pub max_consecutive_page_failures: u32,

    pub execution: ExecutionMode,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_movies: 100,
            max_pages: 10,
            max_consecutive_page_failures: 3,
            execution: ExecutionMode::Concurrent,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the JSON record and summary files are written to
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "data".to_string(),
        }
    }
}

/// User agent rotation pool
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    pub pool: Vec<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            pool: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15".to_string(),
            ],
        }
    }
}

/// WebDriver endpoint used for script-rendered fetches
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebDriverConfig {
    pub endpoint: String,

    /// How long to wait for the ready selector after navigation
    #[serde(rename = "ready-timeout-ms")]
    pub ready_timeout_ms: u64,

    /// Delay between page source polls while waiting
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,

    pub headless: bool,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9515".to_string(),
            ready_timeout_ms: 15_000,
            poll_interval_ms: 250,
            headless: true,
        }
    }
}

/// Per-platform sections
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlatformsConfig {
    pub douban: PlatformConfig,
    pub imdb: PlatformConfig,
}

/// Backoff strategy between fetch attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    Fixed,
    Exponential,
}

/// Raw settings for one platform. Keys whose default depends on the platform
/// are optional here and resolved by `Config::platform`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub enabled: bool,

    #[serde(rename = "base-url")]
    pub base_url: Option<String>,

    #[serde(rename = "min-delay-ms")]
    pub min_delay_ms: Option<u64>,

    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: Option<u64>,

    /// Total attempts per fetch, the first one included
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    pub backoff: BackoffKind,

    #[serde(rename = "backoff-base-ms")]
    pub backoff_base_ms: u64,

    #[serde(rename = "backoff-max-ms")]
    pub backoff_max_ms: u64,

    #[serde(rename = "request-timeout-ms")]
    pub request_timeout_ms: u64,

    pub rendering: Option<RenderMode>,

    /// Fetch each item's detail page to fill in fields the listing lacks
    #[serde(rename = "fetch-details")]
    pub fetch_details: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
            min_delay_ms: None,
            max_delay_ms: None,
            max_retries: 3,
            backoff: BackoffKind::Exponential,
            backoff_base_ms: 1000,
            backoff_max_ms: 30_000,
            request_timeout_ms: 30_000,
            rendering: None,
            fetch_details: false,
        }
    }
}

/// Fully resolved settings for one platform
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformSettings {
    pub platform: Platform,
    pub enabled: bool,
    pub base_url: String,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    pub rendering: RenderMode,
    pub fetch_details: bool,
}

impl Config {
    /// Raw section for a platform
    pub fn platform_config(&self, platform: Platform) -> &PlatformConfig {
        match platform {
            Platform::Douban => &self.platforms.douban,
            Platform::Imdb => &self.platforms.imdb,
        }
    }

    pub fn platform_config_mut(&mut self, platform: Platform) -> &mut PlatformConfig {
        match platform {
            Platform::Douban => &mut self.platforms.douban,
            Platform::Imdb => &mut self.platforms.imdb,
        }
    }

    /// Resolves a platform's settings, filling platform-specific defaults
    pub fn platform(&self, platform: Platform) -> PlatformSettings {
        let raw = self.platform_config(platform);
        let (default_min, default_max) = platform.default_delay_ms();
        let backoff = match raw.backoff {
            BackoffKind::Fixed => Backoff::Fixed(Duration::from_millis(raw.backoff_base_ms)),
            BackoffKind::Exponential => Backoff::Exponential {
                base: Duration::from_millis(raw.backoff_base_ms),
                max: Duration::from_millis(raw.backoff_max_ms),
            },
        };

        PlatformSettings {
            platform,
            enabled: raw.enabled,
            base_url: raw
                .base_url
                .clone()
                .unwrap_or_else(|| platform.default_base_url().to_string()),
            min_delay: Duration::from_millis(raw.min_delay_ms.unwrap_or(default_min)),
            max_delay: Duration::from_millis(raw.max_delay_ms.unwrap_or(default_max)),
            retry: RetryPolicy {
                max_attempts: raw.max_retries,
                backoff,
            },
            request_timeout: Duration::from_millis(raw.request_timeout_ms),
            rendering: raw.rendering.unwrap_or_else(|| platform.default_render_mode()),
            fetch_details: raw.fetch_details,
        }
    }
}
