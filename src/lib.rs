//! Cinesift: a polite movie metadata harvester
//!
//! This crate crawls movie listings on Douban and IMDb, fetching pages under a
//! randomized rate limit with bounded retries, and turns the heterogeneous HTML
//! of both sources into one validated, deduplicated `MovieRecord` schema.

pub mod config;
pub mod context;
pub mod crawler;
pub mod output;
pub mod pipeline;
pub mod platform;
pub mod record;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Cinesift operations
#[derive(Debug, Error)]
pub enum SiftError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] crawler::FetchFailure),

    #[error("Connection setup failed for {platform}: {reason}")]
    ConnectionSetup {
        platform: platform::Platform,
        reason: String,
    },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while resolving platforms and categories from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Unknown platform '{0}' (expected 'all', 'douban' or 'imdb')")]
    UnknownPlatform(String),

    #[error("Unknown category '{name}' for {platform}")]
    UnknownCategory {
        platform: platform::Platform,
        name: String,
    },

    #[error("Category '{0}' is not offered by any selected platform")]
    NotInAnyCatalog(String),
}

/// Result type alias for Cinesift operations
pub type Result<T> = std::result::Result<T, SiftError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use context::RunContext;
pub use crawler::{CrawlOrchestrator, MultiPlatformCoordinator, PlatformJob, RunOutput};
pub use pipeline::{merge_records, Deduplicator, FieldNormalizer, RecordValidator};
pub use platform::{Category, Platform, RenderMode};
pub use record::{CandidateRecord, MovieDraft, MovieRecord};
pub use state::CrawlState;
