//! Configuration module for Cinesift
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. Every key is optional; platform-dependent defaults are filled in by
//! `Config::platform`.
//!
//! # Example
//!
//! ```no_run
//! use cinesift::config::load_config;
//! use cinesift::Platform;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("cinesift.toml")).unwrap();
//! let douban = config.platform(Platform::Douban);
//! println!("Douban delay window: {:?}..{:?}", douban.min_delay, douban.max_delay);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BackoffKind, Config, CrawlerConfig, ExecutionMode, OutputConfig, PlatformConfig,
    PlatformSettings, PlatformsConfig, UserAgentConfig, WebDriverConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
