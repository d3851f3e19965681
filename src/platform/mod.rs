//! Platforms and their category catalogs
//!
//! A `Platform` is one external movie source. Each platform exposes a closed
//! catalog of `Category` listings; unknown category names are rejected when a
//! job is constructed.

mod catalog;

pub use catalog::{catalog, lookup, Category, ListLayout};

use crate::CatalogError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use url::Url;

static DOUBAN_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/subject/(\d+)").expect("valid douban id regex"));
static IMDB_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/title/(tt\d+)").expect("valid imdb id regex"));
static DOUBAN_DETAIL_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/subject/\d+/?$").expect("valid douban path regex"));
static IMDB_DETAIL_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/title/tt\d+/?$").expect("valid imdb path regex"));

/// An external movie source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Douban,
    Imdb,
}

/// How a page must be retrieved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// A single HTTP GET
    Plain,
    /// Loaded in a script-executing browser engine before reading the DOM
    Script,
}

impl Platform {
    /// Every supported platform, in a stable order
    pub const ALL: [Platform; 2] = [Platform::Douban, Platform::Imdb];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Douban => "douban",
            Platform::Imdb => "imdb",
        }
    }

    /// Human-readable name for logs and summaries
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Douban => "Douban",
            Platform::Imdb => "IMDb",
        }
    }

    /// Native rating scale; both sources rate out of ten
    pub fn rating_scale(&self) -> RangeInclusive<f64> {
        0.0..=10.0
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Platform::Douban => "https://movie.douban.com/",
            Platform::Imdb => "https://www.imdb.com/",
        }
    }

    /// Default inter-request delay window in milliseconds
    pub fn default_delay_ms(&self) -> (u64, u64) {
        match self {
            Platform::Douban => (2000, 5000),
            Platform::Imdb => (500, 1500),
        }
    }

    /// IMDb serves its lists through client-side rendering
    pub fn default_render_mode(&self) -> RenderMode {
        match self {
            Platform::Douban => RenderMode::Plain,
            Platform::Imdb => RenderMode::Script,
        }
    }

    pub fn accept_language(&self) -> &'static str {
        match self {
            Platform::Douban => "zh-CN,zh;q=0.9,en;q=0.8",
            Platform::Imdb => "en-US,en;q=0.9",
        }
    }

    /// Categories crawled when the caller names none
    pub fn default_categories(&self) -> &'static [&'static str] {
        match self {
            Platform::Douban => &["hot"],
            Platform::Imdb => &["popular"],
        }
    }

    /// Maximum number of actors kept from a single page
    pub fn actor_limit(&self) -> usize {
        match self {
            Platform::Douban => 8,
            Platform::Imdb => 10,
        }
    }

    /// CSS selector that signals a rendered detail page is usable
    pub fn detail_ready_selector(&self) -> &'static str {
        match self {
            Platform::Douban => "#content h1",
            Platform::Imdb => "h1",
        }
    }

    /// Extracts the platform's movie identifier from a URL or href
    pub fn extract_source_id(&self, url: &str) -> Option<String> {
        let pattern = match self {
            Platform::Douban => &DOUBAN_ID,
            Platform::Imdb => &IMDB_ID,
        };
        pattern
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Path shape of a movie detail page
    pub fn detail_path_pattern(&self) -> &'static Regex {
        match self {
            Platform::Douban => &DOUBAN_DETAIL_PATH,
            Platform::Imdb => &IMDB_DETAIL_PATH,
        }
    }

    /// Builds the canonical detail page URL for a source id
    pub fn detail_url(&self, base: &Url, source_id: &str) -> Result<Url, url::ParseError> {
        match self {
            Platform::Douban => base.join(&format!("/subject/{}/", source_id)),
            Platform::Imdb => base.join(&format!("/title/{}/", source_id)),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "douban" => Ok(Platform::Douban),
            "imdb" => Ok(Platform::Imdb),
            _ => Err(CatalogError::UnknownPlatform(s.to_string())),
        }
    }
}

/// Resolves a platform selector (`all` or a single platform name)
pub fn select_platforms(selector: &str) -> Result<Vec<Platform>, CatalogError> {
    if selector.trim().eq_ignore_ascii_case("all") {
        return Ok(Platform::ALL.to_vec());
    }
    Ok(vec![selector.parse()?])
}
