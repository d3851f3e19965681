//! Source-specific HTML parsers
//!
//! Each platform has its own parser turning listing and detail pages into
//! `CandidateRecord`s. Parsers never touch the network; they only read a
//! `PageContent` that the fetcher produced. Every listing item yields its own
//! `Result`, so one malformed entry never costs the rest of the page.

mod douban;
mod imdb;

pub use douban::DoubanParser;
pub use imdb::ImdbParser;

use crate::crawler::fetcher::PageContent;
use crate::platform::{Category, Platform};
use crate::record::CandidateRecord;
use scraper::{ElementRef, Html, Node, Selector};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

/// Where a listing continues, if anywhere
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationInfo {
    pub has_more: bool,
    /// Href of the next page when the page links to it explicitly
    pub next_page_token: Option<String>,
}

impl PaginationInfo {
    pub fn end() -> Self {
        Self::default()
    }

    pub fn more(next_page_token: Option<String>) -> Self {
        Self {
            has_more: true,
            next_page_token,
        }
    }
}

/// Items of one listing page, in page order
#[derive(Debug, Clone)]
pub struct ParsedPage {
    pub items: Vec<Result<CandidateRecord, ItemParseError>>,
    pub pagination: PaginationInfo,
}

impl ParsedPage {
    pub fn ok_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_ok()).count()
    }
}

/// The page as a whole is unusable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageParseError {
    #[error("blocked by verification page '{title}'")]
    Blocked { title: String },
}

/// A single item or detail page could not be read
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemParseError {
    #[error("item {index} has no movie link")]
    MissingLink { index: usize },

    #[error("detail page {url} carries no movie data")]
    EmptyDetail { url: String },
}

impl ItemParseError {
    pub fn key(&self) -> &'static str {
        match self {
            ItemParseError::MissingLink { .. } => "missing_link",
            ItemParseError::EmptyDetail { .. } => "empty_detail",
        }
    }
}

/// Turns fetched pages of one platform into candidate records
pub trait PageParser: Send + Sync {
    fn platform(&self) -> Platform;

    /// Parses a listing page of `category`
    fn parse(&self, page: &PageContent, category: &Category) -> Result<ParsedPage, PageParseError>;

    /// Parses a movie detail page
    fn parse_detail(&self, page: &PageContent) -> Result<CandidateRecord, ItemParseError>;
}

/// Parser selected by platform
#[derive(Debug, Clone)]
pub enum SourceParser {
    Douban(DoubanParser),
    Imdb(ImdbParser),
}

impl SourceParser {
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Douban => SourceParser::Douban(DoubanParser::new()),
            Platform::Imdb => SourceParser::Imdb(ImdbParser::new()),
        }
    }
}

impl PageParser for SourceParser {
    fn platform(&self) -> Platform {
        match self {
            SourceParser::Douban(parser) => parser.platform(),
            SourceParser::Imdb(parser) => parser.platform(),
        }
    }

    fn parse(&self, page: &PageContent, category: &Category) -> Result<ParsedPage, PageParseError> {
        match self {
            SourceParser::Douban(parser) => parser.parse(page, category),
            SourceParser::Imdb(parser) => parser.parse(page, category),
        }
    }

    fn parse_detail(&self, page: &PageContent) -> Result<CandidateRecord, ItemParseError> {
        match self {
            SourceParser::Douban(parser) => parser.parse_detail(page),
            SourceParser::Imdb(parser) => parser.parse_detail(page),
        }
    }
}

// Helpers shared by the platform parsers

pub(crate) fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => scope.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

pub(crate) fn first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    let found = scope.select(&selector).next();
    found
}

/// Text content with whitespace runs collapsed
pub(crate) fn element_text(element: ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text content split at `<br>` elements and newlines, each line trimmed
pub(crate) fn element_lines(element: ElementRef) -> Vec<String> {
    let mut text = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(chunk) => text.push_str(chunk),
            Node::Element(child) if child.name() == "br" => text.push('\n'),
            _ => {}
        }
    }
    text.lines()
        .map(|line| line.replace('\u{a0}', " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

pub(crate) fn first_text(scope: ElementRef, css: &str) -> Option<String> {
    first(scope, css)
        .map(element_text)
        .filter(|text| !text.is_empty())
}

pub(crate) fn first_attr(scope: ElementRef, css: &str, attr: &str) -> Option<String> {
    first(scope, css)
        .and_then(|element| element.value().attr(attr))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Non-empty texts of every match, in document order
pub(crate) fn all_texts(scope: ElementRef, css: &str) -> Vec<String> {
    select_all(scope, css)
        .into_iter()
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect()
}

pub(crate) fn page_title(document: &Html) -> Option<String> {
    first_text(document.root_element(), "title")
}

/// Returns a `Blocked` error when the page title carries one of `markers`
pub(crate) fn check_blocked(document: &Html, markers: &[&str]) -> Result<(), PageParseError> {
    match page_title(document) {
        Some(title) if markers.iter().any(|marker| title.contains(marker)) => {
            Err(PageParseError::Blocked { title })
        }
        _ => Ok(()),
    }
}

/// Canonical detail URL of a movie, on the host the page was served from
pub(crate) fn canonical_url(platform: Platform, page_url: &Url, source_id: &str) -> Option<String> {
    platform
        .detail_url(page_url, source_id)
        .ok()
        .map(String::from)
}

/// `<link rel="next">` href, if the page declares one
pub(crate) fn rel_next(document: &Html) -> Option<String> {
    first_attr(document.root_element(), "link[rel=\"next\"]", "href")
}

/// Every JSON-LD object on the page, with arrays and `@graph` flattened
pub(crate) fn json_ld_objects(document: &Html) -> Vec<Value> {
    let mut objects = Vec::new();
    for script in select_all(document.root_element(), "script[type=\"application/ld+json\"]") {
        let raw: String = script.text().collect();
        if let Ok(value) = serde_json::from_str::<Value>(raw.trim()) {
            flatten_json_ld(value, &mut objects);
        }
    }
    objects
}

fn flatten_json_ld(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                flatten_json_ld(item, out);
            }
        }
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                flatten_json_ld(graph, out);
            }
            if !map.is_empty() {
                out.push(Value::Object(map));
            }
        }
        _ => {}
    }
}

/// Whether a JSON-LD object's `@type` is (or includes) `wanted`
pub(crate) fn json_ld_is(value: &Value, wanted: &str) -> bool {
    match value.get("@type") {
        Some(Value::String(ty)) => ty == wanted,
        Some(Value::Array(types)) => types.iter().any(|ty| ty.as_str() == Some(wanted)),
        _ => false,
    }
}

/// String form of a JSON-LD scalar
pub(crate) fn json_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Names from a JSON-LD field holding a string, a person object, or a list
/// of either
pub(crate) fn json_names(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .flat_map(|item| json_names(Some(item)))
            .collect(),
        Some(Value::Object(map)) => map.get("name").and_then(json_scalar).into_iter().collect(),
        Some(other) => json_scalar(other).into_iter().collect(),
        None => Vec::new(),
    }
}

/// Last-resort listing extraction: every anchor that points at a movie detail
/// page, first occurrence per id
pub(crate) fn anchor_fallback(document: &Html, platform: Platform, base: &Url) -> Vec<CandidateRecord> {
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for anchor in select_all(document.root_element(), "a[href]") {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(id) = platform.extract_source_id(href) else {
            continue;
        };
        let text = element_text(anchor);
        if text.is_empty() || !seen.insert(id.clone()) {
            continue;
        }

        let mut record = CandidateRecord::new(platform);
        record.url = canonical_url(platform, base, &id);
        record.source_id = Some(id);
        record.title = Some(text);
        records.push(record);
    }

    records
}

/// Splits `"Title / Other Title"` into the primary and alternate title
pub(crate) fn split_title(text: &str) -> (Option<String>, Option<String>) {
    let mut parts = text.splitn(2, '/');
    let primary = parts
        .next()
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty());
    let alternate = parts
        .next()
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty());
    (primary, alternate)
}
