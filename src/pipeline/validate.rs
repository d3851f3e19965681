//! Record validation
//!
//! `RecordValidator` is the only way to obtain a `MovieRecord`. It evaluates
//! every rule and reports all failing ones, so a rejected draft carries the
//! complete list of reasons.

use crate::platform::Platform;
use crate::record::{MovieDraft, MovieRecord};
use crate::url::UrlShape;
use chrono::{Datelike, Utc};
use std::fmt;
use std::ops::RangeInclusive;
use thiserror::Error;
use url::Url;

/// Earliest year accepted for a film
pub const EARLIEST_YEAR: i32 = 1880;

/// Why a draft was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    MissingRequiredField(&'static str),
    RatingOutOfRange(f64),
    YearOutOfRange(i32),
    UrlShapeMismatch(String),
}

impl RejectReason {
    /// Stable key used in statistics and logs
    pub fn key(&self) -> &'static str {
        match self {
            RejectReason::MissingRequiredField(_) => "missing_required_field",
            RejectReason::RatingOutOfRange(_) => "rating_out_of_range",
            RejectReason::YearOutOfRange(_) => "year_out_of_range",
            RejectReason::UrlShapeMismatch(_) => "url_shape_mismatch",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MissingRequiredField(field) => write!(f, "missing required field '{}'", field),
            RejectReason::RatingOutOfRange(rating) => write!(f, "rating {} outside the platform scale", rating),
            RejectReason::YearOutOfRange(year) => write!(f, "implausible year {}", year),
            RejectReason::UrlShapeMismatch(url) => write!(f, "url '{}' is not a movie page", url),
        }
    }
}

/// A draft that failed one or more validation rules
#[derive(Debug, Clone, PartialEq, Error)]
#[error("record {} rejected: {}", display_id(.source_id), join_reasons(.reasons))]
pub struct Rejection {
    pub source_id: Option<String>,
    pub reasons: Vec<RejectReason>,
}

fn display_id(source_id: &Option<String>) -> &str {
    source_id.as_deref().unwrap_or("<unknown>")
}

fn join_reasons(reasons: &[RejectReason]) -> String {
    reasons
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl Rejection {
    /// True when any reason carries the given key
    pub fn has(&self, key: &str) -> bool {
        self.reasons.iter().any(|r| r.key() == key)
    }

    /// Distinct reason keys, in rule order
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<&'static str> = Vec::new();
        for reason in &self.reasons {
            if !keys.contains(&reason.key()) {
                keys.push(reason.key());
            }
        }
        keys
    }
}

/// Plausible release years: 1880 through two years from now
pub fn plausible_years() -> RangeInclusive<i32> {
    EARLIEST_YEAR..=Utc::now().year() + 2
}

/// Accepts or rejects normalized drafts for one platform
#[derive(Debug, Clone)]
pub struct RecordValidator {
    platform: Platform,
    shape: UrlShape,
    years: RangeInclusive<i32>,
}

impl RecordValidator {
    pub fn new(platform: Platform, base_url: &Url) -> Self {
        Self {
            platform,
            shape: UrlShape::for_platform(platform, base_url),
            years: plausible_years(),
        }
    }

    /// Lists every rule the draft violates
    pub fn check(&self, draft: &MovieDraft) -> Vec<RejectReason> {
        let mut reasons = Vec::new();

        if draft.source_id.is_none() {
            reasons.push(RejectReason::MissingRequiredField("source_id"));
        }
        if draft.title.is_none() {
            reasons.push(RejectReason::MissingRequiredField("title"));
        }
        match &draft.url {
            None => reasons.push(RejectReason::MissingRequiredField("url")),
            Some(url) if !self.shape.matches(url) => {
                reasons.push(RejectReason::UrlShapeMismatch(url.clone()))
            }
            Some(_) => {}
        }
        if let Some(rating) = draft.rating {
            if !self.platform.rating_scale().contains(&rating) {
                reasons.push(RejectReason::RatingOutOfRange(rating));
            }
        }
        if let Some(year) = draft.year {
            if !self.years.contains(&year) {
                reasons.push(RejectReason::YearOutOfRange(year));
            }
        }

        reasons
    }

    /// Promotes a draft to an immutable `MovieRecord`, or rejects it
    pub fn validate(&self, draft: MovieDraft) -> Result<MovieRecord, Rejection> {
        let reasons = self.check(&draft);

        match (draft.source_id, draft.title, draft.url) {
            (Some(source_id), Some(title), Some(url)) if reasons.is_empty() => Ok(MovieRecord {
                platform: draft.platform,
                source_id,
                url,
                title,
                original_title: draft.original_title,
                year: draft.year,
                genres: draft.genres,
                directors: draft.directors,
                actors: draft.actors,
                countries: draft.countries,
                languages: draft.languages,
                plot: draft.plot,
                poster_url: draft.poster_url,
                rating: draft.rating,
                rating_count: draft.rating_count,
                extensions: draft.extensions,
                crawl_time: draft.crawl_time,
            }),
            (source_id, _, _) => Err(Rejection { source_id, reasons }),
        }
    }
}
