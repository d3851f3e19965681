use super::CandidateRecord;
use crate::platform::Platform;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identity of a movie within a run
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub platform: Platform,
    pub source_id: String,
}

impl RecordKey {
    pub fn new(platform: Platform, source_id: impl Into<String>) -> Self {
        Self {
            platform,
            source_id: source_id.into(),
        }
    }
}

/// Percentages of votes per star level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingDistribution {
    pub five: f64,
    pub four: f64,
    pub three: f64,
    pub two: f64,
    pub one: f64,
}

impl RatingDistribution {
    /// Builds a distribution from exactly five percentages, five stars first
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match values {
            [five, four, three, two, one] => Some(Self {
                five: *five,
                four: *four,
                three: *three,
                two: *two,
                one: *one,
            }),
            _ => None,
        }
    }

    pub fn to_vec(&self) -> Vec<f64> {
        vec![self.five, self.four, self.three, self.two, self.one]
    }
}

/// Optional fields only some sources or pages supply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extensions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub box_office: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metascore: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub writers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_distribution: Option<RatingDistribution>,
}

impl Extensions {
    pub fn is_empty(&self) -> bool {
        *self == Extensions::default()
    }
}

/// Output of the normalizer: canonical field types, not yet validated
#[derive(Debug, Clone, PartialEq)]
pub struct MovieDraft {
    pub platform: Platform,
    pub source_id: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub year: Option<i32>,
    pub genres: BTreeSet<String>,
    pub directors: Vec<String>,
    pub actors: Vec<String>,
    pub countries: Vec<String>,
    pub languages: Vec<String>,
    pub plot: Option<String>,
    pub poster_url: Option<String>,
    pub rating: Option<f64>,
    pub rating_count: Option<u64>,
    pub extensions: Extensions,
    pub crawl_time: DateTime<Utc>,
}

impl MovieDraft {
    /// Renders the draft back into raw candidate form.
    ///
    /// Normalizing the result yields the same draft again.
    pub fn to_candidate(&self) -> CandidateRecord {
        let ext = &self.extensions;
        CandidateRecord {
            platform: self.platform,
            source_id: self.source_id.clone(),
            url: self.url.clone(),
            title: self.title.clone(),
            original_title: self.original_title.clone(),
            year: self.year.map(|y| y.to_string()),
            rating: self.rating.map(|r| r.to_string()),
            rating_count: self.rating_count.map(|c| c.to_string()),
            plot: self.plot.clone(),
            poster_url: self.poster_url.clone(),
            genres: self.genres.iter().cloned().collect(),
            directors: self.directors.clone(),
            actors: self.actors.clone(),
            writers: ext.writers.clone(),
            countries: self.countries.clone(),
            languages: self.languages.clone(),
            tags: ext.tags.clone(),
            runtime: ext.runtime_minutes.map(|m| m.to_string()),
            release_date: ext.release_date.clone(),
            budget: ext.budget.map(|b| b.to_string()),
            box_office: ext.box_office.map(|b| b.to_string()),
            metascore: ext.metascore.map(|m| m.to_string()),
            imdb_id: ext.imdb_id.clone(),
            rating_distribution: ext
                .rating_distribution
                .map(|d| d.to_vec().iter().map(|p| p.to_string()).collect())
                .unwrap_or_default(),
            captured_at: Some(self.crawl_time),
        }
    }
}

/// Canonical, validated movie record.
///
/// Created only by `RecordValidator::validate`; never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub platform: Platform,
    pub source_id: String,
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default)]
    pub genres: BTreeSet<String>,
    #[serde(default)]
    pub directors: Vec<String>,
    #[serde(default)]
    pub actors: Vec<String>,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub extensions: Extensions,
    pub crawl_time: DateTime<Utc>,
}

impl MovieRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.platform, self.source_id.clone())
    }
}
