/// Category crawl state machine
///
/// A category crawl moves `Idle → Paginating → Fetching → Parsing`, then runs
/// each item through `Normalizing → Validating → Deduping` before returning
/// to `Paginating`. It ends in `Done` or `Aborted`.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents where a category crawl currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlState {
    // ===== Initial State =====
    /// Constructed, nothing fetched yet
    Idle,

    // ===== Active States =====
    /// Deciding whether and where to fetch the next page
    Paginating,

    /// Waiting on a listing or detail page fetch
    Fetching,

    /// Extracting candidates from fetched content
    Parsing,

    /// Cleaning one candidate's fields
    Normalizing,

    /// Checking one normalized draft
    Validating,

    /// Checking one accepted record against the seen-set
    Deduping,

    // ===== Terminal States =====
    /// Pagination ended normally (no more pages, page limit or item cap)
    Done,

    /// Stopped early; records gathered so far are kept
    Aborted,
}

impl CrawlState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    /// Returns true while items are being pushed through the pipeline
    pub fn is_per_item(&self) -> bool {
        matches!(self, Self::Normalizing | Self::Validating | Self::Deduping)
    }

    /// Returns true if moving to `next` is a legal transition
    pub fn can_transition_to(&self, next: CrawlState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Self::Idle => false,
            Self::Aborted => true,
            Self::Done => matches!(self, Self::Paginating),
            Self::Paginating => !matches!(self, Self::Paginating),
            Self::Fetching => matches!(self, Self::Paginating | Self::Parsing) || self.is_per_item(),
            Self::Parsing => matches!(self, Self::Fetching),
            Self::Normalizing => matches!(self, Self::Parsing) || self.is_per_item(),
            Self::Validating => matches!(self, Self::Normalizing),
            Self::Deduping => matches!(self, Self::Validating),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Paginating => "paginating",
            Self::Fetching => "fetching",
            Self::Parsing => "parsing",
            Self::Normalizing => "normalizing",
            Self::Validating => "validating",
            Self::Deduping => "deduping",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }

    /// Returns all states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Idle,
            Self::Paginating,
            Self::Fetching,
            Self::Parsing,
            Self::Normalizing,
            Self::Validating,
            Self::Deduping,
            Self::Done,
            Self::Aborted,
        ]
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
