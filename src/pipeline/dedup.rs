//! Deduplication by `(platform, source_id)` and the merge utility

use crate::platform::Platform;
use crate::record::{MovieRecord, RecordKey};
use std::collections::HashSet;

/// Remembers which `(platform, source_id)` pairs have been accepted.
///
/// First-seen wins: a later record with the same key is dropped, never merged
/// into the first.
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    seen: HashSet<RecordKey>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, platform: Platform, source_id: &str) -> bool {
        self.seen.contains(&RecordKey::new(platform, source_id))
    }

    pub fn remember(&mut self, platform: Platform, source_id: &str) {
        self.seen.insert(RecordKey::new(platform, source_id));
    }

    /// Remembers the pair and reports whether it was new
    pub fn admit(&mut self, platform: Platform, source_id: &str) -> bool {
        self.seen.insert(RecordKey::new(platform, source_id))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Result of merging two record collections
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub records: Vec<MovieRecord>,
    pub duplicates_dropped: usize,
}

/// Deduplicated union of two record collections; `first` wins on conflicts
/// and the relative order of surviving records is kept
pub fn merge_records(first: Vec<MovieRecord>, second: Vec<MovieRecord>) -> MergeOutcome {
    let mut dedup = Deduplicator::new();
    let mut outcome = MergeOutcome {
        records: Vec::with_capacity(first.len() + second.len()),
        duplicates_dropped: 0,
    };

    for record in first.into_iter().chain(second) {
        if dedup.admit(record.platform, &record.source_id) {
            outcome.records.push(record);
        } else {
            outcome.duplicates_dropped += 1;
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Extensions;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn record(platform: Platform, id: usize, title: &str) -> MovieRecord {
        let source_id = format!("{}", 1_000_000 + id);
        MovieRecord {
            platform,
            url: format!("https://movie.douban.com/subject/{}/", source_id),
            source_id,
            title: title.to_string(),
            original_title: None,
            year: Some(2000),
            genres: BTreeSet::new(),
            directors: Vec::new(),
            actors: Vec::new(),
            countries: Vec::new(),
            languages: Vec::new(),
            plot: None,
            poster_url: None,
            rating: Some(7.0),
            rating_count: None,
            extensions: Extensions::default(),
            crawl_time: Utc::now(),
        }
    }

    #[test]
    fn test_equal_keys_are_admitted_once() {
        let mut dedup = Deduplicator::new();
        assert!(dedup.admit(Platform::Douban, "1292052"));
        assert!(!dedup.admit(Platform::Douban, "1292052"));
        assert!(dedup.seen(Platform::Douban, "1292052"));
        assert_eq!(dedup.len(), 1);
    }

    #[test]
    fn test_platform_is_part_of_the_key() {
        let mut dedup = Deduplicator::new();
        dedup.remember(Platform::Douban, "42");
        assert!(!dedup.seen(Platform::Imdb, "42"));
        assert!(dedup.admit(Platform::Imdb, "42"));
    }

    #[test]
    fn test_merge_fifty_and_thirty_sharing_five() {
        let first: Vec<_> = (0..50).map(|i| record(Platform::Douban, i, "first")).collect();
        let second: Vec<_> = (45..75).map(|i| record(Platform::Douban, i, "second")).collect();

        let outcome = merge_records(first, second);

        assert_eq!(outcome.records.len(), 75);
        assert_eq!(outcome.duplicates_dropped, 5);
    }

    #[test]
    fn test_merge_keeps_first_seen() {
        let first = vec![record(Platform::Douban, 1, "original")];
        let second = vec![record(Platform::Douban, 1, "later")];

        let outcome = merge_records(first, second);

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].title, "original");
    }
}
