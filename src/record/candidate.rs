use crate::platform::Platform;
use chrono::{DateTime, Utc};

/// Raw, source-specific bag of fields extracted from one listing item or
/// detail page. Nothing here is validated; every field may be absent.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRecord {
    pub platform: Platform,
    pub source_id: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub year: Option<String>,
    pub rating: Option<String>,
    pub rating_count: Option<String>,
    pub plot: Option<String>,
    pub poster_url: Option<String>,
    pub genres: Vec<String>,
    pub directors: Vec<String>,
    pub actors: Vec<String>,
    pub writers: Vec<String>,
    pub countries: Vec<String>,
    pub languages: Vec<String>,
    pub tags: Vec<String>,
    pub runtime: Option<String>,
    pub release_date: Option<String>,
    pub budget: Option<String>,
    pub box_office: Option<String>,
    pub metascore: Option<String>,
    pub imdb_id: Option<String>,
    /// Star distribution percentages, five stars first
    pub rating_distribution: Vec<String>,
    pub captured_at: Option<DateTime<Utc>>,
}

impl CandidateRecord {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            source_id: None,
            url: None,
            title: None,
            original_title: None,
            year: None,
            rating: None,
            rating_count: None,
            plot: None,
            poster_url: None,
            genres: Vec::new(),
            directors: Vec::new(),
            actors: Vec::new(),
            writers: Vec::new(),
            countries: Vec::new(),
            languages: Vec::new(),
            tags: Vec::new(),
            runtime: None,
            release_date: None,
            budget: None,
            box_office: None,
            metascore: None,
            imdb_id: None,
            rating_distribution: Vec::new(),
            captured_at: None,
        }
    }

    /// Overlays fields found on a detail page onto list-level data.
    ///
    /// Present detail values win; absent ones keep what the listing supplied.
    /// Identity fields (`source_id`, `url`) are only filled, never replaced.
    pub fn merge_detail(&mut self, detail: CandidateRecord) {
        fn overlay(target: &mut Option<String>, value: Option<String>) {
            if value.as_deref().map_or(false, |v| !v.trim().is_empty()) {
                *target = value;
            }
        }
        fn overlay_list(target: &mut Vec<String>, value: Vec<String>) {
            if !value.is_empty() {
                *target = value;
            }
        }

        if self.source_id.is_none() {
            self.source_id = detail.source_id;
        }
        if self.url.is_none() {
            self.url = detail.url;
        }
        overlay(&mut self.title, detail.title);
        overlay(&mut self.original_title, detail.original_title);
        overlay(&mut self.year, detail.year);
        overlay(&mut self.rating, detail.rating);
        overlay(&mut self.rating_count, detail.rating_count);
        overlay(&mut self.plot, detail.plot);
        overlay(&mut self.poster_url, detail.poster_url);
        overlay(&mut self.runtime, detail.runtime);
        overlay(&mut self.release_date, detail.release_date);
        overlay(&mut self.budget, detail.budget);
        overlay(&mut self.box_office, detail.box_office);
        overlay(&mut self.metascore, detail.metascore);
        overlay(&mut self.imdb_id, detail.imdb_id);
        overlay_list(&mut self.genres, detail.genres);
        overlay_list(&mut self.directors, detail.directors);
        overlay_list(&mut self.actors, detail.actors);
        overlay_list(&mut self.writers, detail.writers);
        overlay_list(&mut self.countries, detail.countries);
        overlay_list(&mut self.languages, detail.languages);
        overlay_list(&mut self.tags, detail.tags);
        overlay_list(&mut self.rating_distribution, detail.rating_distribution);
        if detail.captured_at.is_some() {
            self.captured_at = detail.captured_at;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_detail_overrides_present_fields() {
        let mut list = CandidateRecord::new(Platform::Douban);
        list.source_id = Some("1292052".to_string());
        list.title = Some("肖申克的救赎".to_string());
        list.rating = Some("9.7".to_string());
        list.genres = vec!["剧情".to_string()];

        let mut detail = CandidateRecord::new(Platform::Douban);
        detail.source_id = Some("999".to_string());
        detail.rating = Some("9.8".to_string());
        detail.title = Some("   ".to_string());
        detail.directors = vec!["弗兰克·德拉邦特".to_string()];

        list.merge_detail(detail);

        assert_eq!(list.source_id.as_deref(), Some("1292052"));
        assert_eq!(list.title.as_deref(), Some("肖申克的救赎"));
        assert_eq!(list.rating.as_deref(), Some("9.8"));
        assert_eq!(list.genres, vec!["剧情"]);
        assert_eq!(list.directors, vec!["弗兰克·德拉邦特"]);
    }
}
