use super::{
    all_texts, anchor_fallback, canonical_url, check_blocked, first_attr, first_text,
    json_ld_is, json_ld_objects, json_names, json_scalar, rel_next, select_all, ItemParseError,
    PageParseError, PageParser, PaginationInfo, ParsedPage,
};
use crate::crawler::fetcher::PageContent;
use crate::platform::{Category, ListLayout, Platform};
use crate::record::CandidateRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use serde_json::Value;

const BLOCK_MARKERS: &[&str] = &["Robot Check", "Access Denied"];

static RANK_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\s*").expect("valid rank regex"));
static YEAR_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:19|20)\d{2}(?:[–-](?:(?:19|20)\d{2})?)?$").expect("valid year regex"));
static RUNTIME_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+h(?:\s*\d+m)?$|^\d+m$").expect("valid runtime regex"));

/// Parser for www.imdb.com charts, searches and title pages
///
/// Structured data is preferred: JSON-LD blocks are read first and the DOM is
/// only consulted for what they leave out.
#[derive(Debug, Clone, Default)]
pub struct ImdbParser;

impl ImdbParser {
    pub fn new() -> Self {
        Self
    }

    fn list_items(
        &self,
        document: &Html,
        page: &PageContent,
    ) -> Vec<Result<CandidateRecord, ItemParseError>> {
        let from_json = self.json_ld_items(document, page);
        if !from_json.is_empty() {
            return from_json;
        }

        let summaries = select_all(document.root_element(), "li.ipc-metadata-list-summary-item");
        if !summaries.is_empty() {
            return summaries
                .into_iter()
                .enumerate()
                .map(|(index, item)| self.summary_item(index, item, page))
                .collect();
        }

        anchor_fallback(document, Platform::Imdb, &page.url)
            .into_iter()
            .map(|mut record| {
                record.captured_at = Some(page.fetched_at);
                Ok(record)
            })
            .collect()
    }

    /// Items of a JSON-LD `ItemList`
    fn json_ld_items(
        &self,
        document: &Html,
        page: &PageContent,
    ) -> Vec<Result<CandidateRecord, ItemParseError>> {
        let Some(list) = json_ld_objects(document)
            .into_iter()
            .find(|object| json_ld_is(object, "ItemList"))
        else {
            return Vec::new();
        };
        let Some(Value::Array(elements)) = list.get("itemListElement") else {
            return Vec::new();
        };

        elements
            .iter()
            .enumerate()
            .map(|(index, element)| {
                let movie = element.get("item").unwrap_or(element);
                let id = movie
                    .get("url")
                    .and_then(Value::as_str)
                    .and_then(|url| Platform::Imdb.extract_source_id(url))
                    .ok_or(ItemParseError::MissingLink { index })?;

                let mut record = movie_from_json(movie, page, &id);
                record.captured_at = Some(page.fetched_at);
                Ok(record)
            })
            .collect()
    }

    fn summary_item(
        &self,
        index: usize,
        item: ElementRef,
        page: &PageContent,
    ) -> Result<CandidateRecord, ItemParseError> {
        let href = first_attr(item, "a.ipc-title-link-wrapper", "href")
            .or_else(|| first_attr(item, "a[href*=\"/title/tt\"]", "href"));
        let id = href
            .as_deref()
            .and_then(|href| Platform::Imdb.extract_source_id(href))
            .ok_or(ItemParseError::MissingLink { index })?;

        let mut record = CandidateRecord::new(Platform::Imdb);
        record.url = canonical_url(Platform::Imdb, &page.url, &id);
        record.imdb_id = Some(id.clone());
        record.source_id = Some(id);
        record.captured_at = Some(page.fetched_at);

        record.title = first_text(item, "h3.ipc-title__text")
            .map(|title| RANK_PREFIX.replace(&title, "").to_string());

        for meta in all_texts(
            item,
            "span.cli-title-metadata-item, span.dli-title-metadata-item, span.sc-title-metadata-item",
        ) {
            if record.year.is_none() && YEAR_ONLY.is_match(&meta) {
                record.year = Some(meta);
            } else if record.runtime.is_none() && RUNTIME_TEXT.is_match(&meta) {
                record.runtime = Some(meta);
            }
        }

        record.rating = first_text(item, "span.ipc-rating-star--rating").or_else(|| {
            first_attr(item, "span.ipc-rating-star", "aria-label")
        });
        record.rating_count = first_text(item, "span.ipc-rating-star--voteCount");
        record.plot = first_text(item, "div.ipc-html-content-inner-div");
        record.poster_url = first_attr(item, "img.ipc-image", "src");
        Ok(record)
    }

    fn pagination(&self, document: &Html, item_count: usize, category: &Category) -> PaginationInfo {
        if item_count == 0 {
            return PaginationInfo::end();
        }
        match category.layout {
            ListLayout::ImdbChart | ListLayout::ImdbCalendar => PaginationInfo::end(),
            _ => {
                if let Some(href) = rel_next(document) {
                    PaginationInfo::more(Some(href))
                } else if item_count >= category.page_size as usize {
                    PaginationInfo::more(None)
                } else {
                    PaginationInfo::end()
                }
            }
        }
    }

    /// DOM fields of a title page, filling whatever JSON-LD left empty
    fn fill_from_dom(&self, root: ElementRef, record: &mut CandidateRecord) {
        fill(&mut record.title, || {
            first_text(root, "h1[data-testid=\"hero__pageTitle\"] span.hero__primary-text")
                .or_else(|| first_text(root, "h1"))
        });
        fill(&mut record.original_title, || {
            first_text(root, "div[data-testid=\"hero-title-block__original-title\"]").map(|text| {
                text.trim_start_matches("Original title:").trim().to_string()
            })
        });

        let mut directors = Vec::new();
        let mut writers = Vec::new();
        let mut stars = Vec::new();
        for credit in select_all(root, "li[data-testid=\"title-pc-principal-credit\"]") {
            let label = first_text(
                credit,
                "span.ipc-metadata-list-item__label, a.ipc-metadata-list-item__label",
            )
            .unwrap_or_default();
            let names = all_texts(credit, "a.ipc-metadata-list-item__list-content-item");
            if label.starts_with("Director") {
                directors.extend(names);
            } else if label.starts_with("Writer") {
                writers.extend(names);
            } else if label.starts_with("Star") {
                stars.extend(names);
            }
        }
        fill_list(&mut record.directors, directors);
        fill_list(&mut record.writers, writers);

        let mut cast = all_texts(root, "a[data-testid=\"title-cast-item__actor\"]");
        if cast.is_empty() {
            cast = stars;
        }
        fill_list(
            &mut record.actors,
            cast.into_iter().take(Platform::Imdb.actor_limit()).collect(),
        );

        fill_list(
            &mut record.genres,
            all_texts(root, "div[data-testid=\"genres\"] a, div[data-testid=\"interests\"] a"),
        );
        fill_list(&mut record.countries, all_texts(root, "a[href*=\"country_of_origin=\"]"));
        fill_list(&mut record.languages, all_texts(root, "a[href*=\"primary_language=\"]"));

        fill(&mut record.release_date, || {
            first_text(
                root,
                "li[data-testid=\"title-details-releasedate\"] a.ipc-metadata-list-item__list-content-item",
            )
        });
        fill(&mut record.runtime, || {
            first_text(root, "li[data-testid=\"title-techspec_runtime\"] div")
        });
        fill(&mut record.budget, || {
            first_text(
                root,
                "li[data-testid=\"title-boxoffice-budget\"] span.ipc-metadata-list-item__list-content-item",
            )
        });
        fill(&mut record.box_office, || {
            first_text(
                root,
                "li[data-testid=\"title-boxoffice-cumulativeworldwidegross\"] span.ipc-metadata-list-item__list-content-item",
            )
        });
        fill(&mut record.metascore, || {
            first_text(root, "span.metacritic-score-box").or_else(|| first_text(root, "span.score-meta"))
        });
        fill(&mut record.rating, || {
            first_text(
                root,
                "div[data-testid=\"hero-rating-bar__aggregate-rating__score\"] span",
            )
        });
        fill(&mut record.plot, || {
            first_text(root, "span[data-testid=\"plot-xl\"]")
                .or_else(|| first_text(root, "span[data-testid=\"plot-l\"]"))
                .or_else(|| first_text(root, "span[data-testid=\"plot-xs_to_m\"]"))
        });
        fill(&mut record.poster_url, || {
            first_attr(root, "div[data-testid=\"hero-media__poster\"] img", "src")
        });
    }
}

impl PageParser for ImdbParser {
    fn platform(&self) -> Platform {
        Platform::Imdb
    }

    fn parse(&self, page: &PageContent, category: &Category) -> Result<ParsedPage, PageParseError> {
        let document = Html::parse_document(&page.body);
        check_blocked(&document, BLOCK_MARKERS)?;

        let items = self.list_items(&document, page);
        let pagination = self.pagination(&document, items.len(), category);
        Ok(ParsedPage { items, pagination })
    }

    fn parse_detail(&self, page: &PageContent) -> Result<CandidateRecord, ItemParseError> {
        let document = Html::parse_document(&page.body);
        let id = Platform::Imdb.extract_source_id(page.url.path());

        let movie = json_ld_objects(&document)
            .into_iter()
            .find(|object| json_ld_is(object, "Movie"));
        let mut record = match (&movie, &id) {
            (Some(movie), Some(id)) => movie_from_json(movie, page, id),
            _ => {
                let mut record = CandidateRecord::new(Platform::Imdb);
                record.url = id.as_deref().and_then(|id| canonical_url(Platform::Imdb, &page.url, id));
                record.source_id = id.clone();
                record.imdb_id = id.clone();
                record
            }
        };
        record.captured_at = Some(page.fetched_at);

        self.fill_from_dom(document.root_element(), &mut record);

        if record.title.is_none() && record.rating.is_none() {
            return Err(ItemParseError::EmptyDetail {
                url: page.url.to_string(),
            });
        }
        Ok(record)
    }
}

/// Builds a record from a JSON-LD `Movie` object
fn movie_from_json(movie: &Value, page: &PageContent, id: &str) -> CandidateRecord {
    let text = |key: &str| movie.get(key).and_then(json_scalar);

    let mut record = CandidateRecord::new(Platform::Imdb);
    record.url = canonical_url(Platform::Imdb, &page.url, id);
    record.source_id = Some(id.to_string());
    record.imdb_id = Some(id.to_string());

    record.title = text("name");
    record.original_title = text("alternateName");
    record.release_date = text("datePublished");
    record.year = record.release_date.clone();
    record.plot = text("description");
    record.runtime = text("duration");
    record.poster_url = match movie.get("image") {
        Some(Value::Object(image)) => image.get("url").and_then(json_scalar),
        Some(other) => json_scalar(other),
        None => None,
    };

    record.genres = json_names(movie.get("genre"));
    record.directors = json_names(movie.get("director"));
    record.actors = json_names(movie.get("actor"))
        .into_iter()
        .take(Platform::Imdb.actor_limit())
        .collect();
    record.writers = people(movie.get("creator"));

    if let Some(rating) = movie.get("aggregateRating") {
        record.rating = rating.get("ratingValue").and_then(json_scalar);
        record.rating_count = rating.get("ratingCount").and_then(json_scalar);
    }
    record
}

/// Names of the `Person` entries in a JSON-LD credit list
fn people(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| !json_ld_is(item, "Organization"))
            .flat_map(|item| json_names(Some(item)))
            .collect(),
        Some(item) if !json_ld_is(item, "Organization") => json_names(Some(item)),
        _ => Vec::new(),
    }
}

fn fill(target: &mut Option<String>, value: impl FnOnce() -> Option<String>) {
    if target.is_none() {
        *target = value().filter(|v| !v.is_empty());
    }
}

fn fill_list(target: &mut Vec<String>, value: Vec<String>) {
    if target.is_empty() {
        *target = value;
    }
}
