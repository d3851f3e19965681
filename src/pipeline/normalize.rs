//! Field normalization
//!
//! Every transformation here is idempotent: normalizing a record that was
//! produced by this module (and rendered back with `MovieDraft::to_candidate`)
//! yields the same record.

use crate::record::{CandidateRecord, Extensions, MovieDraft, RatingDistribution};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::{BTreeSet, HashSet};

/// Plots longer than this many characters are truncated with `...`
pub const PLOT_LIMIT: usize = 500;

const LIST_DELIMITERS: &[char] = &['/', '，', '、', '|'];

/// Name suffixes that follow a comma without starting a new entry
const NAME_SUFFIXES: &[&str] = &["Jr", "Jr.", "Sr", "Sr.", "II", "III", "IV"];

static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]{1,6}|#[0-9]{1,7}|[a-zA-Z]{2,8});").expect("valid entity regex")
});
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<>]*>").expect("valid tag regex"));
static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid decimal regex"));
static COUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)(?:\s*(万|亿|thousand|million|billion)|([kmb])\b)?")
        .expect("valid count regex")
});
static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[12]\d{3}").expect("valid year regex"));
static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid integer regex"));
static HOURS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+)\s*h").expect("valid hours regex"));
static MINUTES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*m").expect("valid minutes regex"));

/// Canonical genre vocabulary and the labels each source uses for it
const GENRES: &[(&str, &[&str])] = &[
    ("Drama", &["剧情"]),
    ("Comedy", &["喜剧"]),
    ("Action", &["动作"]),
    ("Romance", &["爱情"]),
    ("Sci-Fi", &["科幻", "science fiction", "scifi", "sci fi", "sci_fi"]),
    ("Horror", &["恐怖"]),
    ("Thriller", &["惊悚"]),
    ("Crime", &["犯罪"]),
    ("Mystery", &["悬疑"]),
    ("Adventure", &["冒险"]),
    ("Fantasy", &["奇幻"]),
    ("Animation", &["动画"]),
    ("Family", &["家庭"]),
    ("War", &["战争"]),
    ("History", &["历史"]),
    ("Biography", &["传记"]),
    ("Music", &["音乐"]),
    ("Musical", &["歌舞"]),
    ("Documentary", &["纪录片"]),
    ("Western", &["西部"]),
    ("Sport", &["运动", "sports"]),
    ("Film-Noir", &["黑色电影", "film noir"]),
    ("Short", &["短片"]),
    ("Costume", &["古装"]),
    ("Martial Arts", &["武侠"]),
];

/// Cleans candidate fields into canonical types
#[derive(Debug, Clone)]
pub struct FieldNormalizer {
    plot_limit: usize,
}

impl FieldNormalizer {
    pub fn new() -> Self {
        Self {
            plot_limit: PLOT_LIMIT,
        }
    }

    pub fn with_plot_limit(plot_limit: usize) -> Self {
        Self {
            plot_limit: plot_limit.max(4),
        }
    }

    /// Normalizes a candidate into an unvalidated draft
    pub fn normalize(&self, candidate: &CandidateRecord) -> MovieDraft {
        let text = |value: &Option<String>| value.as_deref().and_then(clean_text);

        let distribution: Option<Vec<f64>> = candidate
            .rating_distribution
            .iter()
            .map(|p| parse_decimal(p))
            .collect();

        MovieDraft {
            platform: candidate.platform,
            source_id: text(&candidate.source_id),
            url: text(&candidate.url),
            title: text(&candidate.title),
            original_title: text(&candidate.original_title),
            year: candidate.year.as_deref().and_then(parse_year),
            genres: normalize_genres(&candidate.genres),
            directors: split_list(&candidate.directors),
            actors: split_list(&candidate.actors),
            countries: split_list(&candidate.countries),
            languages: split_list(&candidate.languages),
            plot: text(&candidate.plot).map(|p| truncate_plot(&p, self.plot_limit)),
            poster_url: text(&candidate.poster_url),
            rating: candidate.rating.as_deref().and_then(parse_decimal),
            rating_count: candidate.rating_count.as_deref().and_then(parse_count),
            extensions: Extensions {
                runtime_minutes: candidate.runtime.as_deref().and_then(parse_minutes),
                release_date: text(&candidate.release_date),
                budget: candidate.budget.as_deref().and_then(parse_count),
                box_office: candidate.box_office.as_deref().and_then(parse_count),
                metascore: candidate
                    .metascore
                    .as_deref()
                    .and_then(parse_integer)
                    .and_then(|v| u32::try_from(v).ok()),
                imdb_id: text(&candidate.imdb_id),
                writers: split_list(&candidate.writers),
                tags: split_list(&candidate.tags),
                rating_distribution: distribution
                    .as_deref()
                    .and_then(RatingDistribution::from_slice),
            },
            crawl_time: candidate.captured_at.unwrap_or_else(Utc::now),
        }
    }
}

impl Default for FieldNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_entity(caps: &Captures) -> String {
    let whole = &caps[0];
    let body = &caps[1];
    let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
    } else if let Some(dec) = body.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(char::from_u32)
    } else {
        match body {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            "middot" => Some('·'),
            "hellip" => Some('…'),
            "ndash" => Some('–'),
            "mdash" => Some('—'),
            "lsquo" => Some('‘'),
            "rsquo" => Some('’'),
            "ldquo" => Some('“'),
            "rdquo" => Some('”'),
            _ => None,
        }
    };
    decoded.map_or_else(|| whole.to_string(), |c| c.to_string())
}

/// Decodes entities and removes markup until nothing changes
pub fn strip_markup(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let decoded = ENTITY.replace_all(&current, decode_entity);
        let untagged = TAG.replace_all(&decoded, " ");
        let next: String = untagged.chars().filter(|c| *c != '<' && *c != '>').collect();
        if next == current {
            return next;
        }
        current = next;
    }
}

/// Collapses whitespace runs into single spaces and trims both ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strips markup and whitespace noise; empty results become `None`
pub fn clean_text(text: &str) -> Option<String> {
    let cleaned = collapse_whitespace(&strip_markup(text));
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

fn strip_separators(text: &str) -> String {
    text.chars().filter(|c| *c != ',' && *c != '，').collect()
}

/// First decimal number in the text, ignoring thousands separators
pub fn parse_decimal(text: &str) -> Option<f64> {
    let cleaned = strip_separators(text);
    DECIMAL
        .find(&cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Non-negative count, tolerant of separators and K/M/B or 万/亿 suffixes
pub fn parse_count(text: &str) -> Option<u64> {
    let cleaned = strip_separators(text);
    let caps = COUNT.captures(&cleaned)?;
    let number = caps.get(1)?.as_str();
    let suffix = caps
        .get(2)
        .or_else(|| caps.get(3))
        .map(|m| m.as_str().to_lowercase());

    if suffix.is_none() && !number.contains('.') {
        return number.parse::<u64>().ok();
    }

    let multiplier = match suffix.as_deref() {
        None => 1.0,
        Some("k") | Some("thousand") => 1e3,
        Some("万") => 1e4,
        Some("m") | Some("million") => 1e6,
        Some("亿") => 1e8,
        Some("b") | Some("billion") => 1e9,
        Some(_) => return None,
    };
    let value = number.parse::<f64>().ok()? * multiplier;
    if value.is_finite() && value < u64::MAX as f64 {
        Some(value.round() as u64)
    } else {
        None
    }
}

/// First four-digit year in the text
pub fn parse_year(text: &str) -> Option<i32> {
    YEAR.find(text).and_then(|m| m.as_str().parse().ok())
}

/// First integer in the text
pub fn parse_integer(text: &str) -> Option<u64> {
    INTEGER.find(text).and_then(|m| m.as_str().parse().ok())
}

/// Runtime in minutes from "142分钟", "142 min", "2h 22m" or "PT2H22M"
pub fn parse_minutes(text: &str) -> Option<u32> {
    if let Some(hours) = HOURS.captures(text) {
        let hours: u32 = hours[1].parse().ok()?;
        let minutes: u32 = match MINUTES.captures(text) {
            Some(caps) => caps[1].parse().ok()?,
            None => 0,
        };
        return hours.checked_mul(60)?.checked_add(minutes);
    }
    parse_integer(text).and_then(|v| u32::try_from(v).ok())
}

/// Maps a genre label onto the shared vocabulary; unknown labels pass through
pub fn map_genre(label: &str) -> String {
    let key = label.trim().to_lowercase();
    GENRES
        .iter()
        .find(|(canonical, aliases)| {
            canonical.to_lowercase() == key || aliases.iter().any(|alias| *alias == key)
        })
        .map(|(canonical, _)| canonical.to_string())
        .unwrap_or_else(|| label.trim().to_string())
}

fn normalize_genres(labels: &[String]) -> BTreeSet<String> {
    split_list(labels).iter().map(|g| map_genre(g)).collect()
}

/// Cleans each entry, splits delimited entries and drops exact repeats,
/// keeping first occurrences in order.
///
/// Commas only separate entries when everything collapsed into one joined
/// string, and never before a name suffix such as `Jr.`.
pub fn split_list(items: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let Some(cleaned) = clean_text(item) else {
            continue;
        };
        for part in cleaned.split(LIST_DELIMITERS) {
            let part = part.trim();
            if !part.is_empty() && seen.insert(part.to_string()) {
                out.push(part.to_string());
            }
        }
    }

    if out.len() != 1 {
        return out;
    }
    let mut names: Vec<String> = Vec::new();
    for name in split_commas(&out[0]) {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

fn split_commas(part: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for piece in part.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match names.last_mut() {
            Some(previous) if NAME_SUFFIXES.contains(&piece) => {
                previous.push_str(", ");
                previous.push_str(piece);
            }
            _ => names.push(piece.to_string()),
        }
    }
    names
}

/// Truncates to at most `limit` characters including the trailing `...`
pub fn truncate_plot(plot: &str, limit: usize) -> String {
    if plot.chars().count() <= limit {
        return plot.to_string();
    }
    let head: String = plot.chars().take(limit.saturating_sub(3)).collect();
    format!("{}...", head.trim_end())
}
