use super::Platform;
use crate::CatalogError;
use url::Url;

/// Page structure a category's listing uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListLayout {
    /// Douban Top 250 grid (`ol.grid_view`)
    DoubanTop250,
    /// Douban chart tables (`tr.item` / `div.pl2`)
    DoubanChart,
    /// Douban genre ranking lists
    DoubanTypeRank,
    /// IMDb chart pages (single page, up to 250 entries)
    ImdbChart,
    /// IMDb advanced title search (paginated)
    ImdbSearch,
    /// IMDb release calendar
    ImdbCalendar,
}

/// A named listing on a platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub platform: Platform,
    pub name: &'static str,
    pub label: &'static str,
    /// Path and query relative to the platform base URL; `{start}` is
    /// replaced with the item offset of the requested page
    pub path: &'static str,
    pub page_size: u32,
    pub max_pages: u32,
    /// Offset of the first item (IMDb search counts from one)
    pub first_offset: u32,
    pub layout: ListLayout,
    /// CSS selector that signals a rendered listing is usable
    pub ready_selector: &'static str,
}

impl Category {
    /// Builds the URL of the zero-based `page_index` of this listing
    pub fn page_url(&self, base: &Url, page_index: u32) -> Result<Url, url::ParseError> {
        let offset = self.first_offset + page_index * self.page_size;
        base.join(&self.path.replace("{start}", &offset.to_string()))
    }

    pub fn is_paginated(&self) -> bool {
        self.max_pages > 1
    }
}

const DOUBAN_CHART_READY: &str = "div.pl2, ol.grid_view";
const IMDB_LIST_READY: &str = "li.ipc-metadata-list-summary-item";
const IMDB_CALENDAR_READY: &str = "a[href*=\"/title/tt\"]";

const fn douban(
    name: &'static str,
    label: &'static str,
    path: &'static str,
    layout: ListLayout,
    max_pages: u32,
) -> Category {
    Category {
        platform: Platform::Douban,
        name,
        label,
        path,
        page_size: 25,
        max_pages,
        first_offset: 0,
        layout,
        ready_selector: DOUBAN_CHART_READY,
    }
}

const fn imdb_chart(name: &'static str, label: &'static str, path: &'static str) -> Category {
    Category {
        platform: Platform::Imdb,
        name,
        label,
        path,
        page_size: 250,
        max_pages: 1,
        first_offset: 0,
        layout: ListLayout::ImdbChart,
        ready_selector: IMDB_LIST_READY,
    }
}

const fn imdb_genre(name: &'static str, label: &'static str, path: &'static str) -> Category {
    Category {
        platform: Platform::Imdb,
        name,
        label,
        path,
        page_size: 50,
        max_pages: 5,
        first_offset: 1,
        layout: ListLayout::ImdbSearch,
        ready_selector: IMDB_LIST_READY,
    }
}

static DOUBAN_CATALOG: [Category; 10] = [
    douban("hot", "豆瓣热门电影", "/chart?type=11&start={start}", ListLayout::DoubanChart, 20),
    douban("top250", "豆瓣电影Top250", "/top250?start={start}&filter=", ListLayout::DoubanTop250, 10),
    douban("new_movies", "新片榜", "/chart?type=5&start={start}", ListLayout::DoubanChart, 4),
    douban("weekly_best", "一周口碑榜", "/chart?type=12&start={start}", ListLayout::DoubanChart, 4),
    douban("north_america", "北美票房榜", "/chart?type=2&start={start}", ListLayout::DoubanChart, 4),
    douban(
        "classic",
        "经典电影",
        "/typerank?type_name=剧情&type=11&interval_id=100:90&action=&start={start}",
        ListLayout::DoubanTypeRank,
        8,
    ),
    douban(
        "comedy",
        "喜剧片",
        "/typerank?type_name=喜剧&type=24&interval_id=100:90&action=&start={start}",
        ListLayout::DoubanTypeRank,
        8,
    ),
    douban(
        "action",
        "动作片",
        "/typerank?type_name=动作&type=5&interval_id=100:90&action=&start={start}",
        ListLayout::DoubanTypeRank,
        8,
    ),
    douban(
        "romance",
        "爱情片",
        "/typerank?type_name=爱情&type=13&interval_id=100:90&action=&start={start}",
        ListLayout::DoubanTypeRank,
        8,
    ),
    douban(
        "sci_fi",
        "科幻片",
        "/typerank?type_name=科幻&type=17&interval_id=100:90&action=&start={start}",
        ListLayout::DoubanTypeRank,
        8,
    ),
];

static IMDB_CATALOG: [Category; 10] = [
    imdb_chart("top250", "IMDb Top 250 Movies", "/chart/top/"),
    imdb_chart("popular", "Most Popular Movies", "/chart/moviemeter/"),
    imdb_chart("now_playing", "Top Box Office", "/chart/boxoffice/"),
    Category {
        platform: Platform::Imdb,
        name: "upcoming",
        label: "Upcoming Releases",
        path: "/calendar/?type=MOVIE",
        page_size: 100,
        max_pages: 1,
        first_offset: 0,
        layout: ListLayout::ImdbCalendar,
        ready_selector: IMDB_CALENDAR_READY,
    },
    imdb_genre(
        "action",
        "Top Action Movies",
        "/search/title/?genres=action&sort=user_rating,desc&title_type=feature&num_votes=25000,&start={start}",
    ),
    imdb_genre(
        "comedy",
        "Top Comedy Movies",
        "/search/title/?genres=comedy&sort=user_rating,desc&title_type=feature&num_votes=25000,&start={start}",
    ),
    imdb_genre(
        "drama",
        "Top Drama Movies",
        "/search/title/?genres=drama&sort=user_rating,desc&title_type=feature&num_votes=25000,&start={start}",
    ),
    imdb_genre(
        "horror",
        "Top Horror Movies",
        "/search/title/?genres=horror&sort=user_rating,desc&title_type=feature&num_votes=25000,&start={start}",
    ),
    imdb_genre(
        "sci_fi",
        "Top Sci-Fi Movies",
        "/search/title/?genres=sci-fi&sort=user_rating,desc&title_type=feature&num_votes=25000,&start={start}",
    ),
    imdb_genre(
        "thriller",
        "Top Thriller Movies",
        "/search/title/?genres=thriller&sort=user_rating,desc&title_type=feature&num_votes=25000,&start={start}",
    ),
];

/// Returns the closed category catalog of a platform
pub fn catalog(platform: Platform) -> &'static [Category] {
    match platform {
        Platform::Douban => &DOUBAN_CATALOG,
        Platform::Imdb => &IMDB_CATALOG,
    }
}

/// Looks up a category by name (case-insensitive, `-` and `_` equivalent)
pub fn lookup(platform: Platform, name: &str) -> Result<&'static Category, CatalogError> {
    let wanted = name.trim().to_ascii_lowercase().replace('-', "_");
    catalog(platform)
        .iter()
        .find(|category| category.name == wanted)
        .ok_or_else(|| CatalogError::UnknownCategory {
            platform,
            name: name.to_string(),
        })
}
