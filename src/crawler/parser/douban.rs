use super::{
    all_texts, anchor_fallback, canonical_url, check_blocked, element_lines, element_text, first,
    first_attr, first_text, rel_next, select_all, split_title, ItemParseError, PageParseError,
    PageParser, PaginationInfo, ParsedPage,
};
use crate::crawler::fetcher::PageContent;
use crate::platform::{Category, ListLayout, Platform};
use crate::record::CandidateRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use url::Url;

/// Title fragments of Douban's anti-bot interstitials
const BLOCK_MARKERS: &[&str] = &["验证", "禁止访问"];
const TAG_LIMIT: usize = 15;

static INFO_COUNTRIES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"制片国家/地区:\s*([^\n]+)").expect("valid countries regex"));
static INFO_LANGUAGES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"语言:\s*([^\n]+)").expect("valid languages regex"));
static INFO_AKA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"又名:\s*([^\n]+)").expect("valid aka regex"));
static INFO_WRITERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"编剧:\s*([^\n]+)").expect("valid writers regex"));
static INFO_IMDB: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"IMDb:\s*(tt\d+)").expect("valid imdb regex"));
static TRAILING_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\(\d{4}\).*$").expect("valid trailing year regex"));

/// Parser for movie.douban.com listings and subject pages
#[derive(Debug, Clone, Default)]
pub struct DoubanParser;

impl DoubanParser {
    pub fn new() -> Self {
        Self
    }

    /// Items of the Top 250 grid (`ol.grid_view`)
    fn top250_items(
        &self,
        document: &Html,
        page: &PageContent,
    ) -> Vec<Result<CandidateRecord, ItemParseError>> {
        let root = document.root_element();
        let mut containers = select_all(root, "ol.grid_view li");
        if containers.is_empty() {
            containers = select_all(root, "div.item");
        }

        containers
            .into_iter()
            .enumerate()
            .map(|(index, item)| self.top250_item(index, item, page))
            .collect()
    }

    fn top250_item(
        &self,
        index: usize,
        item: ElementRef,
        page: &PageContent,
    ) -> Result<CandidateRecord, ItemParseError> {
        let href = first_attr(item, "div.hd a", "href")
            .or_else(|| first_attr(item, "a[href*=\"/subject/\"]", "href"));
        let mut record = identified(index, href.as_deref(), &page.url)?;
        record.captured_at = Some(page.fetched_at);

        let titles = all_texts(item, "span.title");
        record.title = titles.first().cloned();
        record.original_title = titles
            .get(1)
            .map(|t| t.trim_start_matches('/').trim().to_string())
            .filter(|t| !t.is_empty());

        record.rating = first_text(item, "span.rating_num");
        record.rating_count = select_all(item, "div.star span")
            .into_iter()
            .map(element_text)
            .find(|text| text.contains("人评价"));

        if let Some(bd) = first(item, "div.bd p") {
            for line in element_lines(bd) {
                if line.contains("导演") {
                    apply_crew_line(&line, &mut record);
                } else if line.starts_with(|c: char| c.is_ascii_digit()) {
                    apply_release_line(&line, &mut record);
                }
            }
        }

        record.plot = first_text(item, "span.inq");
        record.poster_url = first_attr(item, "div.pic img", "src");
        Ok(record)
    }

    /// Items of chart and ranking pages (`tr.item`, then `div.pl2`, then bare
    /// subject links)
    fn chart_items(
        &self,
        document: &Html,
        page: &PageContent,
    ) -> Vec<Result<CandidateRecord, ItemParseError>> {
        let root = document.root_element();
        let mut containers = select_all(root, "tr.item");
        if containers.is_empty() {
            containers = select_all(root, "div.pl2");
        }

        if containers.is_empty() {
            return anchor_fallback(document, Platform::Douban, &page.url)
                .into_iter()
                .map(|mut record| {
                    record.captured_at = Some(page.fetched_at);
                    Ok(record)
                })
                .collect();
        }

        containers
            .into_iter()
            .enumerate()
            .map(|(index, item)| self.chart_item(index, item, page))
            .collect()
    }

    fn chart_item(
        &self,
        index: usize,
        item: ElementRef,
        page: &PageContent,
    ) -> Result<CandidateRecord, ItemParseError> {
        let anchor = first(item, "div.pl2 a[href]").or_else(|| first(item, "a[href*=\"/subject/\"]"));
        let href = anchor.and_then(|a| a.value().attr("href"));
        let mut record = identified(index, href, &page.url)?;
        record.captured_at = Some(page.fetched_at);

        if let Some(anchor) = anchor {
            let (title, original) = split_title(&element_text(anchor));
            record.title = title;
            record.original_title = original;
        }

        if let Some(line) = first_text(item, "p.pl") {
            let released = line.split('/').next().unwrap_or_default().trim().to_string();
            if !released.is_empty() {
                record.year = Some(released.clone());
                record.release_date = Some(released);
            }
        }

        record.rating = first_text(item, "span.rating_nums");
        record.rating_count = first_text(item, "div.star span.pl");
        record.poster_url = first_attr(item, "a.nbg img", "src");
        Ok(record)
    }

    fn pagination(&self, document: &Html, item_count: usize, category: &Category) -> PaginationInfo {
        if item_count == 0 {
            return PaginationInfo::end();
        }

        let root = document.root_element();
        if first(root, "div.paginator").is_some() {
            return match first_attr(root, "div.paginator span.next a", "href") {
                Some(href) => PaginationInfo::more(Some(href)),
                None => PaginationInfo::end(),
            };
        }

        if let Some(href) = rel_next(document) {
            return PaginationInfo::more(Some(href));
        }

        if item_count >= category.page_size as usize {
            PaginationInfo::more(None)
        } else {
            PaginationInfo::end()
        }
    }
}

impl PageParser for DoubanParser {
    fn platform(&self) -> Platform {
        Platform::Douban
    }

    fn parse(&self, page: &PageContent, category: &Category) -> Result<ParsedPage, PageParseError> {
        let document = Html::parse_document(&page.body);
        check_blocked(&document, BLOCK_MARKERS)?;

        let items = match category.layout {
            ListLayout::DoubanTop250 => self.top250_items(&document, page),
            _ => self.chart_items(&document, page),
        };
        let pagination = self.pagination(&document, items.len(), category);

        Ok(ParsedPage { items, pagination })
    }

    fn parse_detail(&self, page: &PageContent) -> Result<CandidateRecord, ItemParseError> {
        let document = Html::parse_document(&page.body);
        let root = document.root_element();
        let mut record = CandidateRecord::new(Platform::Douban);
        record.captured_at = Some(page.fetched_at);

        record.source_id = Platform::Douban.extract_source_id(page.url.path());
        record.url = record
            .source_id
            .as_deref()
            .and_then(|id| canonical_url(Platform::Douban, &page.url, id));

        record.title = first_text(root, "span[property=\"v:itemreviewed\"]").or_else(|| {
            first_text(root, "#content h1")
                .map(|h1| TRAILING_YEAR.replace(&h1, "").trim().to_string())
                .filter(|t| !t.is_empty())
        });
        record.year = first_text(root, "span.year");

        record.rating = first_text(root, "strong[property=\"v:average\"]");
        record.rating_count = first_text(root, "span[property=\"v:votes\"]")
            .or_else(|| first_text(root, "a.rating_people"));
        let distribution = all_texts(root, "span.rating_per");
        if distribution.len() >= 5 {
            record.rating_distribution = distribution.into_iter().take(5).collect();
        }

        record.directors = all_texts(root, "a[rel=\"v:directedBy\"]");
        record.actors = all_texts(root, "a[rel=\"v:starring\"]")
            .into_iter()
            .take(Platform::Douban.actor_limit())
            .collect();
        record.genres = all_texts(root, "span[property=\"v:genre\"]");
        record.release_date = first_text(root, "span[property=\"v:initialReleaseDate\"]");
        record.runtime = first_text(root, "span[property=\"v:runtime\"]");

        if let Some(info) = first(root, "#info") {
            let text: String = info.text().collect();
            record.countries = captured_list(&INFO_COUNTRIES, &text);
            record.languages = captured_list(&INFO_LANGUAGES, &text);
            record.writers = captured_list(&INFO_WRITERS, &text);
            record.original_title = captured_list(&INFO_AKA, &text).into_iter().next();
            record.imdb_id = INFO_IMDB
                .captures(&text)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string());
        }

        record.plot = first(root, "span.all.hidden")
            .or_else(|| first(root, "span[property=\"v:summary\"]"))
            .map(|summary| summary.inner_html());
        record.poster_url = first_attr(root, "#mainpic img", "src");

        let mut tags = all_texts(root, "div.tags-body a");
        if tags.is_empty() {
            tags = all_texts(root, "a.tag");
        }
        record.tags = tags.into_iter().take(TAG_LIMIT).collect();

        if record.title.is_none() && record.rating.is_none() {
            return Err(ItemParseError::EmptyDetail {
                url: page.url.to_string(),
            });
        }
        Ok(record)
    }
}

/// Starts a record from an item's link, or fails when there is none
fn identified(index: usize, href: Option<&str>, page_url: &Url) -> Result<CandidateRecord, ItemParseError> {
    let id = href
        .and_then(|href| Platform::Douban.extract_source_id(href))
        .ok_or(ItemParseError::MissingLink { index })?;

    let mut record = CandidateRecord::new(Platform::Douban);
    record.url = canonical_url(Platform::Douban, page_url, &id);
    record.source_id = Some(id);
    Ok(record)
}

/// Text after the first `:` (half or full width)
fn after_label(text: &str) -> &str {
    match text.find([':', '：']) {
        Some(pos) => {
            let rest = &text[pos..];
            rest.trim_start_matches([':', '：']).trim()
        }
        None => text.trim(),
    }
}

fn slash_list(text: &str) -> Vec<String> {
    text.split('/')
        .map(str::trim)
        .filter(|part| !part.is_empty() && *part != "..." && *part != "…")
        .map(str::to_string)
        .collect()
}

/// `导演: A / B   主演: C / D / ...`
fn apply_crew_line(line: &str, record: &mut CandidateRecord) {
    let (director_part, actor_part) = match line.find("主演") {
        Some(pos) => (&line[..pos], Some(&line[pos..])),
        None => (line, None),
    };

    record.directors = slash_list(after_label(director_part));
    if let Some(actors) = actor_part {
        record.actors = slash_list(after_label(actors))
            .into_iter()
            .take(Platform::Douban.actor_limit())
            .collect();
    }
}

/// `1994 / 美国 / 犯罪 剧情`
fn apply_release_line(line: &str, record: &mut CandidateRecord) {
    let parts: Vec<&str> = line.split('/').map(str::trim).collect();
    if let Some(year) = parts.first() {
        record.year = Some(year.to_string());
    }
    if let Some(countries) = parts.get(1) {
        record.countries = countries.split_whitespace().map(str::to_string).collect();
    }
    if let Some(genres) = parts.get(2) {
        record.genres = genres.split_whitespace().map(str::to_string).collect();
    }
}

fn captured_list(pattern: &Regex, text: &str) -> Vec<String> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| slash_list(m.as_str()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::lookup;

    fn page(url: &str, body: &str) -> PageContent {
        PageContent::new(Url::parse(url).unwrap(), body)
    }

    const TOP250_PAGE: &str = r#"<html><head><title>豆瓣电影 Top 250</title></head><body>
<ol class="grid_view">
  <li><div class="item">
    <div class="pic"><a href="https://movie.douban.com/subject/1292052/"><img src="https://img.doubanio.com/p480747492.jpg"></a></div>
    <div class="info">
      <div class="hd"><a href="https://movie.douban.com/subject/1292052/">
        <span class="title">肖申克的救赎</span><span class="title">&nbsp;/&nbsp;The Shawshank Redemption</span>
      </a></div>
      <div class="bd">
        <p>
          导演: 弗兰克·德拉邦特 Frank Darabont&nbsp;&nbsp;&nbsp;主演: 蒂姆·罗宾斯 Tim Robbins /...<br>
          1994&nbsp;/&nbsp;美国&nbsp;/&nbsp;犯罪 剧情
        </p>
        <div class="star"><span class="rating5-t"></span><span class="rating_num">9.7</span><span></span><span>2900000人评价</span></div>
        <p class="quote"><span class="inq">希望让人自由。</span></p>
      </div>
    </div>
  </div></li>
  <li><div class="item"><div class="info"><div class="hd"><span class="title">No link</span></div></div></div></li>
</ol>
<div class="paginator"><span class="thispage">1</span><span class="next"><a href="?start=25&amp;filter=">后页&gt;</a></span></div>
</body></html>"#;

    #[test]
    fn test_top250_line_break_without_newline() {
        let body = r#"<html><head><title>豆瓣电影 Top 250</title></head><body><ol class="grid_view">
<li><div class="item"><div class="info">
  <div class="hd"><a href="/subject/1292052/"><span class="title">肖申克的救赎</span></a></div>
  <div class="bd"><p>导演: 弗兰克·德拉邦特&nbsp;&nbsp;&nbsp;主演: 蒂姆·罗宾斯<br>1994&nbsp;/&nbsp;美国&nbsp;/&nbsp;犯罪 剧情</p></div>
</div></div></li>
</ol></body></html>"#;
        let category = lookup(Platform::Douban, "top250").unwrap();
        let parsed = DoubanParser::new()
            .parse(&page("https://movie.douban.com/top250?start=0&filter=", body), category)
            .unwrap();

        let first = parsed.items[0].as_ref().unwrap();
        assert_eq!(first.directors, vec!["弗兰克·德拉邦特"]);
        assert_eq!(first.actors, vec!["蒂姆·罗宾斯"]);
        assert_eq!(first.year.as_deref(), Some("1994"));
        assert_eq!(first.countries, vec!["美国"]);
        assert_eq!(first.genres, vec!["犯罪", "剧情"]);
    }

    #[test]
    fn test_parse_top250_page() {
        let category = lookup(Platform::Douban, "top250").unwrap();
        let parsed = DoubanParser::new()
            .parse(&page("https://movie.douban.com/top250?start=0&filter=", TOP250_PAGE), category)
            .unwrap();

        assert_eq!(parsed.items.len(), 2);
        let first = parsed.items[0].as_ref().unwrap();
        assert_eq!(first.source_id.as_deref(), Some("1292052"));
        assert_eq!(first.url.as_deref(), Some("https://movie.douban.com/subject/1292052/"));
        assert_eq!(first.title.as_deref(), Some("肖申克的救赎"));
        assert_eq!(first.original_title.as_deref(), Some("The Shawshank Redemption"));
        assert_eq!(first.rating.as_deref(), Some("9.7"));
        assert_eq!(first.rating_count.as_deref(), Some("2900000人评价"));
        assert_eq!(first.directors, vec!["弗兰克·德拉邦特 Frank Darabont"]);
        assert_eq!(first.actors, vec!["蒂姆·罗宾斯 Tim Robbins"]);
        assert_eq!(first.year.as_deref(), Some("1994"));
        assert_eq!(first.countries, vec!["美国"]);
        assert_eq!(first.genres, vec!["犯罪", "剧情"]);
        assert_eq!(first.plot.as_deref(), Some("希望让人自由。"));
        assert!(first.poster_url.is_some());

        assert_eq!(parsed.items[1], Err(ItemParseError::MissingLink { index: 1 }));

        assert!(parsed.pagination.has_more);
        assert_eq!(parsed.pagination.next_page_token.as_deref(), Some("?start=25&filter="));
    }

    #[test]
    fn test_last_top250_page_has_no_next() {
        let body = TOP250_PAGE.replace(
            r#"<span class="next"><a href="?start=25&amp;filter=">后页&gt;</a></span>"#,
            r#"<span class="next">后页&gt;</span>"#,
        );
        let category = lookup(Platform::Douban, "top250").unwrap();
        let parsed = DoubanParser::new()
            .parse(&page("https://movie.douban.com/top250?start=225&filter=", &body), category)
            .unwrap();
        assert!(!parsed.pagination.has_more);
    }

    const CHART_PAGE: &str = r#"<html><head><title>豆瓣电影排行榜</title></head><body>
<table><tr class="item">
  <td><a class="nbg" href="https://movie.douban.com/subject/35267208/"><img src="https://img.doubanio.com/p1.jpg"></a></td>
  <td><div class="pl2">
    <a href="https://movie.douban.com/subject/35267208/">流浪地球2 / <span>The Wandering Earth II</span></a>
    <p class="pl">2023-01-22(中国大陆) / 吴京 / 刘德华</p>
    <div class="star clearfix"><span class="allstar40"></span><span class="rating_nums">8.3</span><span class="pl">(1200000人评价)</span></div>
  </div></td>
</tr></table>
</body></html>"#;

    #[test]
    fn test_parse_chart_table() {
        let category = lookup(Platform::Douban, "hot").unwrap();
        let parsed = DoubanParser::new()
            .parse(&page("https://movie.douban.com/chart?type=11&start=0", CHART_PAGE), category)
            .unwrap();

        assert_eq!(parsed.items.len(), 1);
        let item = parsed.items[0].as_ref().unwrap();
        assert_eq!(item.source_id.as_deref(), Some("35267208"));
        assert_eq!(item.title.as_deref(), Some("流浪地球2"));
        assert_eq!(item.original_title.as_deref(), Some("The Wandering Earth II"));
        assert_eq!(item.release_date.as_deref(), Some("2023-01-22(中国大陆)"));
        assert_eq!(item.rating.as_deref(), Some("8.3"));
        assert_eq!(item.rating_count.as_deref(), Some("(1200000人评价)"));
        assert_eq!(item.poster_url.as_deref(), Some("https://img.doubanio.com/p1.jpg"));

        // Short page without explicit pagination ends the listing
        assert!(!parsed.pagination.has_more);
    }

    #[test]
    fn test_full_chart_page_without_links_assumes_more() {
        let mut body = String::from("<html><head><title>排行榜</title></head><body>");
        for id in 0..25 {
            body.push_str(&format!(
                r#"<div class="pl2"><a href="/subject/{}/">Movie {}</a></div>"#,
                1000 + id,
                id
            ));
        }
        body.push_str("</body></html>");

        let category = lookup(Platform::Douban, "hot").unwrap();
        let parsed = DoubanParser::new()
            .parse(&page("http://127.0.0.1:4000/chart?type=11&start=0", &body), category)
            .unwrap();

        assert_eq!(parsed.ok_count(), 25);
        assert_eq!(
            parsed.items[0].as_ref().unwrap().url.as_deref(),
            Some("http://127.0.0.1:4000/subject/1000/")
        );
        assert_eq!(parsed.pagination, PaginationInfo::more(None));
    }

    #[test]
    fn test_chart_falls_back_to_subject_links() {
        let body = r#"<html><head><title>分类排行榜</title></head><body>
            <a href="https://movie.douban.com/subject/1/">One</a>
            <a href="https://movie.douban.com/subject/1/">One</a>
            <a href="https://movie.douban.com/subject/2/">Two</a>
        </body></html>"#;
        let category = lookup(Platform::Douban, "comedy").unwrap();
        let parsed = DoubanParser::new()
            .parse(&page("https://movie.douban.com/typerank?type=24", body), category)
            .unwrap();
        assert_eq!(parsed.ok_count(), 2);
    }

    #[test]
    fn test_verification_page_is_blocked() {
        let body = "<html><head><title>豆瓣 - 安全验证</title></head><body></body></html>";
        let category = lookup(Platform::Douban, "hot").unwrap();
        let result = DoubanParser::new().parse(&page("https://movie.douban.com/chart", body), category);
        assert!(matches!(result, Err(PageParseError::Blocked { .. })));
    }

    const DETAIL_PAGE: &str = r#"<html><head><title>肖申克的救赎 (豆瓣)</title></head><body>
<div id="content">
  <h1><span property="v:itemreviewed">肖申克的救赎 The Shawshank Redemption</span><span class="year">(1994)</span></h1>
  <div id="mainpic"><a class="nbgnbg"><img src="https://img.doubanio.com/p480747492.jpg"></a></div>
  <div id="info">
    <span><span class="pl">导演</span>: <a href="/celebrity/1047973/" rel="v:directedBy">弗兰克·德拉邦特</a></span><br/>
    <span><span class="pl">编剧</span>: <span class="attrs"><a>弗兰克·德拉邦特</a> / <a>斯蒂芬·金</a></span></span><br/>
    <span class="actor"><span class="pl">主演</span>: <a rel="v:starring">蒂姆·罗宾斯</a> / <a rel="v:starring">摩根·弗里曼</a></span><br/>
    <span class="pl">类型:</span> <span property="v:genre">剧情</span> / <span property="v:genre">犯罪</span><br/>
    <span class="pl">制片国家/地区:</span> 美国<br/>
    <span class="pl">语言:</span> 英语<br/>
    <span class="pl">上映日期:</span> <span property="v:initialReleaseDate" content="1994-09-10">1994-09-10(多伦多电影节)</span><br/>
    <span class="pl">片长:</span> <span property="v:runtime" content="142">142分钟</span><br/>
    <span class="pl">又名:</span> 月黑高飞(港) / 刺激1995(台)<br/>
    <span class="pl">IMDb:</span> tt0111161<br/>
  </div>
  <strong class="ll rating_num" property="v:average">9.7</strong>
  <span property="v:votes">2900000</span>
  <span class="rating_per">85.2%</span><span class="rating_per">13.0%</span><span class="rating_per">1.6%</span><span class="rating_per">0.1%</span><span class="rating_per">0.1%</span>
  <span property="v:summary">　　一场谋杀案使银行家安迪蒙冤入狱。<br/>　　希望让人自由。</span>
  <div class="tags-body"><a>经典</a><a>励志</a></div>
</div>
</body></html>"#;

    #[test]
    fn test_parse_detail_page() {
        let record = DoubanParser::new()
            .parse_detail(&page("https://movie.douban.com/subject/1292052/", DETAIL_PAGE))
            .unwrap();

        assert_eq!(record.source_id.as_deref(), Some("1292052"));
        assert_eq!(record.title.as_deref(), Some("肖申克的救赎 The Shawshank Redemption"));
        assert_eq!(record.year.as_deref(), Some("(1994)"));
        assert_eq!(record.rating.as_deref(), Some("9.7"));
        assert_eq!(record.rating_count.as_deref(), Some("2900000"));
        assert_eq!(record.rating_distribution.len(), 5);
        assert_eq!(record.directors, vec!["弗兰克·德拉邦特"]);
        assert_eq!(record.actors, vec!["蒂姆·罗宾斯", "摩根·弗里曼"]);
        assert_eq!(record.writers, vec!["弗兰克·德拉邦特", "斯蒂芬·金"]);
        assert_eq!(record.genres, vec!["剧情", "犯罪"]);
        assert_eq!(record.countries, vec!["美国"]);
        assert_eq!(record.languages, vec!["英语"]);
        assert_eq!(record.original_title.as_deref(), Some("月黑高飞(港)"));
        assert_eq!(record.imdb_id.as_deref(), Some("tt0111161"));
        assert_eq!(record.runtime.as_deref(), Some("142分钟"));
        assert_eq!(record.release_date.as_deref(), Some("1994-09-10(多伦多电影节)"));
        assert!(record.plot.as_deref().unwrap().contains("安迪"));
        assert_eq!(record.tags, vec!["经典", "励志"]);
        assert_eq!(
            record.poster_url.as_deref(),
            Some("https://img.doubanio.com/p480747492.jpg")
        );
    }

    #[test]
    fn test_empty_detail_page() {
        let result = DoubanParser::new().parse_detail(&page(
            "https://movie.douban.com/subject/1/",
            "<html><head><title>页面不存在</title></head><body></body></html>",
        ));
        assert!(matches!(result, Err(ItemParseError::EmptyDetail { .. })));
    }

    #[test]
    fn test_after_label() {
        assert_eq!(after_label("导演: 张艺谋 "), "张艺谋");
        assert_eq!(after_label("主演：巩俐"), "巩俐");
        assert_eq!(after_label("no label"), "no label");
    }
}
