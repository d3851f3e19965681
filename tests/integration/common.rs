//! Shared fixtures for the integration tests

use cinesift::config::{parse_config, Config};

/// A configuration with no delays, immediate retries and both platforms on
/// plain rendering, pointed at the given base URLs
pub fn test_config(douban_base: &str, imdb_base: &str) -> Config {
    let content = format!(
        r#"
[crawler]
max-movies = 100
max-pages = 10
max-consecutive-page-failures = 2
execution = "sequential"

[user-agent]
pool = ["CinesiftTest/1.0"]

[webdriver]
endpoint = "http://127.0.0.1:1"
ready-timeout-ms = 200
poll-interval-ms = 20

[platforms.douban]
base-url = "{douban_base}"
min-delay-ms = 0
max-delay-ms = 0
max-retries = 3
backoff = "fixed"
backoff-base-ms = 0
request-timeout-ms = 5000
rendering = "plain"

[platforms.imdb]
base-url = "{imdb_base}"
min-delay-ms = 0
max-delay-ms = 0
max-retries = 3
backoff = "fixed"
backoff-base-ms = 0
request-timeout-ms = 5000
rendering = "plain"
"#
    );
    parse_config(&content).expect("test configuration is valid")
}

/// One Douban Top 250 page; `next` is the paginator's next href, if any
pub fn douban_top250_page(ids: &[u32], next: Option<&str>) -> String {
    let mut body = String::from(
        r#"<html><head><title>豆瓣电影 Top 250</title></head><body><ol class="grid_view">"#,
    );
    for id in ids {
        body.push_str(&format!(
            r#"<li><div class="item">
  <div class="pic"><a href="/subject/{id}/"><img src="https://img.doubanio.com/view/photo/{id}.jpg"></a></div>
  <div class="info">
    <div class="hd"><a href="/subject/{id}/"><span class="title">Film {id}</span></a></div>
    <div class="bd">
      <p>导演: Director {id}&nbsp;&nbsp;&nbsp;主演: Actor {id}<br>1994&nbsp;/&nbsp;美国&nbsp;/&nbsp;剧情</p>
      <div class="star"><span class="rating_num">8.5</span><span></span><span>1000人评价</span></div>
    </div>
  </div>
</div></li>"#
        ));
    }
    body.push_str("</ol>");
    body.push_str(r#"<div class="paginator"><span class="thispage">1</span>"#);
    match next {
        Some(href) => body.push_str(&format!(r#"<span class="next"><a href="{href}">后页</a></span>"#)),
        None => body.push_str(r#"<span class="next">后页</span>"#),
    }
    body.push_str("</div></body></html>");
    body
}

/// One Douban chart page; `next_start` adds a paginator link to that offset
pub fn douban_chart_page(ids: &[u32], next_start: Option<u32>) -> String {
    let mut body = String::from(r#"<html><head><title>豆瓣电影排行榜</title></head><body>"#);
    for id in ids {
        body.push_str(&format!(
            r#"<div class="pl2"><a href="/subject/{id}/">Movie {id}</a><p class="pl">2021-05-01(中国大陆) / Someone</p><span class="rating_nums">7.{id}</span></div>"#,
            id = id,
        ));
    }
    if let Some(start) = next_start {
        body.push_str(&format!(
            r#"<div class="paginator"><span class="next"><a href="/chart?type=11&amp;start={start}">后页</a></span></div>"#
        ));
    }
    body.push_str("</body></html>");
    body
}

pub fn douban_detail_page(id: u32) -> String {
    format!(
        r#"<html><head><title>Movie {id} (豆瓣)</title></head><body><div id="content">
<h1><span property="v:itemreviewed">Movie {id}</span> <span class="year">(2021)</span></h1>
<div id="mainpic"><img src="https://img.doubanio.com/view/photo/detail{id}.jpg"></div>
<div id="info">
  <span><span class="pl">导演</span>: <a rel="v:directedBy" href="/celebrity/1/">Director {id}</a></span><br>
  <span><span class="pl">主演</span>: <a rel="v:starring" href="/celebrity/2/">Star {id}</a></span><br>
  <span class="pl">类型:</span> <span property="v:genre">剧情</span> / <span property="v:genre">科幻</span><br>
</div>
<strong property="v:average">8.8</strong><span property="v:votes">54321</span>
<span property="v:summary">A detailed plot for movie {id}.</span>
</div></body></html>"#
    )
}

/// An IMDb chart page in the current list markup
pub fn imdb_chart_page(ids: &[u32]) -> String {
    let mut body = String::from(r#"<html><head><title>Most Popular Movies</title></head><body><ul>"#);
    for (rank, id) in ids.iter().enumerate() {
        body.push_str(&format!(
            r#"<li class="ipc-metadata-list-summary-item">
  <a class="ipc-title-link-wrapper" href="/title/tt{id:07}/?ref_=chtmvm_t_{rank}"><h3 class="ipc-title__text">{rank}. Picture {id}</h3></a>
  <span class="cli-title-metadata-item">2023</span><span class="cli-title-metadata-item">1h 58m</span>
  <span class="ipc-rating-star" aria-label="IMDb rating: 7.1"><span class="ipc-rating-star--rating">7.1</span></span>
</li>"#,
            rank = rank + 1,
        ));
    }
    body.push_str("</ul></body></html>");
    body
}
