use crate::common::{douban_chart_page, douban_detail_page, douban_top250_page, imdb_chart_page, test_config};
use cinesift::config::ExecutionMode;
use cinesift::crawler::{plan_jobs, MultiPlatformCoordinator};
use cinesift::output::{load_records, JobStatus, JsonOutputHandler, OutputHandler};
use cinesift::{CrawlState, Platform, RenderMode};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const UNUSED_BASE: &str = "http://127.0.0.1:1/";

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

async fn mount_chart_page(server: &MockServer, start: u32, body: String, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/chart"))
        .and(query_param("type", "11"))
        .and(query_param("start", start.to_string()))
        .respond_with(html(body))
        .expect(expected)
        .mount(server)
        .await;
}

fn categories(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_top250_follows_next_links_to_last_page() {
    let server = MockServer::start().await;

    for page in 0..5u32 {
        let start = page * 25;
        let ids = [page * 2 + 1, page * 2 + 2];
        let next = (page < 4).then(|| format!("?start={}&amp;filter=", start + 25));
        Mock::given(method("GET"))
            .and(path("/top250"))
            .and(query_param("start", start.to_string()))
            .respond_with(html(douban_top250_page(&ids, next.as_deref())))
            .expect(1)
            .mount(&server)
            .await;
    }

    let config = test_config(&server.uri(), UNUSED_BASE);
    let jobs = plan_jobs(&[Platform::Douban], &categories(&["top250"]), 100).unwrap();
    let output = MultiPlatformCoordinator::new(config).run(jobs).await;

    assert_eq!(output.records.len(), 10);
    assert_eq!(output.summary.requests_issued, 5);
    assert_eq!(output.summary.total_records, 10);

    let douban = output.summary.platform(Platform::Douban).unwrap();
    assert_eq!(douban.status, JobStatus::Completed);
    assert_eq!(douban.categories.len(), 1);
    assert_eq!(douban.categories[0].state, CrawlState::Done);
    assert_eq!(douban.stats.pages_fetched, 5);

    let first = &output.records[0];
    assert_eq!(first.source_id, "1");
    assert_eq!(first.title, "Film 1");
    assert_eq!(first.year, Some(1994));
    assert_eq!(first.directors, vec!["Director 1"]);
    assert_eq!(first.actors, vec!["Actor 1"]);
    assert_eq!(first.countries, vec!["美国"]);
    assert!(first.genres.contains("Drama"));
    assert_eq!(first.rating, Some(8.5));
    assert_eq!(first.url, format!("{}/subject/1/", server.uri()));
}

#[tokio::test]
async fn test_movie_cap_counts_accepted_records_only() {
    let server = MockServer::start().await;
    mount_chart_page(&server, 0, douban_chart_page(&[1, 2, 3, 4], Some(25)), 1).await;
    mount_chart_page(&server, 25, douban_chart_page(&[5, 6, 2, 7], Some(50)), 1).await;
    mount_chart_page(&server, 50, douban_chart_page(&[8, 9, 10, 3], Some(75)), 1).await;
    mount_chart_page(&server, 75, douban_chart_page(&[11, 12], None), 0).await;

    let config = test_config(&server.uri(), UNUSED_BASE);
    let jobs = plan_jobs(&[Platform::Douban], &categories(&["hot"]), 10).unwrap();
    let output = MultiPlatformCoordinator::new(config).run(jobs).await;

    assert_eq!(output.records.len(), 10);
    let douban = output.summary.platform(Platform::Douban).unwrap();
    assert_eq!(douban.records, 10);
    assert_eq!(douban.stats.succeeded, 10);
    assert_eq!(douban.stats.duplicates_dropped, 1);
    assert_eq!(output.summary.merge_duplicates_dropped, 0);

    let ids: Vec<&str> = output.records.iter().map(|r| r.source_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3", "4", "5", "6", "7", "8", "9", "10"]);

    // Written records survive a round trip through the output directory
    let dir = tempfile::tempdir().unwrap();
    let handler = JsonOutputHandler::new(dir.path()).unwrap();
    let path = handler.write_records(Platform::Douban, &output.records).unwrap();
    let loaded = load_records(&path).unwrap();
    assert_eq!(loaded, output.records);
    assert!(handler.write_summary(&output.summary).unwrap().exists());
}

#[tokio::test]
async fn test_server_errors_are_retried_then_abort_category() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chart"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let mut config = test_config(&server.uri(), UNUSED_BASE);
    config.crawler.max_consecutive_page_failures = 1;
    let jobs = plan_jobs(&[Platform::Douban], &categories(&["hot"]), 10).unwrap();
    let output = MultiPlatformCoordinator::new(config).run(jobs).await;

    assert!(output.records.is_empty());
    assert_eq!(output.summary.requests_issued, 3);

    let douban = output.summary.platform(Platform::Douban).unwrap();
    assert!(matches!(douban.status, JobStatus::Partial { .. }));
    assert_eq!(douban.categories[0].state, CrawlState::Aborted);
    assert!(douban.categories[0].abort_reason.is_some());
    assert_eq!(output.summary.failure_breakdown.get("page_fetch_failed"), Some(&1));
}

#[tokio::test]
async fn test_transient_error_recovers_on_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chart"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_chart_page(&server, 0, douban_chart_page(&[1, 2, 3], None), 1).await;

    let config = test_config(&server.uri(), UNUSED_BASE);
    let jobs = plan_jobs(&[Platform::Douban], &categories(&["hot"]), 10).unwrap();
    let output = MultiPlatformCoordinator::new(config).run(jobs).await;

    assert_eq!(output.records.len(), 3);
    assert_eq!(output.summary.requests_issued, 2);
    let douban = output.summary.platform(Platform::Douban).unwrap();
    assert_eq!(douban.status, JobStatus::Completed);
    assert_eq!(douban.stats.pages_failed, 0);
}

#[tokio::test]
async fn test_blocked_page_counts_as_page_failure() {
    let server = MockServer::start().await;
    mount_chart_page(
        &server,
        0,
        "<html><head><title>禁止访问</title></head><body>检测到有异常请求</body></html>".to_string(),
        1,
    )
    .await;

    let mut config = test_config(&server.uri(), UNUSED_BASE);
    config.crawler.max_consecutive_page_failures = 1;
    let jobs = plan_jobs(&[Platform::Douban], &categories(&["hot"]), 10).unwrap();
    let output = MultiPlatformCoordinator::new(config).run(jobs).await;

    assert!(output.records.is_empty());
    assert_eq!(output.summary.requests_issued, 1);
    assert_eq!(output.summary.failure_breakdown.get("page_blocked"), Some(&1));
}

#[tokio::test]
async fn test_setup_failure_isolated_to_one_platform() {
    let douban = MockServer::start().await;
    mount_chart_page(&douban, 0, douban_chart_page(&[1, 2], None), 1).await;

    // IMDb renders through a WebDriver endpoint nobody listens on
    let mut config = test_config(&douban.uri(), UNUSED_BASE);
    config.crawler.execution = ExecutionMode::Concurrent;
    config.platform_config_mut(Platform::Imdb).rendering = Some(RenderMode::Script);

    let jobs = plan_jobs(&Platform::ALL, &categories(&["hot", "popular"]), 10).unwrap();
    assert_eq!(jobs.len(), 2);
    let output = MultiPlatformCoordinator::new(config).run(jobs).await;

    assert_eq!(output.records.len(), 2);
    assert!(output.records.iter().all(|r| r.platform == Platform::Douban));

    let imdb = output.summary.platform(Platform::Imdb).unwrap();
    assert!(imdb.status.is_failed());
    assert_eq!(imdb.records, 0);

    let douban_summary = output.summary.platform(Platform::Douban).unwrap();
    assert_eq!(douban_summary.status, JobStatus::Completed);
    assert_eq!(output.summary.failed_platforms(), vec![Platform::Imdb]);
    assert_eq!(output.summary.failure_breakdown.get("platform_failed"), Some(&1));
}

#[tokio::test]
async fn test_detail_pages_enrich_listing_records() {
    let server = MockServer::start().await;
    mount_chart_page(&server, 0, douban_chart_page(&[1, 2], None), 1).await;
    Mock::given(method("GET"))
        .and(path("/subject/1/"))
        .respond_with(html(douban_detail_page(1)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/subject/2/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&server)
        .await;

    let mut config = test_config(&server.uri(), UNUSED_BASE);
    config.platform_config_mut(Platform::Douban).fetch_details = true;
    let jobs = plan_jobs(&[Platform::Douban], &categories(&["hot"]), 10).unwrap();
    let output = MultiPlatformCoordinator::new(config).run(jobs).await;

    assert_eq!(output.records.len(), 2);

    let enriched = &output.records[0];
    assert_eq!(enriched.source_id, "1");
    let genres: Vec<&str> = enriched.genres.iter().map(String::as_str).collect();
    assert_eq!(genres, vec!["Drama", "Sci-Fi"]);
    assert_eq!(enriched.directors, vec!["Director 1"]);
    assert_eq!(enriched.actors, vec!["Star 1"]);
    assert_eq!(enriched.rating, Some(8.8));
    assert_eq!(enriched.rating_count, Some(54321));
    assert_eq!(enriched.plot.as_deref(), Some("A detailed plot for movie 1."));

    // The failed detail keeps what the listing offered
    let listing_only = &output.records[1];
    assert_eq!(listing_only.title, "Movie 2");
    assert!(listing_only.genres.is_empty());

    let douban = output.summary.platform(Platform::Douban).unwrap();
    assert_eq!(douban.stats.detail_fetch_failures, 1);
    assert_eq!(douban.status, JobStatus::Completed);
}

#[tokio::test]
async fn test_connection_probe_reports_status() {
    let douban = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<html><title>豆瓣电影</title></html>".to_string()))
        .expect(1)
        .mount(&douban)
        .await;

    let imdb = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&imdb)
        .await;

    let config = test_config(&douban.uri(), &imdb.uri());
    let coordinator = MultiPlatformCoordinator::new(config);

    let ok = coordinator.test_connection(Platform::Douban).await;
    assert!(ok.reachable);
    assert_eq!(ok.status, Some(200));
    assert!(ok.latency.is_some());

    let blocked = coordinator.test_connection(Platform::Imdb).await;
    assert!(!blocked.reachable);
    assert_eq!(blocked.status, Some(403));

    assert_eq!(coordinator.context().request_count(), 2);
}

#[tokio::test]
async fn test_plain_imdb_chart_crawl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chart/moviemeter/"))
        .respond_with(html(imdb_chart_page(&[111161, 68646, 468569])))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(UNUSED_BASE, &server.uri());
    let jobs = plan_jobs(&[Platform::Imdb], &[], 50).unwrap();
    let output = MultiPlatformCoordinator::new(config).run(jobs).await;

    assert_eq!(output.records.len(), 3);
    assert_eq!(output.records[0].source_id, "tt0111161");
    assert_eq!(output.records[0].title, "Picture 111161");
    assert_eq!(output.records[0].year, Some(2023));
    assert_eq!(output.summary.requests_issued, 1);
}
