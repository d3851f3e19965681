use crate::common::{imdb_chart_page, test_config};
use cinesift::config::Config;
use cinesift::crawler::{plan_jobs, MultiPlatformCoordinator};
use cinesift::output::JobStatus;
use cinesift::{CrawlState, Platform, RenderMode};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SESSION: &str = "4f2c1c6d";

fn wire(value: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "value": value }))
}

/// Mounts a WebDriver that serves `source` for every page
async fn mount_webdriver(server: &MockServer, source: String) {
    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(wire(json!({ "sessionId": SESSION, "capabilities": {} })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/session/{}/timeouts", SESSION)))
        .respond_with(wire(json!(null)))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/session/{}/url", SESSION)))
        .respond_with(wire(json!(null)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/session/{}/source", SESSION)))
        .respond_with(wire(json!(source)))
        .mount(server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("/session/{}", SESSION)))
        .respond_with(wire(json!(null)))
        .expect(1)
        .mount(server)
        .await;
}

/// IMDb on the real host, rendered through the given WebDriver
fn script_config(webdriver: &MockServer) -> Config {
    let mut config = test_config("http://127.0.0.1:1/", "https://www.imdb.com/");
    config.webdriver.endpoint = webdriver.uri();
    config.platform_config_mut(Platform::Imdb).rendering = Some(RenderMode::Script);
    config
}

#[tokio::test]
async fn test_rendered_chart_is_parsed() {
    let webdriver = MockServer::start().await;
    // Mounted first so it takes precedence over the catch-all navigation mock
    Mock::given(method("POST"))
        .and(path(format!("/session/{}/url", SESSION)))
        .and(body_partial_json(json!({ "url": "https://www.imdb.com/chart/moviemeter/" })))
        .respond_with(wire(json!(null)))
        .expect(1)
        .mount(&webdriver)
        .await;
    mount_webdriver(&webdriver, imdb_chart_page(&[111161, 68646])).await;

    let jobs = plan_jobs(&[Platform::Imdb], &[], 10).unwrap();
    let output = MultiPlatformCoordinator::new(script_config(&webdriver)).run(jobs).await;

    assert_eq!(output.records.len(), 2);
    assert_eq!(output.records[0].source_id, "tt0111161");
    assert_eq!(output.records[0].url, "https://www.imdb.com/title/tt0111161/");
    assert_eq!(output.records[1].title, "Picture 68646");

    let imdb = output.summary.platform(Platform::Imdb).unwrap();
    assert_eq!(imdb.status, JobStatus::Completed);
    assert_eq!(output.summary.requests_issued, 1);
}

#[tokio::test]
async fn test_render_timeout_is_retried_then_fails_page() {
    let webdriver = MockServer::start().await;
    mount_webdriver(&webdriver, "<html><body><div>Loading…</div></body></html>".to_string()).await;

    let mut config = script_config(&webdriver);
    config.crawler.max_consecutive_page_failures = 1;
    let jobs = plan_jobs(&[Platform::Imdb], &[], 10).unwrap();
    let output = MultiPlatformCoordinator::new(config).run(jobs).await;

    assert!(output.records.is_empty());
    assert_eq!(output.summary.requests_issued, 3);

    let imdb = output.summary.platform(Platform::Imdb).unwrap();
    assert!(matches!(imdb.status, JobStatus::Partial { .. }));
    assert_eq!(imdb.categories[0].state, CrawlState::Aborted);
    assert_eq!(imdb.stats.pages_failed, 1);
}

#[tokio::test]
async fn test_session_refused_fails_platform() {
    let webdriver = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "value": { "error": "session not created", "message": "Chrome failed to start" }
        })))
        .expect(1)
        .mount(&webdriver)
        .await;

    let jobs = plan_jobs(&[Platform::Imdb], &[], 10).unwrap();
    let output = MultiPlatformCoordinator::new(script_config(&webdriver)).run(jobs).await;

    assert!(output.records.is_empty());
    assert_eq!(output.summary.requests_issued, 0);

    let imdb = output.summary.platform(Platform::Imdb).unwrap();
    match &imdb.status {
        JobStatus::Failed { reason } => assert!(reason.contains("session not created")),
        other => panic!("expected failed job, got {:?}", other),
    }
}
