//! Script rendering through a WebDriver session
//!
//! Some listing pages only carry their items after client-side scripts run.
//! `BrowserMechanism` drives a remote browser over the W3C WebDriver wire
//! protocol: it opens one session per platform job, navigates to each target
//! and polls the page source until the target's ready selector matches.

use crate::config::WebDriverConfig;
use crate::crawler::fetcher::{AttemptError, FetchMechanism, FetchTarget};
use async_trait::async_trait;
use reqwest::{Client, Method};
use scraper::{Html, Selector};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use url::Url;

/// Resolved WebDriver settings
#[derive(Debug, Clone, PartialEq)]
pub struct WebDriverSettings {
    pub endpoint: Url,
    pub ready_timeout: Duration,
    pub poll_interval: Duration,
    pub headless: bool,
}

impl WebDriverSettings {
    pub fn from_config(config: &WebDriverConfig) -> Result<Self, url::ParseError> {
        Ok(Self {
            endpoint: Url::parse(&config.endpoint)?,
            ready_timeout: Duration::from_millis(config.ready_timeout_ms),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            headless: config.headless,
        })
    }

    fn browser_args(&self, user_agent: &str) -> Vec<String> {
        let mut args = Vec::new();
        if self.headless {
            args.push("--headless=new".to_string());
        }
        args.extend(
            [
                "--no-sandbox",
                "--disable-dev-shm-usage",
                "--disable-gpu",
                "--window-size=1366,768",
            ]
            .iter()
            .map(|arg| arg.to_string()),
        );
        args.push(format!("--user-agent={}", user_agent));
        args
    }
}

/// A live browser session used as a fetch mechanism
///
/// The user agent is fixed when the session opens, so the per-attempt agent
/// passed by `FetchClient` is ignored.
#[derive(Debug)]
pub struct BrowserMechanism {
    client: Client,
    settings: WebDriverSettings,
    session_url: String,
    released: AtomicBool,
}

impl BrowserMechanism {
    /// Opens a browser session. Any failure here is a setup error.
    pub async fn open(
        settings: WebDriverSettings,
        user_agent: &str,
        request_timeout: Duration,
    ) -> Result<Self, AttemptError> {
        let client = Client::builder()
            .timeout(request_timeout + Duration::from_secs(5))
            .build()
            .map_err(|e| AttemptError::Setup(format!("cannot build WebDriver client: {}", e)))?;

        let endpoint = settings.endpoint.as_str().trim_end_matches('/').to_string();
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": settings.browser_args(user_agent) }
                }
            }
        });

        let created = send_command(
            &client,
            Method::POST,
            &format!("{}/session", endpoint),
            Some(&capabilities),
        )
        .await
        .map_err(into_setup)?;

        let session_id = created
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| AttemptError::Setup("WebDriver returned no session id".to_string()))?;
        let session_url = format!("{}/session/{}", endpoint, session_id);

        let timeouts = json!({ "pageLoad": request_timeout.as_millis() as u64 });
        send_command(
            &client,
            Method::POST,
            &format!("{}/timeouts", session_url),
            Some(&timeouts),
        )
        .await
        .map_err(into_setup)?;

        tracing::info!(session = %session_id, endpoint = %endpoint, "Browser session opened");

        Ok(Self {
            client,
            settings,
            session_url,
            released: AtomicBool::new(false),
        })
    }

    async fn navigate(&self, url: &Url) -> Result<(), AttemptError> {
        let body = json!({ "url": url.as_str() });
        send_command(
            &self.client,
            Method::POST,
            &format!("{}/url", self.session_url),
            Some(&body),
        )
        .await
        .map(|_| ())
    }

    async fn page_source(&self) -> Result<String, AttemptError> {
        let value = send_command(
            &self.client,
            Method::GET,
            &format!("{}/source", self.session_url),
            None,
        )
        .await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AttemptError::Malformed("page source is not a string".to_string()))
    }
}

#[async_trait]
impl FetchMechanism for BrowserMechanism {
    async fn attempt(&self, target: &FetchTarget, _user_agent: &str) -> Result<String, AttemptError> {
        if self.released.load(Ordering::SeqCst) {
            return Err(AttemptError::Setup("browser session already closed".to_string()));
        }

        self.navigate(&target.url).await?;

        let deadline = Instant::now() + self.settings.ready_timeout;
        loop {
            let source = self.page_source().await?;
            let ready = match target.ready_selector.as_deref() {
                Some(selector) => source_is_ready(&source, selector),
                None => !source.trim().is_empty(),
            };
            if ready {
                return Ok(source);
            }
            if Instant::now() >= deadline {
                return Err(AttemptError::RenderTimeout {
                    selector: target.ready_selector.clone().unwrap_or_default(),
                    timeout_ms: self.settings.ready_timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    async fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        match send_command(&self.client, Method::DELETE, &self.session_url, None).await {
            Ok(_) => tracing::info!("Browser session closed"),
            Err(e) => tracing::warn!(error = %e, "Failed to close browser session"),
        }
    }
}

/// Whether the page source contains an element matching `selector`.
/// An unparsable selector never blocks the page.
fn source_is_ready(source: &str, selector: &str) -> bool {
    let Ok(selector) = Selector::parse(selector) else {
        return true;
    };
    let document = Html::parse_document(source);
    let ready = document.select(&selector).next().is_some();
    ready
}

/// Sends one WebDriver command and unwraps the `value` envelope
async fn send_command(
    client: &Client,
    method: Method,
    url: &str,
    body: Option<&Value>,
) -> Result<Value, AttemptError> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(body);
    }

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            AttemptError::Timeout
        } else if e.is_connect() {
            AttemptError::Setup(format!("WebDriver endpoint unreachable: {}", e))
        } else {
            AttemptError::Network(e.to_string())
        }
    })?;

    let status = response.status();
    let payload: Value = response
        .json()
        .await
        .map_err(|e| AttemptError::Malformed(format!("WebDriver reply: {}", e)))?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);

    if status.is_success() {
        Ok(value)
    } else {
        Err(wire_error(status.as_u16(), &value))
    }
}

/// Maps a WebDriver error payload onto an attempt error
fn wire_error(status: u16, value: &Value) -> AttemptError {
    let error = value.get("error").and_then(Value::as_str).unwrap_or("");
    let message = value.get("message").and_then(Value::as_str).unwrap_or("");
    match error {
        "invalid session id" | "session not created" => {
            AttemptError::Setup(format!("{}: {}", error, message))
        }
        "timeout" | "script timeout" => AttemptError::Timeout,
        "" => AttemptError::Status(status),
        _ => AttemptError::Network(format!("{}: {}", error, message)),
    }
}

fn into_setup(error: AttemptError) -> AttemptError {
    match error {
        AttemptError::Setup(_) => error,
        other => AttemptError::Setup(other.to_string()),
    }
}
