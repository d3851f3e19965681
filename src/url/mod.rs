//! URL helpers: link resolution and platform URL-shape checks

use crate::platform::Platform;
use regex::Regex;
use url::Url;

/// Resolves an href found on a page against the page URL
///
/// Returns `None` for empty hrefs, fragment-only anchors, non-navigational
/// schemes (`javascript:`, `mailto:` and the like) and anything that does not
/// resolve to an http(s) URL.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    base_url
        .join(href)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

/// Host pattern accepted for a base URL: `www.imdb.com` also admits
/// `m.imdb.com` and the bare `imdb.com`
fn host_pattern(base: &Url) -> String {
    let host = base.host_str().unwrap_or_default().to_ascii_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) => format!("*.{}", rest),
        None => host,
    }
}

fn host_matches(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => candidate == base || candidate.ends_with(&format!(".{}", base)),
        None => candidate == pattern,
    }
}

/// The URL shape of a platform's movie detail pages
#[derive(Debug, Clone)]
pub struct UrlShape {
    host_pattern: String,
    port: Option<u16>,
    path: &'static Regex,
}

impl UrlShape {
    /// Detail-page shape for `platform` served under `base`
    pub fn for_platform(platform: Platform, base: &Url) -> Self {
        Self {
            host_pattern: host_pattern(base),
            port: base.port_or_known_default(),
            path: platform.detail_path_pattern(),
        }
    }

    /// Checks scheme, host, port and path of `candidate`
    pub fn matches(&self, candidate: &str) -> bool {
        let Ok(url) = Url::parse(candidate) else {
            return false;
        };
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        if !host_matches(&self.host_pattern, &host) {
            return false;
        }
        // http and https share a shape on the default ports
        let port = url.port_or_known_default();
        if port != self.port && url.port().is_some() {
            return false;
        }
        self.path.is_match(url.path())
    }
}
