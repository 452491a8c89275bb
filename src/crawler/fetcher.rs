//! Fetcher/extractor adapter
//!
//! This module turns a URL into a title plus an ordered, duplicate-free list
//! of outbound links. It is built from two seams:
//! - [`RenderBackend`] / [`RenderSession`]: loads a URL and returns HTML.
//!   Each worker opens its own session and releases it when it exits.
//! - The HTML parser in [`crate::crawler::parser`].
//!
//! Link resolution and filtering happen here, not in the backend.
//!
//! [`HttpRenderer`] is the bundled backend: a plain HTTP GET through
//! `reqwest`. A browser-automation backend plugs in behind the same traits.

use crate::config::RenderConfig;
use crate::crawler::parser::{extract_anchors, extract_title, parse_document};
use crate::url::normalize_link;
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Per-URL fetch failures
///
/// None of these are fatal: the worker logs the failure and moves on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Expected HTML from {url}, got '{content_type}'")]
    NotHtml { url: String, content_type: String },

    #[error("Render backend failed on {url}: {message}")]
    Backend { url: String, message: String },

    #[error("Malformed page at {url}: {message}")]
    Malformed { url: String, message: String },
}

impl FetchError {
    /// Returns true if another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout { .. } | FetchError::Network { .. } => true,
            FetchError::Status { status, .. } => *status >= 500,
            FetchError::NotHtml { .. } | FetchError::Backend { .. } | FetchError::Malformed { .. } => {
                false
            }
        }
    }

    /// The URL the failure is about
    pub fn url(&self) -> &str {
        match self {
            FetchError::Timeout { url }
            | FetchError::Network { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::NotHtml { url, .. }
            | FetchError::Backend { url, .. }
            | FetchError::Malformed { url, .. } => url,
        }
    }
}

/// A render session could not be opened
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Failed to open render session: {0}")]
pub struct SessionError(pub String);

/// Output of the render backend for one URL
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// URL after redirects; relative links resolve against this
    pub final_url: Url,
    pub html: String,
}

/// Source of render sessions, shared by all workers
#[async_trait]
pub trait RenderBackend: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn RenderSession>, SessionError>;
}

/// A render session owned by exactly one worker
#[async_trait]
pub trait RenderSession: Send {
    /// Loads `url` and returns the rendered HTML
    ///
    /// May take seconds. The adapter enforces the per-call timeout, so
    /// implementations do not need to.
    async fn load(&mut self, url: &Url) -> Result<RenderedPage, FetchError>;

    /// Releases whatever the session holds
    async fn close(&mut self) {}
}

/// What a successful fetch produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub final_url: Url,
    /// Trimmed `<title>` text, empty if the page has none
    pub title: String,
    /// Absolute http(s) links in first-seen order, without repeats
    pub links: Vec<Url>,
}

/// One worker's fetch+extract adapter
pub struct Fetcher {
    session: Box<dyn RenderSession>,
    timeout: Duration,
}

impl Fetcher {
    pub fn new(session: Box<dyn RenderSession>, timeout: Duration) -> Self {
        Self { session, timeout }
    }

    /// Loads `url` through the session and extracts its title and links
    pub async fn fetch(&mut self, url: &Url) -> Result<FetchedPage, FetchError> {
        let rendered = match tokio::time::timeout(self.timeout, self.session.load(url)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(FetchError::Timeout {
                    url: url.to_string(),
                })
            }
        };

        extract_page(url, rendered)
    }

    /// Releases the underlying render session
    pub async fn close(mut self) {
        self.session.close().await;
    }
}

/// Extracts the title and normalized links from rendered HTML
///
/// `url` is the URL that was dispatched; errors are reported against it,
/// while links resolve against `rendered.final_url`. An empty document is
/// reported as malformed. Links that fail
/// normalization (fragment-only, `mailto:`, `javascript:`, unparseable) are
/// dropped silently; repeats keep their first position.
pub fn extract_page(url: &Url, rendered: RenderedPage) -> Result<FetchedPage, FetchError> {
    if rendered.html.trim().is_empty() {
        return Err(FetchError::Malformed {
            url: url.to_string(),
            message: "empty document".to_string(),
        });
    }

    let document = parse_document(&rendered.html);
    let title = extract_title(&document).unwrap_or_default();

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for anchor in extract_anchors(&document) {
        match normalize_link(&anchor.href, &rendered.final_url) {
            Ok(link) => {
                if seen.insert(link.as_str().to_string()) {
                    links.push(link);
                }
            }
            Err(e) => tracing::trace!("Skipping link {:?}: {}", anchor.href, e),
        }
    }

    Ok(FetchedPage {
        final_url: rendered.final_url,
        title,
        links,
    })
}

/// Builds the HTTP client used by [`HttpRenderer`]
pub fn build_http_client(config: &RenderConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Render backend that fetches pages over plain HTTP
///
/// Sessions share one connection pool; `reqwest::Client` is cheap to clone.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new(config: &RenderConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }
}

#[async_trait]
impl RenderBackend for HttpRenderer {
    async fn open_session(&self) -> Result<Box<dyn RenderSession>, SessionError> {
        Ok(Box::new(HttpSession {
            client: self.client.clone(),
        }))
    }
}

struct HttpSession {
    client: Client,
}

#[async_trait]
impl RenderSession for HttpSession {
    async fn load(&mut self, url: &Url) -> Result<RenderedPage, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !content_type.to_ascii_lowercase().contains("html") {
            return Err(FetchError::NotHtml {
                url: url.to_string(),
                content_type,
            });
        }

        let html = response.text().await.map_err(|e| classify_error(url, e))?;

        Ok(RenderedPage { final_url, html })
    }
}

fn classify_error(url: &Url, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if e.is_connect() {
        FetchError::Network {
            url: url.to_string(),
            message: format!("connection failed: {}", e),
        }
    } else if e.is_redirect() {
        FetchError::Backend {
            url: url.to_string(),
            message: format!("redirect error: {}", e),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::testing::StaticSite;

    fn rendered(url: &str, html: &str) -> RenderedPage {
        RenderedPage {
            final_url: Url::parse(url).unwrap(),
            html: html.to_string(),
        }
    }

    fn extract(rendered: RenderedPage) -> Result<FetchedPage, FetchError> {
        let url = rendered.final_url.clone();
        extract_page(&url, rendered)
    }

    fn link_strings(page: &FetchedPage) -> Vec<&str> {
        page.links.iter().map(Url::as_str).collect()
    }

    #[test]
    fn test_extract_title_and_links() {
        let page = extract(rendered(
            "http://a.test/",
            r#"<html><head><title> Home </title></head><body>
                <a href="/b">B</a>
                <a href="http://a.test/c">C</a>
            </body></html>"#,
        ))
        .unwrap();

        assert_eq!(page.title, "Home");
        assert_eq!(link_strings(&page), vec!["http://a.test/b", "http://a.test/c"]);
    }

    #[test]
    fn test_links_deduplicated_in_first_seen_order() {
        let page = extract(rendered(
            "http://a.test/",
            r#"<a href="/c">1</a><a href="/b">2</a><a href="/c#x">3</a><a href="http://a.test/b">4</a>"#,
        ))
        .unwrap();

        assert_eq!(link_strings(&page), vec!["http://a.test/c", "http://a.test/b"]);
    }

    #[test]
    fn test_non_http_and_fragment_links_dropped() {
        let page = extract(rendered(
            "http://a.test/",
            r##"
            <a href="#section">Jump</a>
            <a href="mailto:x@a.test">Mail</a>
            <a href="javascript:void(0)">JS</a>
            <a href="ftp://files.a.test/">FTP</a>
            <a href="/valid">Valid</a>
            "##,
        ))
        .unwrap();

        assert_eq!(link_strings(&page), vec!["http://a.test/valid"]);
    }

    #[test]
    fn test_relative_links_use_final_url() {
        let page = extract(rendered(
            "http://a.test/docs/",
            r#"<a href="intro">Intro</a>"#,
        ))
        .unwrap();

        assert_eq!(link_strings(&page), vec!["http://a.test/docs/intro"]);
    }

    #[test]
    fn test_missing_title_is_empty() {
        let page = extract(rendered("http://a.test/", "<p>no title</p>")).unwrap();
        assert_eq!(page.title, "");
        assert!(page.links.is_empty());
    }

    #[test]
    fn test_empty_document_is_malformed() {
        let result = extract(rendered("http://a.test/", "  \n "));
        assert!(matches!(result, Err(FetchError::Malformed { .. })));
    }

    #[test]
    fn test_malformed_reports_dispatched_url() {
        let dispatched = Url::parse("http://a.test/old").unwrap();
        let result = extract_page(&dispatched, rendered("http://a.test/new", ""));

        assert_eq!(
            result,
            Err(FetchError::Malformed {
                url: "http://a.test/old".to_string(),
                message: "empty document".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_fetch_keeps_redirect_target() {
        let site = StaticSite::new().redirect(
            "http://a.test/",
            "http://a.test/home/",
            r#"<a href="next">next</a>"#,
        );
        let session = site.open_session().await.unwrap();
        let mut fetcher = Fetcher::new(session, Duration::from_secs(5));

        let page = fetcher.fetch(&Url::parse("http://a.test/").unwrap()).await.unwrap();
        assert_eq!(page.final_url.as_str(), "http://a.test/home/");
        assert_eq!(link_strings(&page), vec!["http://a.test/home/next"]);
    }

    #[test]
    fn test_retryable_errors() {
        let url = "http://a.test/".to_string();
        assert!(FetchError::Timeout { url: url.clone() }.is_retryable());
        assert!(FetchError::Status { url: url.clone(), status: 503 }.is_retryable());
        assert!(!FetchError::Status { url: url.clone(), status: 404 }.is_retryable());
        assert!(!FetchError::NotHtml {
            url: url.clone(),
            content_type: "image/png".to_string()
        }
        .is_retryable());
        assert_eq!(FetchError::Timeout { url: url.clone() }.url(), url);
    }

    #[tokio::test]
    async fn test_fetch_through_session() {
        let site = StaticSite::new().page("http://a.test/", r#"<title>A</title><a href="/b">b</a>"#);
        let session = site.open_session().await.unwrap();
        let mut fetcher = Fetcher::new(session, Duration::from_secs(5));

        let page = fetcher.fetch(&Url::parse("http://a.test/").unwrap()).await.unwrap();
        assert_eq!(page.title, "A");
        assert_eq!(link_strings(&page), vec!["http://a.test/b"]);

        fetcher.close().await;
        assert_eq!(site.sessions_closed(), 1);
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let site = StaticSite::new().slow("http://a.test/", Duration::from_secs(5), "<title>A</title>");
        let session = site.open_session().await.unwrap();
        let mut fetcher = Fetcher::new(session, Duration::from_millis(50));

        let result = fetcher.fetch(&Url::parse("http://a.test/").unwrap()).await;
        assert_eq!(
            result,
            Err(FetchError::Timeout {
                url: "http://a.test/".to_string()
            })
        );
    }

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&RenderConfig::default());
        assert!(client.is_ok());
    }
}
