//! In-memory render backend for unit tests

use crate::crawler::fetcher::{FetchError, RenderBackend, RenderSession, RenderedPage, SessionError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
enum Response {
    Html(String),
    Slow(Duration, String),
    Redirect(Url, String),
    Fail(FetchError),
}

#[derive(Debug, Default)]
struct Counters {
    loads: Mutex<Vec<String>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

/// A fixed set of pages served from memory
///
/// Unknown URLs answer with HTTP 404. Clones share their counters.
#[derive(Debug, Clone, Default)]
pub(crate) struct StaticSite {
    pages: HashMap<String, Response>,
    refuse_sessions: bool,
    counters: Arc<Counters>,
}

impl StaticSite {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn page(mut self, url: &str, html: &str) -> Self {
        self.pages
            .insert(key(url), Response::Html(html.to_string()));
        self
    }

    pub(crate) fn slow(mut self, url: &str, delay: Duration, html: &str) -> Self {
        self.pages
            .insert(key(url), Response::Slow(delay, html.to_string()));
        self
    }

    /// Serves `html` as if `url` had redirected to `target`
    pub(crate) fn redirect(mut self, url: &str, target: &str, html: &str) -> Self {
        let target = Url::parse(target).unwrap();
        self.pages
            .insert(key(url), Response::Redirect(target, html.to_string()));
        self
    }

    pub(crate) fn failing(mut self, url: &str, error: FetchError) -> Self {
        self.pages.insert(key(url), Response::Fail(error));
        self
    }

    pub(crate) fn refusing_sessions(mut self) -> Self {
        self.refuse_sessions = true;
        self
    }

    /// Every URL loaded so far, in load order
    pub(crate) fn loads(&self) -> Vec<String> {
        self.counters
            .loads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub(crate) fn sessions_opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn sessions_closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }
}

fn key(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}

#[async_trait]
impl RenderBackend for StaticSite {
    async fn open_session(&self) -> Result<Box<dyn RenderSession>, SessionError> {
        if self.refuse_sessions {
            return Err(SessionError("backend offline".to_string()));
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl RenderSession for StaticSite {
    async fn load(&mut self, url: &Url) -> Result<RenderedPage, FetchError> {
        self.counters
            .loads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());

        let mut final_url = url.clone();
        let html = match self.pages.get(url.as_str()).cloned() {
            Some(Response::Html(html)) => html,
            Some(Response::Slow(delay, html)) => {
                tokio::time::sleep(delay).await;
                html
            }
            Some(Response::Redirect(target, html)) => {
                final_url = target;
                html
            }
            Some(Response::Fail(error)) => return Err(error),
            None => {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                })
            }
        };

        Ok(RenderedPage { final_url, html })
    }

    async fn close(&mut self) {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
    }
}
