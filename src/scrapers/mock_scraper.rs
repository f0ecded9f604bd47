use crate::core::config::ScrapeConfig;
use crate::core::FetchError;
use crate::http::Page;
use crate::stats::StatsTracker;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use url::Url;

use super::Scraper;

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
    pub content_type: Option<String>,
    pub delay: Option<Duration>,
    /// Returned instead of a page when set.
    pub error: Option<FetchError>,
}

impl MockResponse {
    pub fn html(body: &str) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
            content_type: Some("text/html; charset=utf-8".to_string()),
            delay: None,
            error: None,
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            content_type: None,
            delay: None,
            error: None,
        }
    }

    pub fn error(error: FetchError) -> Self {
        Self {
            error: Some(error),
            ..Self::status(0, "")
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Replays scripted responses per URL. The n-th fetch of a URL gets its
/// n-th response, and the last one repeats; unknown URLs are 404s.
#[derive(Clone)]
pub struct MockScraper {
    routes: Arc<HashMap<String, Vec<MockResponse>>>,
    calls: Arc<Mutex<HashMap<String, usize>>>,
    stats: Arc<StatsTracker>,
}

impl Default for MockScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl MockScraper {
    pub fn new() -> Self {
        Self {
            routes: Arc::new(HashMap::new()),
            calls: Arc::new(Mutex::new(HashMap::new())),
            stats: Arc::new(StatsTracker::new()),
        }
    }

    pub fn with_route(mut self, url: &str, responses: Vec<MockResponse>) -> Self {
        Arc::make_mut(&mut self.routes).insert(route_key(url), responses);
        self
    }

    pub fn with_page(self, url: &str, html: &str) -> Self {
        self.with_route(url, vec![MockResponse::html(html)])
    }

    /// How often `url` has been fetched, across all clones.
    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().get(&route_key(url)).copied().unwrap_or(0)
    }
}

fn route_key(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}

#[async_trait]
impl Scraper for MockScraper {
    async fn fetch_single(&self, url: &Url, _config: &ScrapeConfig) -> Result<Page, FetchError> {
        let key = url.to_string();
        let index = {
            let mut calls = self.calls.lock();
            let count = calls.entry(key.clone()).or_insert(0);
            *count += 1;
            *count - 1
        };

        let response = self
            .routes
            .get(&key)
            .and_then(|responses| responses.get(index).or_else(|| responses.last()))
            .cloned()
            .unwrap_or_else(|| MockResponse::status(404, "Not Found"));

        if let Some(delay) = response.delay {
            sleep(delay).await;
        }
        if let Some(error) = response.error {
            return Err(error);
        }

        let mut headers = HashMap::new();
        if let Some(content_type) = response.content_type {
            headers.insert("content-type".to_string(), content_type);
        }
        Ok(Page::new(url.clone(), response.status, headers, response.body))
    }

    fn box_clone(&self) -> Box<dyn Scraper> {
        Box::new(self.clone())
    }

    fn stats(&self) -> &StatsTracker {
        &self.stats
    }

    fn set_stats(&mut self, stats: Arc<StatsTracker>) {
        self.stats = stats;
    }
}
