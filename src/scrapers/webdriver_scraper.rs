use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use log::{debug, info, warn};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::timeout;
use url::Url;

use super::Scraper;
use crate::core::config::ScrapeConfig;
use crate::core::FetchError;
use crate::http::Page;
use crate::stats::StatsTracker;

/// Renders pages in a browser through a WebDriver server. Sessions are
/// created lazily, up to `max_sessions`, and reused between fetches.
#[derive(Clone)]
pub struct WebDriverScraper {
    webdriver_url: String,
    user_agent: String,
    sessions: Arc<Mutex<Vec<Client>>>,
    permits: Arc<Semaphore>,
    stats: Arc<StatsTracker>,
}

impl WebDriverScraper {
    pub fn new(config: &ScrapeConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            user_agent: config.user_agent.clone(),
            sessions: Arc::new(Mutex::new(Vec::new())),
            permits: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
            stats: Arc::new(StatsTracker::new()),
        }
    }

    async fn connect(&self) -> Result<Client, FetchError> {
        let mut capabilities = serde_json::Map::new();
        capabilities.insert(
            "goog:chromeOptions".to_string(),
            json!({
                "args": [
                    "--headless=new",
                    "--disable-gpu",
                    "--no-sandbox",
                    format!("--user-agent={}", self.user_agent),
                ]
            }),
        );

        let mut builder = ClientBuilder::native();
        builder.capabilities(capabilities);
        let client = builder
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| FetchError::Driver(format!("{}: {}", self.webdriver_url, e)))?;
        debug!("Opened WebDriver session at {}", self.webdriver_url);
        Ok(client)
    }

    async fn checkout(&self) -> Result<Client, FetchError> {
        if let Some(client) = self.sessions.lock().await.pop() {
            return Ok(client);
        }
        self.connect().await
    }

    async fn render(client: &Client, url: &Url) -> Result<(String, Url), FetchError> {
        client
            .goto(url.as_str())
            .await
            .map_err(|e| FetchError::Driver(e.to_string()))?;
        let source = client
            .source()
            .await
            .map_err(|e| FetchError::Driver(e.to_string()))?;
        let final_url = client.current_url().await.unwrap_or_else(|_| url.clone());
        Ok((source, final_url))
    }
}

#[async_trait]
impl Scraper for WebDriverScraper {
    async fn fetch_single(&self, url: &Url, config: &ScrapeConfig) -> Result<Page, FetchError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| FetchError::Driver(e.to_string()))?;
        let client = self.checkout().await?;

        match timeout(config.request_timeout, Self::render(&client, url)).await {
            Ok(Ok((source, final_url))) => {
                self.sessions.lock().await.push(client);
                let mut headers = HashMap::new();
                headers.insert("content-type".to_string(), "text/html".to_string());
                // WebDriver does not expose the response status.
                Ok(Page::new(url.clone(), 200, headers, source).with_final_url(final_url))
            }
            Ok(Err(e)) => {
                // The session may be broken; do not hand it out again.
                if let Err(close_err) = client.close().await {
                    debug!("Failed to close WebDriver session: {}", close_err);
                }
                Err(e)
            }
            Err(_) => {
                if let Err(close_err) = client.close().await {
                    debug!("Failed to close WebDriver session: {}", close_err);
                }
                Err(FetchError::Timeout(format!(
                    "page load exceeded {:?}",
                    config.request_timeout
                )))
            }
        }
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

    async fn close(&self) {
        let sessions: Vec<Client> = self.sessions.lock().await.drain(..).collect();
        info!("Closing {} WebDriver sessions", sessions.len());
        for client in sessions {
            if let Err(e) = client.close().await {
                warn!("Failed to close WebDriver session: {}", e);
            }
        }
    }
}
