use async_trait::async_trait;
use reqwest::{header, Client, ClientBuilder};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

use super::Scraper;
use crate::core::config::{ScrapeConfig, DEFAULT_USER_AGENT};
use crate::core::FetchError;
use crate::http::Page;
use crate::stats::StatsTracker;

#[derive(Debug, Error)]
pub enum HttpScraperError {
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Invalid header name: {0}")]
    InvalidHeaderName(#[from] header::InvalidHeaderName),
    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] header::InvalidHeaderValue),
}

#[derive(Clone)]
pub struct HttpScraper {
    client: Client,
    user_agent: String,
    stats: Arc<StatsTracker>,
}

impl HttpScraper {
    pub fn new() -> Result<Self, HttpScraperError> {
        Self::with_user_agent(DEFAULT_USER_AGENT, Vec::new())
    }

    /// Client with the configured User-Agent and default headers.
    pub fn from_config(config: &ScrapeConfig) -> Result<Self, HttpScraperError> {
        let headers = config
            .headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        Self::with_user_agent(&config.user_agent, headers)
    }

    /// Replaces the default headers, keeping the current User-Agent unless
    /// `headers` sets one.
    pub fn with_headers(self, headers: Vec<(&str, &str)>) -> Result<Self, HttpScraperError> {
        let client = Self::build_client(&self.user_agent, headers)?;
        Ok(Self { client, ..self })
    }

    fn with_user_agent(
        user_agent: &str,
        headers: Vec<(&str, &str)>,
    ) -> Result<Self, HttpScraperError> {
        Ok(Self {
            client: Self::build_client(user_agent, headers)?,
            user_agent: user_agent.to_string(),
            stats: Arc::new(StatsTracker::new()),
        })
    }

    fn build_client(
        user_agent: &str,
        headers: Vec<(&str, &str)>,
    ) -> Result<Client, HttpScraperError> {
        let mut header_map = header::HeaderMap::new();
        header_map.insert(header::USER_AGENT, header::HeaderValue::from_str(user_agent)?);

        for (key, value) in headers {
            let name = header::HeaderName::from_bytes(key.as_bytes())?;
            let value = header::HeaderValue::from_str(value)?;
            header_map.insert(name, value);
        }

        Ok(ClientBuilder::new()
            .default_headers(header_map)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()?)
    }

    /// First value per header name.
    fn extract_headers(response: &reqwest::Response) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers
                    .entry(name.to_string())
                    .or_insert_with(|| value.to_string());
            }
        }
        headers
    }
}

#[async_trait]
impl Scraper for HttpScraper {
    async fn fetch_single(&self, url: &Url, config: &ScrapeConfig) -> Result<Page, FetchError> {
        let mut req = self.client.get(url.clone()).timeout(config.request_timeout);
        for (key, value) in &config.headers {
            req = req.header(key, value);
        }

        let response = req.send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let headers = Self::extract_headers(&response);

        let raw_body = response.bytes().await?;
        // Mislabelled charsets are common; keep what decodes.
        let body = String::from_utf8_lossy(&raw_body).into_owned();

        Ok(Page::new(url.clone(), status, headers, body).with_final_url(final_url))
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
