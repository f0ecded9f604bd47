use crate::core::retry::RetryCategory;
use chrono::prelude::*;
use std::collections::HashMap;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Html,
    Text,
    Json,
    Binary,
}

impl ContentType {
    pub fn detect(headers: &HashMap<String, String>, body: &str) -> Self {
        if let Some(content_type) = headers.get("content-type") {
            if content_type.contains("text/html") || content_type.contains("xhtml") {
                ContentType::Html
            } else if content_type.contains("application/json") {
                ContentType::Json
            } else if content_type.contains("text/") {
                ContentType::Text
            } else {
                ContentType::Binary
            }
        } else {
            let start = body.trim_start();
            if start.starts_with('{') || start.starts_with('[') {
                ContentType::Json
            } else if start
                .get(..5)
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case("<!doc"))
                || start.get(..5).is_some_and(|prefix| prefix.eq_ignore_ascii_case("<html"))
            {
                ContentType::Html
            } else {
                ContentType::Text
            }
        }
    }
}

/// A fetched page, as handed to the extractor.
#[derive(Debug, Clone)]
pub struct Page {
    /// The URL that was requested.
    pub url: Url,
    /// Where the page ended up after redirects.
    pub final_url: Url,
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub content_type: ContentType,
    pub fetched_at: DateTime<Utc>,
    pub retry_count: usize,
    pub retry_history: HashMap<RetryCategory, usize>,
}

impl Page {
    pub fn new(url: Url, status: u16, headers: HashMap<String, String>, body: String) -> Self {
        let content_type = ContentType::detect(&headers, &body);
        Self {
            final_url: url.clone(),
            url,
            status,
            headers,
            body,
            content_type,
            fetched_at: Utc::now(),
            retry_count: 0,
            retry_history: HashMap::new(),
        }
    }

    pub fn with_final_url(mut self, final_url: Url) -> Self {
        self.final_url = final_url;
        self
    }

    /// Binary payloads are never scanned for contacts.
    pub fn is_extractable(&self) -> bool {
        !matches!(self.content_type, ContentType::Binary)
    }

    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}
