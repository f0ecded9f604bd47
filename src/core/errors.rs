use crate::extractor::ExtractorError;
use crate::storage::StorageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a single page could not be fetched.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("browser driver error: {0}")]
    Driver(String),

    #[error("failed to decode response body: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::InvalidUrl { .. } => FailureKind::InvalidUrl,
            FetchError::Timeout(_) => FailureKind::Timeout,
            FetchError::Connection(_) => FailureKind::Connection,
            FetchError::Status(_) => FailureKind::HttpStatus,
            FetchError::Driver(_) => FailureKind::Driver,
            FetchError::Decode(_) => FailureKind::Decode,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else if err.is_decode() || err.is_body() {
            FetchError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Connection(err.to_string())
        }
    }
}

/// Failure classification reported per input URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidUrl,
    Timeout,
    Connection,
    HttpStatus,
    Driver,
    Decode,
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InvalidUrl => "invalid_url",
            FailureKind::Timeout => "timeout",
            FailureKind::Connection => "connection",
            FailureKind::HttpStatus => "http_status",
            FailureKind::Driver => "driver",
            FailureKind::Decode => "decode",
            FailureKind::Internal => "internal",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that abort a whole run. Per-URL problems are reported as
/// [`FetchError`]s inside the run report instead.
#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Extractor error: {0}")]
    Extractor(#[from] ExtractorError),
}

pub type ScraperResult<T> = Result<T, ScraperError>;
