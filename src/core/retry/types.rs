use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ContentRetryCondition {
    pub pattern: String,
    pub is_regex: bool,
}

/// A fetch outcome that qualifies for another attempt.
#[derive(Debug, Clone)]
pub enum RetryCondition {
    StatusCode(u16),
    StatusRange { min: u16, max: u16 },
    Content(ContentRetryCondition),
    Timeout,
    ConnectionError,
}

#[derive(Debug, Clone, Copy)]
pub enum BackoffPolicy {
    Constant,
    Linear,
    Exponential { factor: f32 },
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum RetryCategory {
    RateLimit,      // 429, rate limiting messages
    ServerError,    // 500-599
    Network,        // timeouts, refused or reset connections
    BotDetection,   // captchas, "access denied" interstitials
    Custom(String), // Custom category
}

#[derive(Debug, Clone)]
pub struct CategoryConfig {
    pub max_retries: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_policy: BackoffPolicy,
    pub conditions: Vec<RetryCondition>,
}

/// Attempts made so far for a single fetch.
#[derive(Debug, Clone)]
pub struct RetryState {
    pub counts: HashMap<RetryCategory, usize>,
    pub total_retries: usize,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub categories: HashMap<RetryCategory, CategoryConfig>,
}
