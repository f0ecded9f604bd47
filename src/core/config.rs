use crate::core::rate_limit::{RateLimit, RateLimiter};
use crate::core::retry::RetryConfig;
use log::debug;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:4444";

pub const ENV_MAX_CONCURRENCY: &str = "CONTACT_SCRAPER_MAX_CONCURRENCY";
pub const ENV_TIMEOUT_SECS: &str = "CONTACT_SCRAPER_TIMEOUT_SECS";
pub const ENV_FOLLOW_LINKS: &str = "CONTACT_SCRAPER_FOLLOW_LINKS";
pub const ENV_USER_AGENT: &str = "CONTACT_SCRAPER_USER_AGENT";
pub const ENV_REJECT_ROLE_ACCOUNTS: &str = "CONTACT_SCRAPER_REJECT_ROLE_ACCOUNTS";
pub const ENV_WEBDRIVER_URL: &str = "WEBDRIVER_URL";
pub const ENV_GLOBAL_RATE_LIMIT: &str = "CONTACT_SCRAPER_GLOBAL_RATE_LIMIT";
pub const ENV_GLOBAL_TIME_PERIOD: &str = "CONTACT_SCRAPER_GLOBAL_TIME_PERIOD";
pub const ENV_DOMAIN_RATE_LIMIT: &str = "CONTACT_SCRAPER_DOMAIN_RATE_LIMIT";
pub const ENV_DOMAIN_TIME_PERIOD: &str = "CONTACT_SCRAPER_DOMAIN_TIME_PERIOD";

/// Requests per second across all hosts.
pub const DEFAULT_GLOBAL_RATE_LIMIT: f64 = 10.0;
/// Requests per second to any single host.
pub const DEFAULT_DOMAIN_RATE_LIMIT: f64 = 5.0;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub max_concurrency: usize,
    pub request_timeout: Duration,
    /// Extra same-site contact pages fetched after each root page.
    pub follow_links: usize,
    pub user_agent: String,
    pub headers: Vec<(String, String)>,
    pub retry_config: RetryConfig,
    pub webdriver_url: String,
    pub reject_role_accounts: bool,
    /// Shared by every clone of this config.
    pub rate_limiter: RateLimiter,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            request_timeout: Duration::from_secs(30),
            follow_links: 0,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: Vec::new(),
            retry_config: RetryConfig::standard(),
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            reject_role_accounts: false,
            rate_limiter: RateLimiter::new(
                Some(RateLimit::per_second(DEFAULT_GLOBAL_RATE_LIMIT)),
                Some(RateLimit::per_second(DEFAULT_DOMAIN_RATE_LIMIT)),
            ),
        }
    }
}

impl ScrapeConfig {
    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_MAX_CONCURRENCY) {
            let parsed = parse_usize(ENV_MAX_CONCURRENCY, &value)?;
            if parsed == 0 {
                return Err(invalid(ENV_MAX_CONCURRENCY, &value, "must be at least 1"));
            }
            config.max_concurrency = parsed;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_SECS) {
            config.request_timeout = Duration::from_secs(parse_usize(ENV_TIMEOUT_SECS, &value)? as u64);
        }
        if let Some(value) = lookup(ENV_FOLLOW_LINKS) {
            config.follow_links = parse_usize(ENV_FOLLOW_LINKS, &value)?;
        }
        if let Some(value) = lookup(ENV_USER_AGENT) {
            if !value.trim().is_empty() {
                config.user_agent = value.trim().to_string();
            }
        }
        if let Some(value) = lookup(ENV_REJECT_ROLE_ACCOUNTS) {
            config.reject_role_accounts = parse_bool(ENV_REJECT_ROLE_ACCOUNTS, &value)?;
        }
        if let Some(value) = lookup(ENV_WEBDRIVER_URL) {
            if !value.trim().is_empty() {
                config.webdriver_url = value.trim().to_string();
            }
        }

        let global = rate_limit_from(
            &lookup,
            ENV_GLOBAL_RATE_LIMIT,
            ENV_GLOBAL_TIME_PERIOD,
            config.rate_limiter.global(),
            DEFAULT_GLOBAL_RATE_LIMIT,
        )?;
        let per_host = rate_limit_from(
            &lookup,
            ENV_DOMAIN_RATE_LIMIT,
            ENV_DOMAIN_TIME_PERIOD,
            config.rate_limiter.per_host(),
            DEFAULT_DOMAIN_RATE_LIMIT,
        )?;
        config = config.with_rate_limits(global, per_host);

        debug!("Loaded scrape configuration: {:?}", config);
        Ok(config)
    }

    pub fn with_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_follow_links(mut self, follow_links: usize) -> Self {
        self.follow_links = follow_links;
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    pub fn with_headers(mut self, headers: Vec<(&str, &str)>) -> Self {
        self.headers = headers
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self
    }

    pub fn with_retry(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn with_webdriver_url(mut self, webdriver_url: &str) -> Self {
        self.webdriver_url = webdriver_url.to_string();
        self
    }

    pub fn with_reject_role_accounts(mut self, reject: bool) -> Self {
        self.reject_role_accounts = reject;
        self
    }

    /// `None` lifts the corresponding limit. Starts a fresh schedule.
    pub fn with_rate_limits(
        mut self,
        global: Option<RateLimit>,
        per_host: Option<RateLimit>,
    ) -> Self {
        self.rate_limiter = RateLimiter::new(global, per_host);
        self
    }

    pub fn without_rate_limits(self) -> Self {
        self.with_rate_limits(None, None)
    }
}

/// A rate of 0 disables the limit. A period alone keeps the current rate.
fn rate_limit_from<F>(
    lookup: &F,
    rate_key: &str,
    period_key: &str,
    current: Option<RateLimit>,
    default_rate: f64,
) -> Result<Option<RateLimit>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let rate = match lookup(rate_key) {
        Some(value) => parse_non_negative(rate_key, &value)?,
        None => current.map_or(default_rate, |limit| limit.max_requests),
    };
    let period = match lookup(period_key) {
        Some(value) => {
            let secs = parse_non_negative(period_key, &value)?;
            if secs == 0.0 {
                return Err(invalid(period_key, &value, "must be greater than 0"));
            }
            Duration::from_secs_f64(secs)
        }
        None => current.map_or(Duration::from_secs(1), |limit| limit.period),
    };
    if rate == 0.0 {
        return Ok(None);
    }
    Ok(Some(RateLimit::new(rate, period)))
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|e| invalid(key, value, &e.to_string()))
}

fn parse_non_negative(key: &str, value: &str) -> Result<f64, ConfigError> {
    let parsed = value
        .trim()
        .parse::<f64>()
        .map_err(|e| invalid(key, value, &e.to_string()))?;
    // Upper bound keeps periods within Duration range.
    if !parsed.is_finite() || parsed < 0.0 || parsed > 1e9 {
        return Err(invalid(key, value, "must be a non-negative number"));
    }
    Ok(parsed)
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(invalid(key, value, "expected true or false")),
    }
}
