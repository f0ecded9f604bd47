use super::types::*;
use super::utils::*;
use crate::core::FetchError;
use crate::http::Page;
use std::collections::HashMap;
use std::time::Duration;

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_policy: BackoffPolicy::Exponential { factor: 2.0 },
            conditions: Vec::new(),
        }
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryState {
    pub fn new() -> Self {
        Self {
            counts: HashMap::new(),
            total_retries: 0,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            categories: HashMap::new(),
        }
    }
}

impl RetryConfig {
    /// Rate limits, 5xx responses and network failures, retried twice with
    /// a 2s/4s exponential backoff.
    pub fn standard() -> Self {
        let mut config = Self::default();
        config.categories.insert(
            RetryCategory::RateLimit,
            CategoryConfig {
                max_retries: 2,
                initial_delay: Duration::from_secs(2),
                max_delay: Duration::from_secs(30),
                backoff_policy: BackoffPolicy::Exponential { factor: 2.0 },
                conditions: vec![RetryCondition::StatusCode(429)],
            },
        );
        config.categories.insert(
            RetryCategory::ServerError,
            CategoryConfig {
                max_retries: 2,
                initial_delay: Duration::from_secs(2),
                max_delay: Duration::from_secs(30),
                backoff_policy: BackoffPolicy::Exponential { factor: 2.0 },
                conditions: vec![RetryCondition::StatusRange { min: 500, max: 599 }],
            },
        );
        config.categories.insert(
            RetryCategory::Network,
            CategoryConfig {
                max_retries: 2,
                initial_delay: Duration::from_secs(2),
                max_delay: Duration::from_secs(30),
                backoff_policy: BackoffPolicy::Exponential { factor: 2.0 },
                conditions: vec![RetryCondition::Timeout, RetryCondition::ConnectionError],
            },
        );
        config
    }

    pub fn with_category(mut self, category: RetryCategory, config: CategoryConfig) -> Self {
        self.categories.insert(category, config);
        self
    }

    /// Records the attempt in `state` and returns the delay before the next
    /// one, or `None` when the outcome is final.
    pub fn should_retry(
        &self,
        outcome: &Result<Page, FetchError>,
        state: &mut RetryState,
    ) -> Option<(RetryCategory, Duration)> {
        for (category, config) in &self.categories {
            let current_retries = state.counts.get(category).copied().unwrap_or(0);
            if current_retries >= config.max_retries {
                continue;
            }

            if config
                .conditions
                .iter()
                .any(|condition| retry_condition_should_apply(condition, outcome))
            {
                state.counts.insert(category.clone(), current_retries + 1);
                state.total_retries += 1;
                let delay = calculate_delay(config, current_retries);
                return Some((category.clone(), delay));
            }
        }
        None
    }
}

impl CategoryConfig {
    pub fn calculate_delay(&self, attempt: usize) -> Duration {
        calculate_delay(self, attempt)
    }
}
