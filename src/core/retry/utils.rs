use super::types::*;
use crate::core::FetchError;
use crate::http::Page;
use regex::Regex;
use std::time::Duration;

pub(crate) fn retry_condition_should_apply(
    condition: &RetryCondition,
    outcome: &Result<Page, FetchError>,
) -> bool {
    match (condition, outcome) {
        (RetryCondition::StatusCode(code), Ok(page)) => *code == page.status,
        (RetryCondition::StatusCode(code), Err(FetchError::Status(status))) => code == status,
        (RetryCondition::StatusRange { min, max }, Ok(page)) => {
            (*min..=*max).contains(&page.status)
        }
        (RetryCondition::StatusRange { min, max }, Err(FetchError::Status(status))) => {
            (*min..=*max).contains(status)
        }
        (RetryCondition::Content(content_condition), Ok(page)) => {
            check_content_condition(content_condition, &page.body)
        }
        (RetryCondition::Timeout, Err(FetchError::Timeout(_))) => true,
        (RetryCondition::ConnectionError, Err(FetchError::Connection(_))) => true,
        (RetryCondition::ConnectionError, Err(FetchError::Driver(_))) => true,
        _ => false,
    }
}

fn check_content_condition(condition: &ContentRetryCondition, content: &str) -> bool {
    if condition.is_regex {
        Regex::new(&condition.pattern)
            .map(|re| re.is_match(content))
            .unwrap_or(false)
    } else {
        content
            .to_lowercase()
            .contains(&condition.pattern.to_lowercase())
    }
}

pub fn calculate_delay(config: &CategoryConfig, attempt: usize) -> Duration {
    if attempt == 0 {
        return std::cmp::min(config.initial_delay, config.max_delay);
    }

    let multiplier = match config.backoff_policy {
        BackoffPolicy::Constant => 1.0,
        BackoffPolicy::Linear => attempt.saturating_add(1) as f64,
        BackoffPolicy::Exponential { factor } => {
            f64::from(factor).powi(i32::try_from(attempt).unwrap_or(i32::MAX))
        }
    };

    // Overflowing, negative and NaN products fall back to the cap.
    Duration::try_from_secs_f64(config.initial_delay.as_secs_f64() * multiplier)
        .map_or(config.max_delay, |delay| std::cmp::min(delay, config.max_delay))
}
