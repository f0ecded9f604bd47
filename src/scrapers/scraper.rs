use crate::core::config::ScrapeConfig;
use crate::core::retry::RetryState;
use crate::core::FetchError;
use crate::http::Page;
use crate::stats::StatsTracker;
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::time::sleep;
use url::Url;

#[async_trait]
pub trait Scraper: Send + Sync {
    /// One attempt, no retries. HTTP error statuses come back as pages.
    async fn fetch_single(&self, url: &Url, config: &ScrapeConfig) -> Result<Page, FetchError>;
    fn box_clone(&self) -> Box<dyn Scraper>;
    fn stats(&self) -> &StatsTracker;
    fn set_stats(&mut self, stats: Arc<StatsTracker>);

    /// Releases sessions or connections held by the scraper.
    async fn close(&self) {}

    /// Fetches `url`, retrying per `config.retry_config`. Every attempt
    /// waits on `config.rate_limiter` first. A status of 400 or above that
    /// survives the retries is an error.
    async fn fetch(&self, url: &Url, config: &ScrapeConfig) -> Result<Page, FetchError> {
        let mut state = RetryState::new();

        loop {
            config.rate_limiter.acquire(url).await;
            debug!("Fetching URL: {}", url);
            let start_time = Utc::now();
            let outcome = self.fetch_single(url, config).await;
            let duration = Utc::now().signed_duration_since(start_time);

            match &outcome {
                Ok(page) => {
                    debug!(
                        "Received response: status={}, body_length={}",
                        page.status,
                        page.body.len()
                    );
                    self.stats()
                        .record_request(page.status, page.body.len(), duration);
                }
                Err(e) => {
                    debug!("Request to {} failed: {}", url, e);
                    self.stats().record_request_error();
                }
            }

            if let Some((category, delay)) =
                config.retry_config.should_retry(&outcome, &mut state)
            {
                self.stats().record_retry(format!("{:?}", category));
                warn!(
                    "Retry triggered for URL: {} (category={:?}, attempt={}/{}, delay={:?})",
                    url,
                    category,
                    state.counts.get(&category).copied().unwrap_or(0),
                    config
                        .retry_config
                        .categories
                        .get(&category)
                        .map(|c| c.max_retries)
                        .unwrap_or(0),
                    delay
                );

                sleep(delay).await;
                continue;
            }

            return match outcome {
                Ok(page) if !page.is_success() => {
                    info!(
                        "Giving up on {} with status {} after {} retries",
                        url, page.status, state.total_retries
                    );
                    Err(FetchError::Status(page.status))
                }
                Ok(page) => {
                    info!(
                        "Request completed for URL: {} (total_retries={}, status={})",
                        url, state.total_retries, page.status
                    );
                    debug!("Retry history for {}: {:?}", url, state.counts);
                    Ok(Page {
                        retry_count: state.total_retries,
                        retry_history: state.counts,
                        ..page
                    })
                }
                Err(e) => Err(e),
            };
        }
    }
}
