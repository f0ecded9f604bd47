mod site;

use crate::core::config::ScrapeConfig;
use crate::core::links::ContactLinkFinder;
use crate::core::report::{CrawlReport, Progress, UrlFailure};
use crate::core::{FailureKind, FetchError, ScraperResult};
use crate::extractor::{ContactExtractor, ExtractionRules};
use crate::scrapers::Scraper;
use crate::stats::StatsTracker;
use crate::storage::{RecordStore, StorageError};
use crate::validator::{DataValidator, ValidationPolicy};
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, error, info, warn};
use site::{SiteOutcome, SiteTask};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Drives fetch -> extract -> validate -> store over a list of sites with
/// at most `max_concurrency` sites in flight.
pub struct Crawler {
    scraper: Box<dyn Scraper>,
    config: Arc<ScrapeConfig>,
    extractor: Arc<ContactExtractor>,
    validator: Arc<DataValidator>,
    link_finder: Arc<ContactLinkFinder>,
    stats: Arc<StatsTracker>,
    progress: Option<UnboundedSender<Progress>>,
    cancel: CancellationToken,
}

impl Crawler {
    pub fn new(scraper: Box<dyn Scraper>) -> ScraperResult<Self> {
        info!("Initializing crawler");
        let stats = Arc::new(StatsTracker::new());
        let mut scraper = scraper;
        scraper.set_stats(Arc::clone(&stats));

        Ok(Self {
            scraper,
            config: Arc::new(ScrapeConfig::default()),
            extractor: Arc::new(ContactExtractor::new(ExtractionRules::default())?),
            validator: Arc::new(DataValidator::new(ValidationPolicy::default())),
            link_finder: Arc::new(ContactLinkFinder::new()?),
            stats,
            progress: None,
            cancel: CancellationToken::new(),
        })
    }

    /// Also applies the config's role-account setting to the validator.
    pub fn with_config(mut self, config: ScrapeConfig) -> Self {
        let policy = self
            .validator
            .policy()
            .clone()
            .with_reject_role_accounts(config.reject_role_accounts);
        self.validator = Arc::new(DataValidator::new(policy));
        self.config = Arc::new(config);
        self
    }

    pub fn with_extractor(mut self, extractor: ContactExtractor) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    pub fn with_validator(mut self, validator: DataValidator) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn with_link_finder(mut self, link_finder: ContactLinkFinder) -> Self {
        self.link_finder = Arc::new(link_finder);
        self
    }

    pub fn with_progress(mut self, progress: UnboundedSender<Progress>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Cancelling `token` stops the run: nothing new starts and pending
    /// fetches are abandoned.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    pub fn stats(&self) -> Arc<StatsTracker> {
        Arc::clone(&self.stats)
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Processes every URL once and returns what happened. Per-URL failures
    /// end up in the report; a store failure stops the run and is returned
    /// once in-flight work has drained.
    pub async fn run(
        &self,
        urls: Vec<String>,
        store: Arc<dyn RecordStore>,
    ) -> ScraperResult<CrawlReport> {
        let (targets, invalid) = normalize_inputs(&urls);
        let mut report = CrawlReport::new(targets.len() + invalid.len());
        info!(
            "Starting run {} over {} URLs (max concurrency {})",
            report.run_id, report.total, self.config.max_concurrency
        );
        self.send_progress(&report);

        for failure in invalid {
            warn!("Skipping {}: {}", failure.url, failure.message);
            self.stats.record_url_done(true);
            report.record_failure(failure);
            self.send_progress(&report);
        }

        let run_token = self.cancel.child_token();
        let mut pending = targets.into_iter();
        let mut futures = FuturesUnordered::new();
        let mut storage_error: Option<StorageError> = None;

        loop {
            while futures.len() < self.config.max_concurrency && !run_token.is_cancelled() {
                let Some(url) = pending.next() else {
                    break;
                };
                info!("Processing URL: {}", url);
                let task = self.site_task(url.clone(), &store, &run_token);
                let handle = tokio::spawn(task.run());
                futures.push(async move { (url, handle.await) });
            }

            let Some((url, joined)) = futures.next().await else {
                break;
            };

            match joined {
                Ok(SiteOutcome::Done(summary)) => {
                    info!(
                        "Finished {}: {} candidates, {} new rows",
                        url, summary.extracted, summary.written
                    );
                    self.stats.record_url_done(false);
                    report.record_site(summary);
                }
                Ok(SiteOutcome::Failed(e)) => {
                    warn!("Failed to process {}: {}", url, e);
                    self.stats.record_url_done(true);
                    report.record_failure(UrlFailure::from_fetch(url.as_str(), &e));
                }
                Ok(SiteOutcome::Cancelled) => {
                    debug!("Abandoned {} after cancellation", url);
                    report.cancelled.push(url.to_string());
                    continue;
                }
                Ok(SiteOutcome::StoreFailed(e)) => {
                    error!("Store write failed while processing {}: {}", url, e);
                    run_token.cancel();
                    storage_error.get_or_insert(e);
                    continue;
                }
                Err(e) => {
                    warn!("Task for {} did not complete: {}", url, e);
                    self.stats.record_url_done(true);
                    report.record_failure(UrlFailure::new(
                        url.as_str(),
                        FailureKind::Internal,
                        e.to_string(),
                    ));
                }
            }
            self.send_progress(&report);
        }

        report.cancelled.extend(pending.map(|url| url.to_string()));
        report.finish();
        self.stats.finish();

        if let Some(e) = storage_error {
            return Err(e.into());
        }
        if report.was_cancelled() {
            info!(
                "Run {} cancelled after {}/{} URLs",
                report.run_id, report.completed, report.total
            );
        } else {
            info!(
                "Run {} completed: {} rows written, {} failures",
                report.run_id,
                report.rows_written,
                report.failures.len()
            );
        }
        Ok(report)
    }

    /// Releases resources held by the scraper.
    pub async fn close(&self) {
        self.scraper.close().await;
    }

    fn site_task(
        &self,
        url: Url,
        store: &Arc<dyn RecordStore>,
        token: &CancellationToken,
    ) -> SiteTask {
        SiteTask {
            url,
            scraper: self.scraper.box_clone(),
            config: Arc::clone(&self.config),
            extractor: Arc::clone(&self.extractor),
            validator: Arc::clone(&self.validator),
            link_finder: Arc::clone(&self.link_finder),
            store: Arc::clone(store),
            stats: Arc::clone(&self.stats),
            cancel: token.clone(),
        }
    }

    fn send_progress(&self, report: &CrawlReport) {
        if let Some(progress) = &self.progress {
            if progress.send(report.progress()).is_err() {
                debug!("Progress receiver dropped");
            }
        }
    }
}

/// Trims each input and defaults the scheme to `http://`. Blank entries
/// are ignored and repeats are kept once, in first-seen order.
fn normalize_inputs(urls: &[String]) -> (Vec<Url>, Vec<UrlFailure>) {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    let mut invalid = Vec::new();

    for raw in urls {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        match normalize_url(trimmed) {
            Ok(url) => {
                if seen.insert(url.to_string()) {
                    targets.push(url);
                } else {
                    debug!("Ignoring repeated URL {}", url);
                }
            }
            Err(e) => {
                if seen.insert(trimmed.to_string()) {
                    invalid.push(UrlFailure::from_fetch(trimmed, &e));
                }
            }
        }
    }
    (targets, invalid)
}

pub fn normalize_url(raw: &str) -> Result<Url, FetchError> {
    let trimmed = raw.trim();
    let invalid = |reason: String| FetchError::InvalidUrl {
        url: trimmed.to_string(),
        reason,
    };

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };
    let url = Url::parse(&candidate).map_err(|e| invalid(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

#[cfg(test)]
mod tests;
