use crate::contact::ContactRecord;
use crate::core::config::ScrapeConfig;
use crate::core::links::ContactLinkFinder;
use crate::core::report::SiteSummary;
use crate::core::FetchError;
use crate::extractor::ContactExtractor;
use crate::http::Page;
use crate::scrapers::Scraper;
use crate::stats::StatsTracker;
use crate::storage::{RecordStore, StorageError};
use crate::validator::DataValidator;
use log::{debug, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

pub(super) enum SiteOutcome {
    Done(SiteSummary),
    Failed(FetchError),
    Cancelled,
    StoreFailed(StorageError),
}

/// Everything one spawned site task needs.
pub(super) struct SiteTask {
    pub url: Url,
    pub scraper: Box<dyn Scraper>,
    pub config: Arc<ScrapeConfig>,
    pub extractor: Arc<ContactExtractor>,
    pub validator: Arc<DataValidator>,
    pub link_finder: Arc<ContactLinkFinder>,
    pub store: Arc<dyn RecordStore>,
    pub stats: Arc<StatsTracker>,
    pub cancel: CancellationToken,
}

impl SiteTask {
    pub async fn run(self) -> SiteOutcome {
        let page = match self.fetch(&self.url).await {
            Some(Ok(page)) => page,
            Some(Err(e)) => return SiteOutcome::Failed(e),
            None => return SiteOutcome::Cancelled,
        };

        let mut summary = SiteSummary::default();
        let links = if self.config.follow_links > 0 && page.is_extractable() {
            self.link_finder
                .find(&page.body, &page.final_url, self.config.follow_links)
        } else {
            Vec::new()
        };

        if let Err(e) = self.process(&page, &mut summary).await {
            return SiteOutcome::StoreFailed(e);
        }

        for link in links {
            let subpage = match self.fetch(&link).await {
                Some(Ok(subpage)) => subpage,
                Some(Err(e)) => {
                    warn!("Failed to fetch contact page {}: {}", link, e);
                    self.stats.record_subpage_failure();
                    continue;
                }
                None => {
                    debug!("Stopping link discovery on {} after cancellation", self.url);
                    break;
                }
            };
            if let Err(e) = self.process(&subpage, &mut summary).await {
                return SiteOutcome::StoreFailed(e);
            }
        }

        SiteOutcome::Done(summary)
    }

    /// `None` once the run is cancelled; the fetch is dropped mid-flight.
    async fn fetch(&self, url: &Url) -> Option<Result<Page, FetchError>> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = self.scraper.fetch(url, &self.config) => Some(result),
        }
    }

    /// Extracts and validates synchronously, then appends. Appends are not
    /// raced against cancellation.
    async fn process(&self, page: &Page, summary: &mut SiteSummary) -> Result<(), StorageError> {
        let candidates: Vec<ContactRecord> = self.extractor.extract_page(page).collect();
        summary.extracted += candidates.len();
        self.stats.record_extracted(candidates.len());

        for candidate in &candidates {
            match self.validator.validate(candidate) {
                Ok(record) => {
                    let written = self.store.append(&record).await?;
                    self.stats.record_accepted(written);
                    if written {
                        summary.written += 1;
                    } else {
                        summary.duplicates += 1;
                    }
                }
                Err(rejection) => {
                    debug!(
                        "Rejected {:?} from {}: {}",
                        candidate.email, candidate.source_url, rejection
                    );
                    self.stats.record_rejection(rejection.kind);
                    summary.rejections.push(rejection.kind);
                }
            }
        }
        Ok(())
    }
}
