pub mod contact;
pub mod core;
pub mod extractor;
pub mod http;
pub mod scrapers;
pub mod stats;
pub mod storage;
pub mod validator;

pub use contact::{ContactRecord, ValidatedRecord};
pub use core::{
    CrawlReport, Crawler, FetchError, Progress, ScrapeConfig, ScraperError, ScraperResult,
};
pub use extractor::{ContactExtractor, ExtractionRules};
pub use scrapers::{HttpScraper, MockScraper, Scraper};
pub use stats::StatsTracker;
pub use storage::{CsvStore, RecordStore};
pub use validator::{DataValidator, ValidationPolicy};
