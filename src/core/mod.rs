pub mod config;
mod crawler;
mod errors;
pub mod links;
pub mod rate_limit;
pub mod report;
pub mod retry;

pub use config::{ConfigError, ScrapeConfig};
pub use crawler::{normalize_url, Crawler};
pub use errors::{FailureKind, FetchError, ScraperError, ScraperResult};
pub use links::ContactLinkFinder;
pub use rate_limit::{RateLimit, RateLimiter};
pub use report::{CrawlReport, Progress, UrlFailure};
