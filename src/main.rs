use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use contact_scraper::core::retry::RetryConfig;
use contact_scraper::scrapers::HttpScraper;
use contact_scraper::core::RateLimit;
use contact_scraper::storage::{write_failures, write_report_json, CsvStore, RecordStore};
use contact_scraper::{Crawler, ScrapeConfig, Scraper};
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    Http,
    Webdriver,
}

/// Collects names, job titles and email addresses from company websites
/// into a deduplicated CSV file.
#[derive(Debug, Parser)]
#[command(name = "contact-scraper", version)]
struct Args {
    /// Websites to scrape; a missing scheme defaults to http://
    urls: Vec<String>,

    /// File with one URL per line; blank lines and # comments are ignored
    #[arg(short, long)]
    input: Option<PathBuf>,

    #[arg(short, long, default_value = "contacts.csv")]
    output: PathBuf,

    /// Write failed URLs as CSV
    #[arg(long)]
    failures: Option<PathBuf>,

    /// Write the run report as JSON
    #[arg(long)]
    report_json: Option<PathBuf>,

    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Contact/about/team pages to follow per site
    #[arg(long)]
    follow_links: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    #[arg(long, value_enum, default_value_t = Backend::Http)]
    backend: Backend,

    #[arg(long, env = "WEBDRIVER_URL")]
    webdriver_url: Option<String>,

    /// Drop info@, sales@ and similar shared mailboxes
    #[arg(long)]
    reject_role_accounts: bool,

    #[arg(long)]
    no_retry: bool,

    /// Requests per second across all sites; 0 disables
    #[arg(long)]
    rate_limit: Option<f64>,

    /// Requests per second to one host; 0 disables
    #[arg(long)]
    host_rate_limit: Option<f64>,
}

impl Args {
    fn config(&self) -> anyhow::Result<ScrapeConfig> {
        let mut config = ScrapeConfig::from_env().context("invalid environment configuration")?;
        if let Some(concurrency) = self.concurrency {
            config = config.with_concurrency(concurrency);
        }
        if let Some(follow_links) = self.follow_links {
            config = config.with_follow_links(follow_links);
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(webdriver_url) = &self.webdriver_url {
            config = config.with_webdriver_url(webdriver_url);
        }
        if self.reject_role_accounts {
            config = config.with_reject_role_accounts(true);
        }
        if self.no_retry {
            config = config.with_retry(RetryConfig::default());
        }
        if self.rate_limit.is_some() || self.host_rate_limit.is_some() {
            let global = override_limit(config.rate_limiter.global(), self.rate_limit)?;
            let per_host = override_limit(config.rate_limiter.per_host(), self.host_rate_limit)?;
            config = config.with_rate_limits(global, per_host);
        }
        Ok(config)
    }

    fn targets(&self) -> anyhow::Result<Vec<String>> {
        let mut urls = self.urls.clone();
        if let Some(path) = &self.input {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            urls.extend(
                contents
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty() && !line.starts_with('#'))
                    .map(str::to_string),
            );
        }
        Ok(urls)
    }
}

fn override_limit(current: Option<RateLimit>, rate: Option<f64>) -> anyhow::Result<Option<RateLimit>> {
    match rate {
        None => Ok(current),
        Some(rate) if !rate.is_finite() || rate < 0.0 => {
            bail!("rate limits must be non-negative numbers, got {}", rate)
        }
        Some(rate) if rate == 0.0 => Ok(None),
        Some(rate) => Ok(Some(RateLimit::per_second(rate))),
    }
}

fn build_scraper(backend: Backend, config: &ScrapeConfig) -> anyhow::Result<Box<dyn Scraper>> {
    match backend {
        Backend::Http => Ok(Box::new(HttpScraper::from_config(config)?)),
        #[cfg(feature = "webdriver")]
        Backend::Webdriver => Ok(Box::new(
            contact_scraper::scrapers::WebDriverScraper::new(config),
        )),
        #[cfg(not(feature = "webdriver"))]
        Backend::Webdriver => bail!("this build has no WebDriver support; rebuild with --features webdriver"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .filter_module("selectors", log::LevelFilter::Warn)
        .filter_module("html5ever", log::LevelFilter::Error)
        .parse_default_env()
        .init();

    let args = Args::parse();
    let config = args.config()?;
    let urls = args.targets()?;
    if urls.is_empty() {
        bail!("no URLs given; pass them as arguments or with --input");
    }

    let store = Arc::new(CsvStore::new(&args.output));
    let seeded = store.seed().await?;
    info!(
        "Loaded {} existing contacts from {}",
        seeded,
        args.output.display()
    );

    let scraper = build_scraper(args.backend, &config)?;
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let crawler = Crawler::new(scraper)?
        .with_config(config)
        .with_progress(progress_tx);

    let token = crawler.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after in-flight writes");
            token.cancel();
        }
    });
    tokio::spawn(async move {
        while let Some(progress) = progress_rx.recv().await {
            info!("Progress: {}/{}", progress.completed, progress.total);
        }
    });

    let result = crawler.run(urls, store).await;
    crawler.close().await;
    let report = match result {
        Ok(report) => report,
        Err(e) => {
            error!("Run aborted: {}", e);
            return Err(e.into());
        }
    };

    report.print_summary();
    crawler.stats().print_summary();

    if let Some(path) = &args.failures {
        write_failures(path, &report.failures)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    if let Some(path) = &args.report_json {
        write_report_json(path, &report)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}
