use super::*;
use crate::contact::ValidatedRecord;
use crate::core::retry::RetryConfig;
use crate::core::{RateLimit, ScraperError};
use crate::http::Page;
use crate::scrapers::{MockResponse, MockScraper};
use crate::storage::CsvStore;
use crate::validator::RejectionKind;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

fn person_page(name: &str, title: &str, email: &str) -> String {
    format!(
        r#"<html><body><div class="person"><h3>{}</h3><p>{}</p>
        <a href="mailto:{}">{}</a></div></body></html>"#,
        name, title, email, email
    )
}

fn no_retry() -> ScrapeConfig {
    ScrapeConfig::default().without_rate_limits().with_retry(RetryConfig::default())
}

fn crawler(scraper: MockScraper, config: ScrapeConfig) -> Crawler {
    Crawler::new(Box::new(scraper)).unwrap().with_config(config)
}

fn temp_store() -> (TempDir, PathBuf, Arc<CsvStore>) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("contacts.csv");
    let store = Arc::new(CsvStore::new(&path));
    (dir, path, store)
}

fn urls(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_failed_site_does_not_stop_the_run() {
    let scraper = MockScraper::new()
        .with_route(
            "http://a.com",
            vec![MockResponse::error(FetchError::Connection(
                "connection refused".to_string(),
            ))],
        )
        .with_page("http://b.com", &person_page("Jane Smith", "CTO", "jane@b.com"));
    let (_dir, path, store) = temp_store();

    let report = crawler(scraper, no_retry())
        .run(urls(&["a.com", "b.com"]), store)
        .await
        .unwrap();

    let rows = CsvStore::read_all(&path).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].email.as_deref(), Some("jane@b.com"));
    assert_eq!(rows[0].name.as_deref(), Some("Jane Smith"));
    assert_eq!(rows[0].job_title.as_deref(), Some("CTO"));
    assert_eq!(rows[0].source_url, "http://b.com/");

    assert_eq!(report.total, 2);
    assert_eq!(report.completed, 2);
    assert_eq!(report.rows_written, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].url, "http://a.com/");
    assert_eq!(report.failures[0].kind, FailureKind::Connection);
    assert!(report.cancelled.is_empty());
}

#[tokio::test]
async fn test_error_status_is_reported_as_failure() {
    let scraper = MockScraper::new();
    let (_dir, _path, store) = temp_store();

    let report = crawler(scraper, no_retry())
        .run(urls(&["https://nowhere.test"]), store)
        .await
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind, FailureKind::HttpStatus);
}

#[tokio::test]
async fn test_seeded_email_is_not_written_again() {
    let (_dir, path, store) = temp_store();
    std::fs::write(
        &path,
        "source_url,name,email,job_title\nhttps://y.com/,,x@y.com,\n",
    )
    .unwrap();
    store.seed().await.unwrap();

    let scraper = MockScraper::new().with_page(
        "https://y.com/team",
        &person_page("Xavier Young", "Founder", "x@Y.com"),
    );
    let report = crawler(scraper, no_retry())
        .run(urls(&["https://y.com/team"]), store)
        .await
        .unwrap();

    assert_eq!(report.rows_written, 0);
    assert_eq!(report.duplicates, 1);
    assert_eq!(CsvStore::read_all(&path).unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancellation_keeps_only_completed_rows() {
    let slow = Duration::from_secs(10);
    let mut scraper = MockScraper::new().with_page(
        "https://one.test",
        &person_page("Ann One", "CEO", "ann@one.test"),
    );
    for site in ["two", "three", "four", "five"] {
        let email = format!("boss@{}.test", site);
        scraper = scraper.with_route(
            &format!("https://{}.test", site),
            vec![MockResponse::html(&person_page("Bob Boss", "CEO", &email)).with_delay(slow)],
        );
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<Progress>();
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            if progress.completed >= 1 {
                canceller.cancel();
            }
        }
    });

    let (_dir, path, store) = temp_store();
    let started = std::time::Instant::now();
    let report = crawler(scraper, no_retry().with_concurrency(1))
        .with_progress(tx)
        .with_cancellation(token)
        .run(
            urls(&[
                "https://one.test",
                "https://two.test",
                "https://three.test",
                "https://four.test",
                "https://five.test",
            ]),
            store,
        )
        .await
        .unwrap();

    assert!(started.elapsed() < slow);
    assert_eq!(report.completed, 1);
    assert_eq!(report.cancelled.len(), 4);
    assert!(report.was_cancelled());

    let rows = CsvStore::read_all(&path).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].email.as_deref(), Some("ann@one.test"));
}

#[tokio::test]
async fn test_progress_counts_up_to_total() {
    let scraper = MockScraper::new()
        .with_page("https://a.test", &person_page("Ann Able", "CEO", "ann@a.test"))
        .with_page("https://b.test", "<p>nothing here</p>");
    let (tx, mut rx) = mpsc::unbounded_channel::<Progress>();
    let (_dir, _path, store) = temp_store();

    crawler(scraper, no_retry())
        .with_progress(tx)
        .run(urls(&["https://a.test", "https://b.test", "ftp://c.test"]), store)
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Ok(progress) = rx.try_recv() {
        events.push(progress);
    }
    assert_eq!(events.first(), Some(&Progress { completed: 0, total: 3 }));
    assert_eq!(events.last(), Some(&Progress { completed: 3, total: 3 }));
    assert!(events.windows(2).all(|w| w[0].completed < w[1].completed));
}

#[tokio::test]
async fn test_inputs_are_normalised_and_deduplicated() {
    let scraper = MockScraper::new().with_page("http://a.com", "<p>nothing</p>");
    let recorder = scraper.clone();
    let (_dir, _path, store) = temp_store();

    let report = crawler(scraper, no_retry())
        .run(urls(&["a.com", "  http://a.com/ ", "", "http://exa mple.com"]), store)
        .await
        .unwrap();

    assert_eq!(report.total, 2);
    assert_eq!(recorder.calls("http://a.com"), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind, FailureKind::InvalidUrl);
    assert_eq!(report.failures[0].url, "http://exa mple.com");
}

#[tokio::test]
async fn test_rejections_are_counted() {
    let html = r#"<html><body>
        <p>Logo asset: logo@2x.png</p>
        <p>Template address user@example.com</p>
        <p>Real person: kim@acme.test</p>
    </body></html>"#;
    let scraper = MockScraper::new().with_page("https://acme.test", html);
    let (_dir, _path, store) = temp_store();

    let report = crawler(scraper, no_retry())
        .run(urls(&["https://acme.test"]), store)
        .await
        .unwrap();

    assert_eq!(report.records_extracted, 3);
    assert_eq!(report.rows_written, 1);
    assert_eq!(report.records_rejected, 2);
    assert_eq!(
        report.rejections.get(&RejectionKind::InvalidEmailSyntax),
        Some(&1)
    );
    assert_eq!(
        report.rejections.get(&RejectionKind::BlocklistedDomain),
        Some(&1)
    );
}

#[tokio::test]
async fn test_follow_links_visits_contact_pages() {
    let root = r#"<html><body>
        <a href="/contact">Contact</a>
        <a href="/about">About us</a>
        <a href="/pricing">Pricing</a>
    </body></html>"#;
    let scraper = MockScraper::new()
        .with_page("http://acme.test", root)
        .with_page(
            "http://acme.test/contact",
            &person_page("Lena Ortiz", "Managing Director", "lena@acme.test"),
        )
        .with_route("http://acme.test/about", vec![MockResponse::status(500, "")]);
    let recorder = scraper.clone();
    let (_dir, path, store) = temp_store();

    let crawler = crawler(scraper, no_retry().with_follow_links(2));
    let report = crawler
        .run(urls(&["acme.test"]), store)
        .await
        .unwrap();

    assert!(report.failures.is_empty());
    assert_eq!(report.completed, 1);
    assert_eq!(recorder.calls("http://acme.test/pricing"), 0);
    assert_eq!(crawler.stats().get_stats().subpages_failed, 1);

    let rows = CsvStore::read_all(&path).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].source_url, "http://acme.test/contact");
    assert_eq!(rows[0].job_title.as_deref(), Some("Managing Director"));
}

struct FailingStore;

#[async_trait]
impl RecordStore for FailingStore {
    async fn seed(&self) -> Result<usize, StorageError> {
        Ok(0)
    }

    async fn append(&self, _record: &ValidatedRecord) -> Result<bool, StorageError> {
        Err(StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )))
    }

    fn len(&self) -> usize {
        0
    }
}

#[tokio::test]
async fn test_store_failure_stops_the_run() {
    let scraper = MockScraper::new()
        .with_page("https://a.test", &person_page("Ann Able", "CEO", "ann@a.test"))
        .with_page("https://b.test", &person_page("Ben Baker", "CFO", "ben@b.test"));

    let result = crawler(scraper, no_retry().with_concurrency(1))
        .run(urls(&["https://a.test", "https://b.test"]), Arc::new(FailingStore))
        .await;

    assert!(matches!(result, Err(ScraperError::Storage(_))));
}

/// Tracks how many fetches are running at once.
#[derive(Clone)]
struct CountingScraper {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    stats: Arc<StatsTracker>,
}

#[async_trait]
impl Scraper for CountingScraper {
    async fn fetch_single(&self, url: &Url, _config: &ScrapeConfig) -> Result<Page, FetchError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(Page::new(url.clone(), 200, HashMap::new(), String::new()))
    }

    fn box_clone(&self) -> Box<dyn Scraper> {
        Box::new(self.clone())
    }

    fn stats(&self) -> &StatsTracker {
        &self.stats
    }

    fn set_stats(&mut self, stats: Arc<StatsTracker>) {
        self.stats = stats;
    }
}

#[tokio::test]
async fn test_concurrency_limit_is_respected() {
    let peak = Arc::new(AtomicUsize::new(0));
    let scraper = CountingScraper {
        current: Arc::new(AtomicUsize::new(0)),
        peak: Arc::clone(&peak),
        stats: Arc::new(StatsTracker::new()),
    };
    let (_dir, _path, store) = temp_store();
    let targets: Vec<String> = (0..8).map(|i| format!("https://site{}.test", i)).collect();

    let report = Crawler::new(Box::new(scraper))
        .unwrap()
        .with_config(no_retry().with_concurrency(3))
        .run(targets, store)
        .await
        .unwrap();

    assert_eq!(report.completed, 8);
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(peak.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn test_requests_to_one_host_are_throttled() {
    let scraper = MockScraper::new()
        .with_page("https://acme.test/a", "<p>a</p>")
        .with_page("https://acme.test/b", "<p>b</p>")
        .with_page("https://acme.test/c", "<p>c</p>")
        .with_page("https://other.test/", "<p>other</p>");
    let (_dir, _path, store) = temp_store();
    let config = no_retry()
        .with_concurrency(4)
        .with_rate_limits(None, Some(RateLimit::per_second(10.0)));

    let started = std::time::Instant::now();
    let report = crawler(scraper, config)
        .run(
            urls(&[
                "https://acme.test/a",
                "https://acme.test/b",
                "https://acme.test/c",
                "https://other.test",
            ]),
            store,
        )
        .await
        .unwrap();

    assert_eq!(report.completed, 4);
    assert!(report.failures.is_empty());
    // Three acme.test requests need two 100ms gaps.
    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn test_deeply_nested_page_does_not_abort_the_run() {
    let depth = 10_000;
    let deep = format!(
        r#"<html><body><a href="mailto:deep@deep.test">{}x{}</a></body></html>"#,
        "<span>".repeat(depth),
        "</span>".repeat(depth)
    );
    let scraper = MockScraper::new()
        .with_page("https://ok.test", &person_page("Ann Able", "CEO", "ann@ok.test"))
        .with_page("https://deep.test", &deep);
    let (_dir, path, store) = temp_store();

    let report = crawler(scraper, no_retry())
        .run(urls(&["https://ok.test", "https://deep.test"]), store)
        .await
        .unwrap();

    assert_eq!(report.completed, 2);
    assert!(report.failures.is_empty());
    assert_eq!(report.rows_written, 2);
    let emails: Vec<Option<String>> = CsvStore::read_all(&path)
        .unwrap()
        .into_iter()
        .map(|row| row.email)
        .collect();
    assert!(emails.contains(&Some("deep@deep.test".to_string())));
}

#[test]
fn test_normalize_url() {
    assert_eq!(normalize_url("acme.test").unwrap().as_str(), "http://acme.test/");
    assert_eq!(
        normalize_url(" https://acme.test/team ").unwrap().as_str(),
        "https://acme.test/team"
    );
    assert!(matches!(
        normalize_url("ftp://acme.test"),
        Err(FetchError::InvalidUrl { .. })
    ));
    assert!(normalize_url("http://").is_err());
}
