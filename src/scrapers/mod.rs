pub mod http_scraper;
pub mod mock_scraper;
#[cfg(feature = "webdriver")]
pub mod webdriver_scraper;

mod scraper;
pub use http_scraper::{HttpScraper, HttpScraperError};
pub use mock_scraper::{MockResponse, MockScraper};
pub use scraper::Scraper;
#[cfg(feature = "webdriver")]
pub use webdriver_scraper::WebDriverScraper;
