use crate::extractor::{parse_selector, ExtractorError};
use log::trace;
use scraper::{Html, Selector};
use std::collections::HashMap;
use url::Url;

pub const DEFAULT_LINK_KEYWORDS: &[&str] = &[
    "contact", "about", "team", "leadership", "staff", "people", "management", "our-team",
    "who-we-are", "company", "imprint", "impressum", "kontakt",
];

const SKIPPED_EXTENSIONS: &[&str] = &[
    ".json", ".css", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".ico", ".js", ".pdf", ".xml",
    ".zip", ".webp", ".mp4",
];

/// Picks the same-site pages most likely to list people: contact, about
/// and team pages.
pub struct ContactLinkFinder {
    links: Selector,
    keywords: Vec<String>,
}

impl ContactLinkFinder {
    pub fn new() -> Result<Self, ExtractorError> {
        Ok(Self {
            links: parse_selector("a[href]")?,
            keywords: DEFAULT_LINK_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        })
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords.into_iter().map(|k| k.to_lowercase()).collect();
        self
    }

    /// Up to `limit` links from `html`, best first. Only links on the same
    /// host as `base` that match a keyword in their path or text qualify.
    pub fn find(&self, html: &str, base: &Url, limit: usize) -> Vec<Url> {
        if limit == 0 {
            return Vec::new();
        }

        let document = Html::parse_document(html);
        // url -> (score, first position)
        let mut candidates: HashMap<String, (usize, usize, Url)> = HashMap::new();

        for (position, anchor) in document.select(&self.links).enumerate() {
            let Some(href) = anchor.value().attr("href").map(str::trim) else {
                continue;
            };
            let Some(url) = resolve(base, href) else {
                continue;
            };
            let text = anchor.text().collect::<String>().to_lowercase();
            let Some(score) = self.score(&url, &text) else {
                continue;
            };

            let entry = candidates
                .entry(url.to_string())
                .or_insert((score, position, url));
            entry.0 = entry.0.max(score);
        }

        let mut ranked: Vec<(usize, usize, Url)> = candidates.into_values().collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        ranked.truncate(limit);
        trace!("Ranked contact links on {}: {:?}", base, ranked);
        ranked.into_iter().map(|(_, _, url)| url).collect()
    }

    /// Path keyword +5, link text keyword +3, plus a bonus for shallow
    /// paths. `None` when neither path nor text mentions a keyword.
    fn score(&self, url: &Url, text: &str) -> Option<usize> {
        let path = url.path().to_lowercase();
        let in_path = self.keywords.iter().any(|k| path.contains(k.as_str()));
        let in_text = self.keywords.iter().any(|k| text.contains(k.as_str()));
        if !in_path && !in_text {
            return None;
        }

        let depth = path.matches('/').count();
        let mut score = 3usize.saturating_sub(depth);
        if in_path {
            score += 5;
        }
        if in_text {
            score += 3;
        }
        Some(score)
    }
}

fn resolve(base: &Url, href: &str) -> Option<Url> {
    let lower = href.to_lowercase();
    if href.is_empty()
        || href.starts_with('#')
        || ["mailto:", "tel:", "javascript:", "data:"]
            .iter()
            .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let mut url = base.join(href).ok()?;
    url.set_fragment(None);
    if !matches!(url.scheme(), "http" | "https") || url.host_str() != base.host_str() {
        return None;
    }
    let path = url.path().to_lowercase();
    if SKIPPED_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return None;
    }

    let mut page = base.clone();
    page.set_fragment(None);
    if url == page {
        return None;
    }
    Some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finder() -> ContactLinkFinder {
        ContactLinkFinder::new().unwrap()
    }

    #[test]
    fn test_ranks_contact_pages_and_stays_on_site() {
        let base = Url::parse("https://acme.test/").unwrap();
        let html = r##"<html><body>
            <a href="/products/widgets">Widgets</a>
            <a href="/company/history/about-us">History</a>
            <a href="/contact">Contact us</a>
            <a href="https://elsewhere.test/contact">Partner contact</a>
            <a href="/team">Meet the team</a>
            <a href="/contact#form">Contact form</a>
            <a href="mailto:info@acme.test">Email us about anything</a>
            <a href="/about/brochure.pdf">About (PDF)</a>
            <a href="#top">Back to top</a>
        </body></html>"##;

        let links: Vec<String> = finder()
            .find(html, &base, 10)
            .into_iter()
            .map(|u| u.path().to_string())
            .collect();

        assert_eq!(links, vec!["/contact", "/team", "/company/history/about-us"]);
    }

    #[test]
    fn test_respects_limit() {
        let base = Url::parse("https://acme.test/").unwrap();
        let html = r#"<a href="/contact">Contact</a><a href="/about">About</a><a href="/team">Team</a>"#;

        assert_eq!(finder().find(html, &base, 2).len(), 2);
        assert!(finder().find(html, &base, 0).is_empty());
    }

    #[test]
    fn test_skips_the_page_itself() {
        let base = Url::parse("https://acme.test/contact").unwrap();
        let html = r#"<a href="/contact">Contact</a><a href="contact#map">Map</a>"#;
        assert!(finder().find(html, &base, 5).is_empty());
    }
}
