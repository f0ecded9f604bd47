mod proximity;
mod rules;
mod structured;

pub use proximity::ProximityStrategy;
pub use rules::{CompiledRules, ExtractionRules, DEFAULT_EMAIL_PATTERN};
pub use structured::{JsonLdStrategy, MetaTagStrategy, VCardStrategy};

use crate::contact::ContactRecord;
use crate::http::Page;
use log::{debug, trace};
use scraper::{Html, Selector};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// One way of finding contacts in a parsed page. Every record a strategy
/// returns must carry an email.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(
        &self,
        document: &Html,
        source_url: &str,
        rules: &CompiledRules,
    ) -> Vec<ContactRecord>;
}

/// The contact candidates found on one page.
#[derive(Debug)]
pub struct Contacts {
    inner: std::vec::IntoIter<ContactRecord>,
}

impl Contacts {
    pub fn empty() -> Self {
        Self {
            inner: Vec::new().into_iter(),
        }
    }
}

impl Iterator for Contacts {
    type Item = ContactRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Contacts {}

pub struct ContactExtractor {
    rules: CompiledRules,
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl ContactExtractor {
    /// Structured data first (JSON-LD, hCard), then meta tags, then the
    /// proximity heuristics.
    pub fn new(rules: ExtractionRules) -> Result<Self, ExtractorError> {
        let strategies: Vec<Box<dyn ExtractionStrategy>> = vec![
            Box::new(JsonLdStrategy::new()?),
            Box::new(VCardStrategy::new()?),
            Box::new(MetaTagStrategy::new()?),
            Box::new(ProximityStrategy::new()?),
        ];
        Self::with_strategies(rules, strategies)
    }

    pub fn with_strategies(
        rules: ExtractionRules,
        strategies: Vec<Box<dyn ExtractionStrategy>>,
    ) -> Result<Self, ExtractorError> {
        Ok(Self {
            rules: rules.compile()?,
            strategies,
        })
    }

    pub fn rules(&self) -> &CompiledRules {
        &self.rules
    }

    pub fn extract_page(&self, page: &Page) -> Contacts {
        if !page.is_extractable() {
            debug!("Skipping extraction for non-text content at {}", page.final_url);
            return Contacts::empty();
        }
        self.extract(&page.body, page.final_url.as_str())
    }

    /// Runs every strategy over `content` and merges the results by
    /// lower-cased email, keeping first-seen order.
    pub fn extract(&self, content: &str, source_url: &str) -> Contacts {
        if content.trim().is_empty() {
            return Contacts::empty();
        }

        let document = Html::parse_document(content);
        let mut merged: Vec<ContactRecord> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for strategy in &self.strategies {
            let found = strategy.extract(&document, source_url, &self.rules);
            trace!(
                "Strategy {} found {} candidates on {}",
                strategy.name(),
                found.len(),
                source_url
            );

            for record in found {
                let Some(key) = record.email.as_ref().map(|e| e.to_lowercase()) else {
                    continue;
                };
                match index.get(&key) {
                    Some(&position) => merged[position].fill_missing_from(&record),
                    None => {
                        index.insert(key, merged.len());
                        merged.push(record);
                    }
                }
            }
        }

        debug!("Extracted {} contact candidates from {}", merged.len(), source_url);
        Contacts {
            inner: merged.into_iter(),
        }
    }
}

pub(crate) fn parse_selector(css: &str) -> Result<Selector, ExtractorError> {
    Selector::parse(css).map_err(|e| ExtractorError::InvalidSelector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The address part of a `mailto:` href, if there is one.
pub(crate) fn mailto_address(href: &str) -> Option<String> {
    let trimmed = href.trim();
    if !trimmed
        .get(..7)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("mailto:"))
    {
        return None;
    }
    let address = trimmed[7..].split('?').next().unwrap_or_default();
    let decoded = address.replace("%40", "@").replace("%2E", ".").replace("%2e", ".");
    Some(decoded.trim().to_string())
}

#[cfg(test)]
mod tests;
