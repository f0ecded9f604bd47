use super::{collapse_whitespace, mailto_address, parse_selector};
use super::proximity::is_linkedin_profile;
use super::{CompiledRules, ExtractionStrategy, ExtractorError};
use crate::contact::ContactRecord;
use log::debug;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};

/// schema.org data in `<script type="application/ld+json">` blocks.
pub struct JsonLdStrategy {
    scripts: Selector,
}

impl JsonLdStrategy {
    pub fn new() -> Result<Self, ExtractorError> {
        Ok(Self {
            scripts: parse_selector(r#"script[type="application/ld+json"]"#)?,
        })
    }

    fn walk(value: &Value, source_url: &str, rules: &CompiledRules, out: &mut Vec<ContactRecord>) {
        match value {
            Value::Array(items) => {
                for item in items {
                    Self::walk(item, source_url, rules, out);
                }
            }
            Value::Object(map) => {
                if let Some(record) = Self::record_from(map, source_url, rules) {
                    out.push(record);
                }
                for (key, nested) in map {
                    if key != "@context" && (nested.is_object() || nested.is_array()) {
                        Self::walk(nested, source_url, rules, out);
                    }
                }
            }
            _ => {}
        }
    }

    fn record_from(
        map: &Map<String, Value>,
        source_url: &str,
        rules: &CompiledRules,
    ) -> Option<ContactRecord> {
        let raw_email = map.get("email").and_then(Value::as_str)?;
        let email = rules.first_email(&mailto_address(raw_email).unwrap_or_else(|| raw_email.to_string()))?;
        let mut record = ContactRecord::new(source_url).with_email(email);

        if is_person(map.get("@type")) {
            let name = map
                .get("name")
                .and_then(Value::as_str)
                .map(collapse_whitespace)
                .or_else(|| {
                    let given = map.get("givenName").and_then(Value::as_str)?;
                    let family = map.get("familyName").and_then(Value::as_str)?;
                    Some(collapse_whitespace(&format!("{} {}", given, family)))
                })
                .filter(|n| !n.is_empty());
            record.name = name;
            record.job_title = map
                .get("jobTitle")
                .and_then(Value::as_str)
                .map(collapse_whitespace)
                .filter(|t| !t.is_empty());
            record.linkedin = same_as_linkedin(map.get("sameAs"));
        }
        Some(record)
    }
}

/// `sameAs` is a URL or a list of them.
fn same_as_linkedin(same_as: Option<&Value>) -> Option<String> {
    let profile = |value: &Value| {
        value
            .as_str()
            .filter(|url| is_linkedin_profile(url))
            .map(|url| url.trim().to_string())
    };
    match same_as? {
        Value::Array(urls) => urls.iter().find_map(profile),
        other => profile(other),
    }
}

fn is_person(type_value: Option<&Value>) -> bool {
    match type_value {
        Some(Value::String(name)) => name == "Person",
        Some(Value::Array(names)) => names.iter().any(|n| n.as_str() == Some("Person")),
        _ => false,
    }
}

impl ExtractionStrategy for JsonLdStrategy {
    fn name(&self) -> &'static str {
        "json-ld"
    }

    fn extract(
        &self,
        document: &Html,
        source_url: &str,
        rules: &CompiledRules,
    ) -> Vec<ContactRecord> {
        let mut out = Vec::new();
        for script in document.select(&self.scripts) {
            let raw = script.text().collect::<String>();
            match serde_json::from_str::<Value>(&raw) {
                Ok(value) => Self::walk(&value, source_url, rules, &mut out),
                Err(e) => debug!("Ignoring malformed JSON-LD on {}: {}", source_url, e),
            }
        }
        out
    }
}

/// hCard microformat: `.vcard` containers with `.fn`, `.email` and
/// `.title` / `.role` children.
pub struct VCardStrategy {
    cards: Selector,
    full_name: Selector,
    email: Selector,
    title: Selector,
}

impl VCardStrategy {
    pub fn new() -> Result<Self, ExtractorError> {
        Ok(Self {
            cards: parse_selector(".vcard, .h-card")?,
            full_name: parse_selector(".fn, .p-name")?,
            email: parse_selector(".email, .u-email")?,
            title: parse_selector(".title, .role, .p-job-title")?,
        })
    }

    fn first_text(card: &ElementRef<'_>, selector: &Selector) -> Option<String> {
        card.select(selector)
            .map(|e| collapse_whitespace(&e.text().collect::<Vec<_>>().join(" ")))
            .find(|t| !t.is_empty())
    }
}

impl ExtractionStrategy for VCardStrategy {
    fn name(&self) -> &'static str {
        "hcard"
    }

    fn extract(
        &self,
        document: &Html,
        source_url: &str,
        rules: &CompiledRules,
    ) -> Vec<ContactRecord> {
        let mut out = Vec::new();
        for card in document.select(&self.cards) {
            let email = card.select(&self.email).find_map(|element| {
                let from_href = element
                    .value()
                    .attr("href")
                    .and_then(mailto_address)
                    .and_then(|address| rules.first_email(&address));
                from_href.or_else(|| rules.first_email(&element.text().collect::<String>()))
            });
            let Some(email) = email else {
                continue;
            };

            let mut record = ContactRecord::new(source_url).with_email(email);
            record.name = Self::first_text(&card, &self.full_name);
            record.job_title = Self::first_text(&card, &self.title);
            out.push(record);
        }
        out
    }
}

/// Emails mentioned in `description` / `keywords` meta tags.
pub struct MetaTagStrategy {
    metas: Selector,
}

impl MetaTagStrategy {
    pub fn new() -> Result<Self, ExtractorError> {
        Ok(Self {
            metas: parse_selector("meta[name][content]")?,
        })
    }
}

impl ExtractionStrategy for MetaTagStrategy {
    fn name(&self) -> &'static str {
        "meta"
    }

    fn extract(
        &self,
        document: &Html,
        source_url: &str,
        rules: &CompiledRules,
    ) -> Vec<ContactRecord> {
        let mut out = Vec::new();
        for meta in document.select(&self.metas) {
            let name = meta.value().attr("name").unwrap_or_default().to_lowercase();
            if !(name.contains("description") || name.contains("keywords")) {
                continue;
            }
            let content = meta.value().attr("content").unwrap_or_default();
            for email in rules.find_emails(content) {
                out.push(ContactRecord::new(source_url).with_email(email));
            }
        }
        out
    }
}
