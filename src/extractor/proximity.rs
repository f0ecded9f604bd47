use super::{collapse_whitespace, mailto_address, parse_selector};
use super::{CompiledRules, ExtractionStrategy, ExtractorError};
use crate::contact::ContactRecord;
use scraper::{ElementRef, Html, Selector};

/// Content under these elements never reaches a reader.
const INVISIBLE_TAGS: &[&str] = &["head", "script", "style", "noscript", "template", "svg"];

/// Elements that continue the current line of text instead of starting a
/// new segment.
const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "cite", "code", "em", "font", "i", "label", "mark", "q", "s",
    "small", "span", "strong", "sub", "sup", "time", "u",
];

/// Finds emails in visible text and `mailto:` links, then looks for a name
/// and job title in the smallest surrounding block that belongs to that
/// email alone.
pub struct ProximityStrategy {
    links: Selector,
}

impl ProximityStrategy {
    pub fn new() -> Result<Self, ExtractorError> {
        Ok(Self {
            links: parse_selector("a[href]")?,
        })
    }

    /// Climbs from `start` while the container stays short and mentions no
    /// other address. Returns the widest such container with its visible
    /// segments.
    fn context<'a>(
        &self,
        start: ElementRef<'a>,
        rules: &CompiledRules,
    ) -> Option<(ElementRef<'a>, Vec<String>)> {
        let mut best = None;
        let mut current = Some(start);

        for _ in 0..=rules.max_ancestor_depth {
            let Some(element) = current else {
                break;
            };
            if element.value().name() == "html" {
                break;
            }
            let Some(segments) =
                visible_segments(element, rules.max_context_chars, rules.max_nesting)
            else {
                break;
            };
            if self.distinct_addresses(element, &segments, rules) > 1 {
                break;
            }
            best = Some((element, segments));
            current = element.parent().and_then(ElementRef::wrap);
        }
        best
    }

    fn distinct_addresses(
        &self,
        container: ElementRef<'_>,
        segments: &[String],
        rules: &CompiledRules,
    ) -> usize {
        let mut addresses = rules.distinct_emails(&segments.join(" "));
        for link in container.select(&self.links) {
            let address = link
                .value()
                .attr("href")
                .and_then(mailto_address)
                .and_then(|a| rules.first_email(&a));
            if let Some(address) = address {
                addresses.insert(address.to_lowercase());
            }
        }
        addresses.len()
    }

    /// First personal LinkedIn profile linked from `container`.
    fn linkedin(&self, container: ElementRef<'_>) -> Option<String> {
        container
            .select(&self.links)
            .filter_map(|link| link.value().attr("href"))
            .find(|href| is_linkedin_profile(href))
            .map(|href| href.trim().to_string())
    }

    fn associate(
        &self,
        email: &str,
        context: Option<&(ElementRef<'_>, Vec<String>)>,
        source_url: &str,
        rules: &CompiledRules,
    ) -> ContactRecord {
        let mut record = ContactRecord::new(source_url).with_email(email);
        if let Some((container, segments)) = context {
            record.name = segments.iter().find_map(|s| rules.find_name(s));
            record.job_title = segments
                .iter()
                .find_map(|s| rules.find_title(s, record.name.as_deref()));
            record.linkedin = self.linkedin(*container);
        }
        record
    }
}

pub(crate) fn is_linkedin_profile(href: &str) -> bool {
    href.to_ascii_lowercase().contains("linkedin.com/in/")
}

impl ExtractionStrategy for ProximityStrategy {
    fn name(&self) -> &'static str {
        "proximity"
    }

    fn extract(
        &self,
        document: &Html,
        source_url: &str,
        rules: &CompiledRules,
    ) -> Vec<ContactRecord> {
        let mut out = Vec::new();

        for node in document.root_element().descendants() {
            if let Some(text) = node.value().as_text() {
                let content: &str = text;
                let emails: Vec<&str> = rules.find_emails(content).collect();
                if emails.is_empty() {
                    continue;
                }
                let Some(parent) = node.parent().and_then(ElementRef::wrap) else {
                    continue;
                };
                if is_hidden(parent) {
                    continue;
                }
                let context = self.context(parent, rules);
                for email in emails {
                    out.push(self.associate(email, context.as_ref(), source_url, rules));
                }
            } else if let Some(element) = ElementRef::wrap(node) {
                if element.value().name() != "a" || is_hidden(element) {
                    continue;
                }
                let email = element
                    .value()
                    .attr("href")
                    .and_then(mailto_address)
                    .and_then(|a| rules.first_email(&a));
                if let Some(email) = email {
                    let context = self.context(element, rules);
                    out.push(self.associate(&email, context.as_ref(), source_url, rules));
                }
            }
        }
        out
    }
}

fn is_hidden(element: ElementRef<'_>) -> bool {
    INVISIBLE_TAGS.contains(&element.value().name())
        || element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|e| INVISIBLE_TAGS.contains(&e.value().name()))
}

/// Visible text of `element` split into lines at block boundaries. `None`
/// once more than `budget` characters have been seen or the markup nests
/// deeper than `max_nesting`.
fn visible_segments(
    element: ElementRef<'_>,
    budget: usize,
    max_nesting: usize,
) -> Option<Vec<String>> {
    let mut collector = SegmentCollector {
        segments: Vec::new(),
        buffer: String::new(),
        chars: 0,
        budget,
        max_nesting,
    };
    collector.visit(element, 0)?;
    collector.flush();
    Some(collector.segments)
}

struct SegmentCollector {
    segments: Vec<String>,
    buffer: String,
    chars: usize,
    budget: usize,
    max_nesting: usize,
}

impl SegmentCollector {
    fn visit(&mut self, element: ElementRef<'_>, depth: usize) -> Option<()> {
        if depth > self.max_nesting {
            return None;
        }
        for child in element.children() {
            if let Some(text) = child.value().as_text() {
                let content: &str = text;
                self.chars += content.trim().chars().count();
                if self.chars > self.budget {
                    return None;
                }
                self.buffer.push_str(content);
            } else if let Some(child) = ElementRef::wrap(child) {
                let name = child.value().name();
                if INVISIBLE_TAGS.contains(&name) {
                    continue;
                }
                if INLINE_TAGS.contains(&name) {
                    self.visit(child, depth + 1)?;
                } else {
                    self.flush();
                    self.visit(child, depth + 1)?;
                    self.flush();
                }
            }
        }
        Some(())
    }

    fn flush(&mut self) {
        let segment = collapse_whitespace(&self.buffer);
        self.buffer.clear();
        if !segment.is_empty() {
            self.segments.push(segment);
        }
    }
}
