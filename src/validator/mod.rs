use crate::contact::{ContactRecord, ValidatedRecord};
use crate::extractor::collapse_whitespace;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use url::Url;

const MAX_LOCAL_PART: usize = 64;
const MAX_ADDRESS: usize = 254;

const DEFAULT_ROLE_LOCAL_PARTS: &[&str] = &[
    "info", "noreply", "no-reply", "donotreply", "do-not-reply", "support", "admin",
    "webmaster", "postmaster", "sales", "contact", "hello", "office", "privacy", "abuse",
    "help", "marketing", "press", "jobs", "careers", "hr", "billing",
];

/// Placeholder and tracking domains that show up on real pages but never
/// belong to a person.
const DEFAULT_BLOCKED_DOMAINS: &[&str] = &[
    "example.com", "example.org", "example.net", "domain.com", "email.com", "sentry.io",
    "wixpress.com",
];

/// Image and asset names such as `logo@2x.png` look like addresses.
const DEFAULT_ASSET_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "webp", "css", "js", "ico", "bmp",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    MissingEmail,
    InvalidEmailSyntax,
    BlocklistedDomain,
    RoleAccount,
    Other,
}

impl RejectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionKind::MissingEmail => "missing_email",
            RejectionKind::InvalidEmailSyntax => "invalid_email_syntax",
            RejectionKind::BlocklistedDomain => "blocklisted_domain",
            RejectionKind::RoleAccount => "role_account",
            RejectionKind::Other => "other",
        }
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {detail}")]
pub struct Rejection {
    pub kind: RejectionKind,
    pub detail: String,
}

impl Rejection {
    fn new(kind: RejectionKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    pub reject_role_accounts: bool,
    pub role_local_parts: HashSet<String>,
    /// Matched exactly and as a parent domain.
    pub blocked_domains: HashSet<String>,
    pub asset_extensions: HashSet<String>,
    pub max_name_chars: usize,
    pub max_title_chars: usize,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            reject_role_accounts: false,
            role_local_parts: to_set(DEFAULT_ROLE_LOCAL_PARTS),
            blocked_domains: to_set(DEFAULT_BLOCKED_DOMAINS),
            asset_extensions: to_set(DEFAULT_ASSET_EXTENSIONS),
            max_name_chars: 80,
            max_title_chars: 120,
        }
    }
}

impl ValidationPolicy {
    pub fn with_reject_role_accounts(mut self, reject: bool) -> Self {
        self.reject_role_accounts = reject;
        self
    }

    pub fn with_blocked_domains(mut self, domains: &[&str]) -> Self {
        self.blocked_domains = to_set(domains);
        self
    }
}

/// Canonical `https://www.linkedin.com/in/<slug>` form of a personal
/// profile link. Company pages and other hosts yield `None`.
fn linkedin_profile(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let url = if raw.contains("://") {
        Url::parse(raw).ok()?
    } else {
        Url::parse(&format!("https://{}", raw)).ok()?
    };
    let host = url.host_str()?.to_ascii_lowercase();
    if host != "linkedin.com" && !host.ends_with(".linkedin.com") {
        return None;
    }
    let mut segments = url.path_segments()?;
    if segments.next() != Some("in") {
        return None;
    }
    let slug = segments.next().filter(|slug| {
        !slug.is_empty()
            && slug
                .chars()
                .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '%')
    })?;
    Some(format!("https://www.linkedin.com/in/{}", slug))
}

fn to_set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_lowercase()).collect()
}

/// Turns extracted candidates into records fit for storage.
#[derive(Debug, Clone, Default)]
pub struct DataValidator {
    policy: ValidationPolicy,
}

impl DataValidator {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    pub fn validate(&self, record: &ContactRecord) -> Result<ValidatedRecord, Rejection> {
        let raw_email = record
            .email
            .as_deref()
            .map(clean_email)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| Rejection::new(RejectionKind::MissingEmail, "no email"))?;

        let email = self.check_syntax(&raw_email)?;
        let (local, domain) = email.rsplit_once('@').unwrap_or_default();

        if self.is_blocked(domain) {
            return Err(Rejection::new(RejectionKind::BlocklistedDomain, domain));
        }
        if self.policy.reject_role_accounts
            && self.policy.role_local_parts.contains(&local.to_lowercase())
        {
            return Err(Rejection::new(RejectionKind::RoleAccount, email.clone()));
        }

        let source_url = record.source_url.trim();
        if source_url.is_empty() {
            return Err(Rejection::new(RejectionKind::Other, "empty source URL"));
        }

        let name = record.name.as_deref().and_then(|n| self.plausible_name(n));
        let job_title = record
            .job_title
            .as_deref()
            .map(collapse_whitespace)
            .filter(|t| !t.is_empty() && t.chars().count() <= self.policy.max_title_chars);

        let linkedin = record.linkedin.as_deref().and_then(linkedin_profile);

        Ok(ValidatedRecord::new(
            source_url.to_string(),
            name,
            email,
            job_title,
        )
        .with_linkedin(linkedin))
    }

    /// Returns the address with its domain lower-cased.
    fn check_syntax(&self, email: &str) -> Result<String, Rejection> {
        let invalid = |reason: &str| {
            Rejection::new(
                RejectionKind::InvalidEmailSyntax,
                format!("{}: {}", email, reason),
            )
        };

        if email.chars().count() > MAX_ADDRESS {
            return Err(invalid("address too long"));
        }
        let (local, domain) = match email.split_once('@') {
            Some((local, domain)) if !domain.contains('@') => (local, domain),
            _ => return Err(invalid("expected exactly one '@'")),
        };

        if local.is_empty() || local.len() > MAX_LOCAL_PART {
            return Err(invalid("bad local part length"));
        }
        if !local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c))
        {
            return Err(invalid("illegal character in local part"));
        }
        if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
            return Err(invalid("misplaced dot in local part"));
        }

        let domain = domain.to_lowercase();
        let labels: Vec<&str> = domain.split('.').collect();
        if labels.len() < 2 {
            return Err(invalid("domain has no TLD"));
        }
        if labels
            .iter()
            .any(|l| l.is_empty() || !l.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'))
        {
            return Err(invalid("malformed domain"));
        }
        let tld = labels.last().copied().unwrap_or_default();
        if tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid("TLD must be two or more letters"));
        }
        if self.policy.asset_extensions.contains(tld) {
            return Err(invalid("looks like a file name"));
        }

        Ok(format!("{}@{}", local, domain))
    }

    fn is_blocked(&self, domain: &str) -> bool {
        self.policy.blocked_domains.iter().any(|blocked| {
            domain == blocked
                || domain
                    .strip_suffix(blocked.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    fn plausible_name(&self, name: &str) -> Option<String> {
        let name = collapse_whitespace(name);
        let plausible = name.split(' ').count() >= 2
            && name.chars().count() <= self.policy.max_name_chars
            && !name.chars().any(|c| c.is_ascii_digit() || c == '@');
        if !plausible {
            debug!("Dropping implausible name '{}'", name);
            return None;
        }
        Some(name)
    }
}

/// Strips whitespace, a `mailto:` scheme, any query string and punctuation
/// picked up from the surrounding sentence.
fn clean_email(raw: &str) -> String {
    let mut email = collapse_whitespace(raw);
    if email
        .get(..7)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("mailto:"))
    {
        email = email[7..].to_string();
    }
    if let Some((address, _)) = email.split_once('?') {
        email = address.to_string();
    }
    email
        .trim_start_matches(|c: char| "<([{'\"".contains(c))
        .trim_end_matches(|c: char| ".,;:!?)]}>'\"".contains(c))
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(email: &str) -> ContactRecord {
        ContactRecord::new("https://acme.test/team").with_email(email)
    }

    fn rejection(validator: &DataValidator, email: &str) -> RejectionKind {
        validator.validate(&record(email)).unwrap_err().kind
    }

    #[test]
    fn test_normalises_fields() {
        let validator = DataValidator::default();
        let candidate = ContactRecord::new("  https://acme.test/team ")
            .with_email(" mailto:Jane.Smith@ACME.Test?subject=hi ")
            .with_name("  Jane \n  Smith ")
            .with_job_title(" Chief\tTechnology   Officer ");

        let validated = validator.validate(&candidate).unwrap();
        assert_eq!(validated.email(), "Jane.Smith@acme.test");
        assert_eq!(validated.name(), Some("Jane Smith"));
        assert_eq!(validated.job_title(), Some("Chief Technology Officer"));
        assert_eq!(validated.source_url(), "https://acme.test/team");
    }

    #[test]
    fn test_missing_email() {
        let validator = DataValidator::default();
        let candidate = ContactRecord::new("https://acme.test/").with_name("Jane Smith");
        assert_eq!(
            validator.validate(&candidate).unwrap_err().kind,
            RejectionKind::MissingEmail
        );
        assert_eq!(rejection(&validator, "   "), RejectionKind::MissingEmail);
    }

    #[test]
    fn test_invalid_syntax() {
        let validator = DataValidator::default();
        for bad in [
            "no-at-sign.acme.test",
            "two@@acme.test",
            ".leading@acme.test",
            "trailing.@acme.test",
            "double..dot@acme.test",
            "jane@localhost",
            "jane@acme.c0m",
            "jane@acme..test",
            "logo@2x.png",
            "spaces in@acme.test",
        ] {
            assert_eq!(
                rejection(&validator, bad),
                RejectionKind::InvalidEmailSyntax,
                "{}",
                bad
            );
        }

        let long_local = format!("{}@acme.test", "a".repeat(65));
        assert_eq!(
            rejection(&validator, &long_local),
            RejectionKind::InvalidEmailSyntax
        );
    }

    #[test]
    fn test_trailing_punctuation_is_stripped() {
        let validator = DataValidator::default();
        let validated = validator.validate(&record("(jane@acme.test).")).unwrap();
        assert_eq!(validated.email(), "jane@acme.test");
    }

    #[test]
    fn test_blocklisted_domains_and_subdomains() {
        let validator = DataValidator::default();
        assert_eq!(
            rejection(&validator, "user@example.com"),
            RejectionKind::BlocklistedDomain
        );
        assert_eq!(
            rejection(&validator, "abc@o123.ingest.sentry.io"),
            RejectionKind::BlocklistedDomain
        );
        assert!(validator.validate(&record("user@notexample.com")).is_ok());
    }

    #[test]
    fn test_role_accounts_only_when_enabled() {
        let lenient = DataValidator::default();
        assert!(lenient.validate(&record("info@acme.test")).is_ok());

        let strict = DataValidator::new(ValidationPolicy::default().with_reject_role_accounts(true));
        assert_eq!(rejection(&strict, "Info@acme.test"), RejectionKind::RoleAccount);
        assert!(strict.validate(&record("jane@acme.test")).is_ok());
    }

    #[test]
    fn test_implausible_name_and_long_title_are_dropped() {
        let validator = DataValidator::default();
        let candidate = record("jane@acme.test")
            .with_name("Call 555 0100")
            .with_job_title("x".repeat(200));
        let validated = validator.validate(&candidate).unwrap();
        assert_eq!(validated.name(), None);
        assert_eq!(validated.job_title(), None);

        let single_word = validator
            .validate(&record("jane@acme.test").with_name("Jane"))
            .unwrap();
        assert_eq!(single_word.name(), None);
    }

    #[test]
    fn test_empty_source_url() {
        let validator = DataValidator::default();
        let candidate = ContactRecord::new("   ").with_email("jane@acme.test");
        assert_eq!(
            validator.validate(&candidate).unwrap_err().kind,
            RejectionKind::Other
        );
    }

    #[test]
    fn test_linkedin_profile_is_canonicalised() {
        let validator = DataValidator::default();
        for raw in [
            "https://www.linkedin.com/in/jane-smith/",
            "http://linkedin.com/in/jane-smith?trk=public_profile",
            "uk.linkedin.com/in/jane-smith",
        ] {
            let validated = validator
                .validate(&record("jane@acme.test").with_linkedin(raw))
                .unwrap();
            assert_eq!(
                validated.linkedin(),
                Some("https://www.linkedin.com/in/jane-smith"),
                "{}",
                raw
            );
        }
    }

    #[test]
    fn test_non_profile_links_are_dropped() {
        let validator = DataValidator::default();
        for raw in [
            "https://www.linkedin.com/company/acme",
            "https://www.linkedin.com/in/",
            "https://notlinkedin.com/in/jane-smith",
            "https://acme.test/in/jane-smith",
        ] {
            let validated = validator
                .validate(&record("jane@acme.test").with_linkedin(raw))
                .unwrap();
            assert_eq!(validated.linkedin(), None, "{}", raw);
        }
    }
}
