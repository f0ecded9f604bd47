/// An unvalidated contact candidate lifted from one page. Any field may be
/// missing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContactRecord {
    pub source_url: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub job_title: Option<String>,
    /// Profile URL, e.g. `https://www.linkedin.com/in/jane-smith`.
    pub linkedin: Option<String>,
}

impl ContactRecord {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_job_title(mut self, job_title: impl Into<String>) -> Self {
        self.job_title = Some(job_title.into());
        self
    }

    pub fn with_linkedin(mut self, linkedin: impl Into<String>) -> Self {
        self.linkedin = Some(linkedin.into());
        self
    }

    /// Takes `other`'s name, title and profile where this record has none.
    pub fn fill_missing_from(&mut self, other: &ContactRecord) {
        if self.name.is_none() {
            self.name = other.name.clone();
        }
        if self.job_title.is_none() {
            self.job_title = other.job_title.clone();
        }
        if self.linkedin.is_none() {
            self.linkedin = other.linkedin.clone();
        }
    }
}

/// A contact that passed validation. The email is always present and
/// syntactically valid; the fields cannot change after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRecord {
    source_url: String,
    name: Option<String>,
    email: String,
    job_title: Option<String>,
    linkedin: Option<String>,
}

impl ValidatedRecord {
    pub(crate) fn new(
        source_url: String,
        name: Option<String>,
        email: String,
        job_title: Option<String>,
    ) -> Self {
        Self {
            source_url,
            name,
            email,
            job_title,
            linkedin: None,
        }
    }

    pub(crate) fn with_linkedin(mut self, linkedin: Option<String>) -> Self {
        self.linkedin = linkedin;
        self
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn job_title(&self) -> Option<&str> {
        self.job_title.as_deref()
    }

    pub fn linkedin(&self) -> Option<&str> {
        self.linkedin.as_deref()
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::Email(self.email.to_lowercase())
    }
}

/// Identity used to keep a contact out of the store more than once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    Email(String),
    NameAtSource { name: String, source_url: String },
}

impl DedupKey {
    /// Email wins when present; rows without one fall back to the name on
    /// its source page. Rows with neither have no identity.
    pub fn from_parts(email: Option<&str>, name: Option<&str>, source_url: &str) -> Option<Self> {
        let email = email.map(str::trim).filter(|e| !e.is_empty());
        if let Some(email) = email {
            return Some(DedupKey::Email(email.to_lowercase()));
        }

        let name = name.map(str::trim).filter(|n| !n.is_empty())?;
        Some(DedupKey::NameAtSource {
            name: name.to_lowercase(),
            source_url: source_url.trim().to_string(),
        })
    }
}
