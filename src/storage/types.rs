use crate::contact::{DedupKey, ValidatedRecord};
use serde::Deserialize;

pub const CSV_HEADER: [&str; 5] = ["source_url", "name", "email", "job_title", "linkedin"];

/// Header of files written before the `linkedin` column existed. Such files
/// are still read and appended to in their own layout.
pub const LEGACY_CSV_HEADER: [&str; 4] = ["source_url", "name", "email", "job_title"];

/// Column layout of an existing contacts file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvSchema {
    Current,
    Legacy,
}

/// One line of the contacts file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContactRow {
    pub source_url: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub job_title: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
}

impl ContactRow {
    pub fn dedup_key(&self) -> Option<DedupKey> {
        DedupKey::from_parts(
            self.email.as_deref(),
            self.name.as_deref(),
            &self.source_url,
        )
    }

    /// Field values in `schema`'s column order.
    pub fn fields(&self, schema: CsvSchema) -> Vec<&str> {
        let mut fields = vec![
            self.source_url.as_str(),
            self.name.as_deref().unwrap_or_default(),
            self.email.as_deref().unwrap_or_default(),
            self.job_title.as_deref().unwrap_or_default(),
        ];
        if schema == CsvSchema::Current {
            fields.push(self.linkedin.as_deref().unwrap_or_default());
        }
        fields
    }
}

impl From<&ValidatedRecord> for ContactRow {
    fn from(record: &ValidatedRecord) -> Self {
        Self {
            source_url: record.source_url().to_string(),
            name: record.name().map(str::to_string),
            email: Some(record.email().to_string()),
            job_title: record.job_title().map(str::to_string),
            linkedin: record.linkedin().map(str::to_string),
        }
    }
}
