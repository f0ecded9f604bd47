use crate::contact::ValidatedRecord;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected header in {path}: expected '{expected}', found '{found}'")]
    SchemaMismatch {
        path: String,
        expected: String,
        found: String,
    },
}

/// Destination for validated contacts. Implementations keep at most one
/// row per [`DedupKey`](crate::contact::DedupKey) and must tolerate
/// concurrent `append` calls.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Loads the keys of rows that already exist. Returns the number of
    /// rows read.
    async fn seed(&self) -> Result<usize, StorageError>;

    /// Returns `false` without writing when the record's key is known.
    async fn append(&self, record: &ValidatedRecord) -> Result<bool, StorageError>;

    /// Number of known keys.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
