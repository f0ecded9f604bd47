pub mod base;
pub mod csv_store;
pub mod failures;
pub mod types;

pub use base::{RecordStore, StorageError};
pub use csv_store::CsvStore;
pub use failures::{write_failures, write_report_json};
pub use types::{ContactRow, CsvSchema, CSV_HEADER, LEGACY_CSV_HEADER};
