use super::base::{RecordStore, StorageError};
use super::types::{ContactRow, CsvSchema, CSV_HEADER, LEGACY_CSV_HEADER};
use crate::contact::{DedupKey, ValidatedRecord};
use async_trait::async_trait;
use log::{debug, error, info};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Append-only contacts file with in-memory deduplication.
///
/// The key check and the row write happen under one lock, so concurrent
/// producers can never write the same key twice. A row is encoded in
/// memory and written with a single call; if the write fails the file is
/// cut back to its previous length, the key is not recorded and the handle
/// is dropped so the next append reopens the file.
pub struct CsvStore {
    path: PathBuf,
    sync_writes: bool,
    state: Mutex<StoreState>,
}

struct StoreState {
    keys: HashSet<DedupKey>,
    file: Option<File>,
    schema: CsvSchema,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            keys: HashSet::new(),
            file: None,
            schema: CsvSchema::Current,
        }
    }
}

impl CsvStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            sync_writes: false,
            state: Mutex::new(StoreState::default()),
        }
    }

    /// `fsync` after every row.
    pub fn with_sync_writes(mut self, sync_writes: bool) -> Self {
        self.sync_writes = sync_writes;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every row of the file at `path`. A missing file has no rows.
    pub fn read_all<P: AsRef<Path>>(path: P) -> Result<Vec<ContactRow>, StorageError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(path)?;
        check_header(path, reader.headers()?)?;
        let mut rows = Vec::new();
        for row in reader.deserialize() {
            rows.push(row?);
        }
        Ok(rows)
    }

    fn seed_sync(&self) -> Result<usize, StorageError> {
        let rows = Self::read_all(&self.path)?;
        let mut state = self.state.lock();
        for row in &rows {
            if let Some(key) = row.dedup_key() {
                state.keys.insert(key);
            }
        }
        info!(
            "Seeded {} known contacts from {} rows in {}",
            state.keys.len(),
            rows.len(),
            self.path.display()
        );
        Ok(rows.len())
    }

    fn append_sync(&self, record: &ValidatedRecord) -> Result<bool, StorageError> {
        let key = record.dedup_key();
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if state.keys.contains(&key) {
            debug!("Skipping duplicate contact {}", record.email());
            return Ok(false);
        }

        let file = self.writer(&mut state.file, &mut state.schema)?;
        let row = encode_record(&ContactRow::from(record).fields(state.schema))?;
        let previous_len = file.metadata()?.len();

        if let Err(e) = write_bytes(file, &row, self.sync_writes) {
            if let Err(rollback) = file.set_len(previous_len) {
                error!(
                    "Failed to roll back partial row in {}: {}",
                    self.path.display(),
                    rollback
                );
            }
            state.file = None;
            return Err(e.into());
        }

        state.keys.insert(key);
        Ok(true)
    }

    /// Opens the file on first use, writing the header into a new file and
    /// terminating an unfinished last line of an existing one.
    fn writer<'a>(
        &self,
        slot: &'a mut Option<File>,
        schema: &mut CsvSchema,
    ) -> Result<&'a mut File, StorageError> {
        let file = match slot.take() {
            Some(file) => file,
            None => {
                let (file, opened) = self.open()?;
                *schema = opened;
                file
            }
        };
        Ok(slot.insert(file))
    }

    fn open(&self) -> Result<(File, CsvSchema), StorageError> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        if file.metadata()?.len() == 0 {
            debug!("Writing header to {}", self.path.display());
            let header = encode_record(&CSV_HEADER)?;
            write_bytes(&mut file, &header, self.sync_writes)?;
            return Ok((file, CsvSchema::Current));
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let schema = check_header(&self.path, reader.headers()?)?;
        if schema == CsvSchema::Legacy {
            info!(
                "{} has no linkedin column; appending rows without it",
                self.path.display()
            );
        }

        file.seek(SeekFrom::End(-1))?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last)?;
        if last[0] != b'\n' {
            debug!("Terminating last line of {}", self.path.display());
            write_bytes(&mut file, b"\n", self.sync_writes)?;
        }
        Ok((file, schema))
    }
}

#[async_trait]
impl RecordStore for CsvStore {
    async fn seed(&self) -> Result<usize, StorageError> {
        self.seed_sync()
    }

    async fn append(&self, record: &ValidatedRecord) -> Result<bool, StorageError> {
        self.append_sync(record)
    }

    fn len(&self) -> usize {
        self.state.lock().keys.len()
    }
}

fn check_header(path: &Path, found: &csv::StringRecord) -> Result<CsvSchema, StorageError> {
    // An empty file has no header yet.
    if found.is_empty() || found.iter().eq(CSV_HEADER.iter().copied()) {
        return Ok(CsvSchema::Current);
    }
    if found.iter().eq(LEGACY_CSV_HEADER.iter().copied()) {
        return Ok(CsvSchema::Legacy);
    }
    Err(StorageError::SchemaMismatch {
        path: path.display().to_string(),
        expected: CSV_HEADER.join(","),
        found: found.iter().collect::<Vec<_>>().join(","),
    })
}

fn csv_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

fn encode_record(fields: &[&str]) -> Result<Vec<u8>, StorageError> {
    let mut writer = csv_writer();
    writer.write_record(fields)?;
    writer.into_inner().map_err(|e| StorageError::Io(e.into_error()))
}

fn write_bytes(file: &mut File, bytes: &[u8], sync: bool) -> std::io::Result<()> {
    file.write_all(bytes)?;
    file.flush()?;
    if sync {
        file.sync_data()?;
    }
    Ok(())
}
