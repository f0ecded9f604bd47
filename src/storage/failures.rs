use super::StorageError;
use crate::core::report::{CrawlReport, UrlFailure};
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes the failures of a run as `url,kind,message` rows, replacing any
/// previous file.
pub fn write_failures<P: AsRef<Path>>(path: P, failures: &[UrlFailure]) -> Result<(), StorageError> {
    let path = path.as_ref();
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_path(path)?;

    writer.write_record(["url", "kind", "message"])?;
    for failure in failures {
        writer.write_record([
            failure.url.as_str(),
            failure.kind.as_str(),
            failure.message.as_str(),
        ])?;
    }
    writer.flush()?;

    info!("Wrote {} failures to {}", failures.len(), path.display());
    Ok(())
}

/// Writes the whole run report as pretty-printed JSON.
pub fn write_report_json<P: AsRef<Path>>(path: P, report: &CrawlReport) -> Result<(), StorageError> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    info!("Wrote run report {} to {}", report.run_id, path.display());
    Ok(())
}
