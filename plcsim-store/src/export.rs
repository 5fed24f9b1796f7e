/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Tab-separated session export.
//!
//! Log entries may carry raw tabs and line breaks copied from peer data. Every
//! field goes through [`sanitize_field`] before it is written.

use crate::entry::EventLogEntry;
use crate::traits::EventStore;
use chrono::Utc;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Column header line.
pub const HEADER: &str = "TIME\t\t\tDIR\tSRC\t\tDST\t\tTYPE\tSEQ\tDATA";

/// Width of the separator line under the header.
pub const SEPARATOR_WIDTH: usize = 100;

/// Time-of-day format of the first column.
pub const TIME_FORMAT: &str = "%H:%M:%S%.3f";

/// Source column value for diagnostic rows.
pub const SYSTEM_SOURCE: &str = "SYSTEM";

/// Errors raised while exporting.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Could not create or write the export file.
    #[error("export to {path} failed: {source}")]
    Write {
        /// Target file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Makes a value safe for one tab-delimited column.
///
/// Tabs and newlines become a space, carriage returns are removed.
#[must_use]
pub fn sanitize_field(value: &str) -> String {
    value
        .chars()
        .filter(|&c| c != '\r')
        .map(|c| if c == '\t' || c == '\n' { ' ' } else { c })
        .collect()
}

/// Writes the header, a separator, and one row per entry.
///
/// # Errors
/// Returns the first I/O error raised by `writer`.
pub fn write_tsv<W: Write>(entries: &[EventLogEntry], mut writer: W) -> io::Result<()> {
    writeln!(writer, "{HEADER}")?;
    writeln!(writer, "{}", "-".repeat(SEPARATOR_WIDTH))?;
    for entry in entries {
        writeln!(writer, "{}", row(entry))?;
    }
    writer.flush()
}

fn row(entry: &EventLogEntry) -> String {
    let time = entry.timestamp.format(TIME_FORMAT).to_string();
    let (source, destination, kind, sequence, data) = match &entry.telegram {
        Some(telegram) => (
            telegram.source().to_string(),
            telegram.destination().to_string(),
            telegram.kind().code().to_string(),
            format!("{:06}", telegram.sequence()),
            entry.summary().trim().to_string(),
        ),
        None => (
            SYSTEM_SOURCE.to_string(),
            String::new(),
            entry.direction.tag().to_string(),
            "-".to_string(),
            entry.detail.trim().to_string(),
        ),
    };
    format!(
        "{}\t{}\t{:<8}\t{:<8}\t{}\t{}\t{}",
        sanitize_field(&time),
        entry.direction.tag(),
        sanitize_field(&source),
        sanitize_field(&destination),
        sanitize_field(&kind),
        sanitize_field(&sequence),
        sanitize_field(&data),
    )
}

/// Returns the export file name for the given Unix time.
#[must_use]
pub fn export_file_name(unix_seconds: i64) -> String {
    format!("plcsim-export-{unix_seconds}.txt")
}

/// Exports the whole log into a new file under `dir`.
///
/// # Returns
/// The path written, or `None` if the log was empty.
///
/// # Errors
/// Returns `ExportError::Write` if the file cannot be created or written.
pub fn export_to_dir<S>(log: &S, dir: &Path) -> Result<Option<PathBuf>, ExportError>
where
    S: EventStore + ?Sized,
{
    let entries = log.snapshot();
    if entries.is_empty() {
        return Ok(None);
    }

    let path = dir.join(export_file_name(Utc::now().timestamp()));
    let wrap = |source| ExportError::Write {
        path: path.clone(),
        source,
    };
    let file = File::create(&path).map_err(wrap)?;
    write_tsv(&entries, BufWriter::new(file)).map_err(wrap)?;
    Ok(Some(path))
}
