//! Scan log - append-only CSV record of processed scans
//!
//! Layout: header row `timestamp,tag,name,direction`, then one row per scan.
//! Every append opens, writes and closes the file, so each event is on disk
//! as soon as `append` returns. Appends and clears from this process are
//! serialized; other processes writing the same file are not coordinated.

use crate::domain::types::ScanEvent;
use parking_lot::Mutex;
use serde::Deserialize;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Column names written as the first row of every log file
pub const LOG_HEADER: [&str; 4] = ["timestamp", "tag", "name", "direction"];

#[derive(Debug, thiserror::Error)]
pub enum ScanLogError {
    #[error("scan log I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("scan log CSV error on {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// One row read back from the log
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub tag: String,
    pub name: String,
    pub direction: String,
}

/// Result of reading the whole log
#[derive(Debug, Clone, PartialEq)]
pub enum LogSnapshot {
    /// The log file does not exist
    Missing,
    Entries(Vec<LogEntry>),
}

/// Handle to the scan log file; clones share the same write lock
#[derive(Debug, Clone)]
pub struct ScanLog {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl ScanLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        info!(path = %path.display(), "scan_log_initialized");
        Self { path, write_lock: Arc::new(Mutex::new(())) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn io_error(&self, source: std::io::Error) -> ScanLogError {
        ScanLogError::Io { path: self.path.display().to_string(), source }
    }

    fn csv_error(&self, source: csv::Error) -> ScanLogError {
        ScanLogError::Csv { path: self.path.display().to_string(), source }
    }

    fn csv_writer(file: File) -> csv::Writer<File> {
        csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(file)
    }

    /// Create parent directories if they don't exist
    fn ensure_parent_dir(&self) -> Result<(), ScanLogError> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))
            }
            _ => Ok(()),
        }
    }

    /// Append one scan, writing the header first if the file is new or empty
    pub fn append(&self, event: &ScanEvent) -> Result<(), ScanLogError> {
        let _guard = self.write_lock.lock();
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        let needs_header = file.metadata().map_err(|e| self.io_error(e))?.len() == 0;

        let mut writer = Self::csv_writer(file);
        if needs_header {
            writer.write_record(LOG_HEADER).map_err(|e| self.csv_error(e))?;
        }
        writer.serialize(event.to_row()).map_err(|e| self.csv_error(e))?;
        writer.flush().map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), tag = %event.tag, "scan_log_appended");
        Ok(())
    }

    /// Truncate the log back to a header-only file
    pub fn clear(&self) -> Result<(), ScanLogError> {
        let _guard = self.write_lock.lock();
        self.ensure_parent_dir()?;

        let file = File::create(&self.path).map_err(|e| self.io_error(e))?;
        let mut writer = Self::csv_writer(file);
        writer.write_record(LOG_HEADER).map_err(|e| self.csv_error(e))?;
        writer.flush().map_err(|e| self.io_error(e))?;

        info!(path = %self.path.display(), "scan_log_cleared");
        Ok(())
    }

    /// Read every row in the log; rows that don't parse are skipped
    pub fn snapshot(&self) -> Result<LogSnapshot, ScanLogError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LogSnapshot::Missing),
            Err(e) => return Err(self.io_error(e)),
        };

        let mut reader = csv::ReaderBuilder::new().has_headers(true).flexible(true).from_reader(file);

        let mut entries = Vec::new();
        for (index, record) in reader.deserialize::<LogEntry>().enumerate() {
            match record {
                Ok(entry) => entries.push(entry),
                Err(e) if e.is_io_error() => return Err(self.csv_error(e)),
                Err(e) => {
                    warn!(path = %self.path.display(), row = index + 1, error = %e, "scan_log_row_skipped");
                }
            }
        }

        Ok(LogSnapshot::Entries(entries))
    }
}
