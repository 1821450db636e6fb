//! Tag name directory loaded from the RFID database CSV
//!
//! The file needs `hex_id` and `name` columns; any other columns are ignored.

use crate::domain::types::{Tag, UNKNOWN_NAME};
use anyhow::{bail, Context};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

const REQUIRED_COLUMNS: [&str; 2] = ["hex_id", "name"];

#[derive(Debug, Deserialize)]
struct NameRecord {
    hex_id: String,
    name: String,
}

/// Read-only map from tag to display name
#[derive(Debug, Clone, Default)]
pub struct NameDirectory {
    names: HashMap<String, String>,
}

impl NameDirectory {
    /// Load the directory from a CSV file
    ///
    /// Rows with extra or missing fields are tolerated; rows that still can't
    /// be read are skipped with a warning. A header without `hex_id` and
    /// `name` is an error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open name database {}", path.display()))?;

        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read header of name database {}", path.display()))?;
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                bail!("Name database {} has no '{}' column", path.display(), column);
            }
        }

        let mut names = HashMap::new();
        for (index, record) in reader.deserialize::<NameRecord>().enumerate() {
            match record {
                Ok(record) if record.hex_id.is_empty() => {}
                Ok(record) => {
                    names.insert(record.hex_id, record.name);
                }
                Err(e) if e.is_io_error() => {
                    return Err(e).with_context(|| {
                        format!("Failed to read name database {}", path.display())
                    });
                }
                Err(e) => {
                    warn!(path = %path.display(), row = index + 1, error = %e, "name_database_row_skipped");
                }
            }
        }

        Ok(Self { names })
    }

    /// Load the directory, treating a missing or broken file as empty
    pub fn load_or_empty<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "name_database_missing");
            return Self::default();
        }

        match Self::from_file(path) {
            Ok(directory) => {
                info!(path = %path.display(), tags = directory.len(), "name_database_loaded");
                directory
            }
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{:#}", e), "name_database_load_failed");
                Self::default()
            }
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self { names: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }

    /// Display name for a tag, or "Unknown"
    pub fn resolve(&self, tag: &Tag) -> &str {
        self.names.get(tag.as_str()).map(|s| s.as_str()).unwrap_or(UNKNOWN_NAME)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
