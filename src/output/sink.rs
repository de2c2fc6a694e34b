//! Report sink for error-status pages
//!
//! Records are appended in completion order and never reordered. The sink
//! only accepts report-worthy status codes.

use crate::crawler::is_report_worthy;
use crate::url::NormalizedUrl;
use crate::SweepError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// One report-worthy fetch outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecord {
    pub url: String,
    pub status_code: u16,
    pub timestamp: DateTime<Utc>,
}

/// Append-only log of report records, shared between workers
#[derive(Debug, Default)]
pub struct ReportSink {
    records: Mutex<Vec<ReportRecord>>,
}

impl ReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record for `url` if `status_code` is report-worthy
    ///
    /// # Returns
    ///
    /// * `Some(ReportRecord)` - The record that was appended
    /// * `None` - The status is outside `400..600`; nothing was recorded
    pub fn record(&self, url: &NormalizedUrl, status_code: u16) -> Option<ReportRecord> {
        if !is_report_worthy(status_code) {
            return None;
        }

        let record = ReportRecord {
            url: url.to_string(),
            status_code,
            timestamp: Utc::now(),
        };

        tracing::info!(
            "{} - {} - Status Code: {}",
            record.timestamp.format("%Y%m%d-%H%M%S"),
            record.url,
            record.status_code
        );

        self.lock().push(record.clone());
        Some(record)
    }

    /// Snapshot of all records, in insertion order
    pub fn records(&self) -> Vec<ReportRecord> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Serializes the records as a pretty-printed JSON array
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&*self.lock())
    }

    /// Writes the records to `path` as a JSON array, creating parent
    /// directories as needed
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of records written
    /// * `Err(SweepError)` - Failed to create or write the file
    pub fn persist(&self, path: &Path) -> Result<usize, SweepError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = self.to_json()?;
        let count = self.len();
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        Ok(count)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ReportRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Reads a report previously written by [`ReportSink::persist`]
pub fn load_report(path: &Path) -> Result<Vec<ReportRecord>, SweepError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
