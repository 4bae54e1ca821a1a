use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::migration::MigrationRunResult;

/// Newest records kept on disk
const MAX_RECORDS: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history file I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("history file could not be encoded: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryItemStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub asset_id: String,
    pub status: HistoryItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One finished migration run as it appears in the on-disk log.
/// `target_folder` is the folder's display name, never its full path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub target_folder: String,
    pub successes: u32,
    pub failures: u32,
    pub items: Vec<HistoryItem>,
}

impl HistoryRecord {
    pub fn from_result(
        result: &MigrationRunResult,
        target_folder: &str,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let mut items = Vec::with_capacity(result.total_count());
        for success in &result.successes {
            items.push(HistoryItem {
                asset_id: success.asset_id.clone(),
                status: HistoryItemStatus::Success,
                destination: success
                    .destination
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string()),
                bytes: Some(success.bytes),
                error: None,
            });
        }
        for failure in &result.failures {
            items.push(HistoryItem {
                asset_id: failure.asset_id.clone(),
                status: HistoryItemStatus::Failure,
                destination: None,
                bytes: None,
                error: Some(failure.message.clone()),
            });
        }
        Self {
            id: Uuid::new_v4(),
            started_at,
            finished_at,
            target_folder: target_folder.to_string(),
            successes: result.success_count() as u32,
            failures: result.failure_count() as u32,
            items,
        }
    }
}

/// Capped migration log, newest first
pub trait HistoryStore: Send + Sync {
    /// Stored records, newest first. A missing or unreadable log reads as
    /// empty rather than failing.
    fn load(&self) -> Vec<HistoryRecord>;
    fn append(&self, record: HistoryRecord) -> Result<(), HistoryError>;
    fn clear(&self) -> Result<(), HistoryError>;
}

/// History log as a single JSON array, replaced wholesale on every append
pub struct JsonHistoryStore {
    path: PathBuf,
    max_records: usize,
}

impl JsonHistoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            max_records: MAX_RECORDS,
        }
    }

    #[cfg(test)]
    fn with_max_records(mut self, max: usize) -> Self {
        self.max_records = max;
        self
    }
}

impl HistoryStore for JsonHistoryStore {
    fn load(&self) -> Vec<HistoryRecord> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                log::warn!("history file unreadable, treating as empty: {e}");
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) => {
                log::warn!("history file malformed, treating as empty: {e}");
                Vec::new()
            }
        }
    }

    fn append(&self, record: HistoryRecord) -> Result<(), HistoryError> {
        let mut records = self.load();
        records.insert(0, record);
        records.truncate(self.max_records);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Whole-file replace via a temp file so a crash never leaves a
        // truncated log behind
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, serde_json::to_vec_pretty(&records)?)?;
        fs::rename(&temp_path, &self.path)?;

        log::debug!("history now holds {} records", records.len());
        Ok(())
    }

    fn clear(&self) -> Result<(), HistoryError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(HistoryError::Io(e)),
        }
    }
}
