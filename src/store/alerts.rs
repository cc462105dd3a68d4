//! Append-only alert log
//!
//! A JSON array of incident records. Records are never edited; the only
//! other operation is clearing the whole log. Appends carry existing
//! entries over as raw JSON values, so fields this version does not know
//! about survive.

use super::{timestamp, write_atomic};
use crate::error::{AppError, AppResult};
use crate::system_info::SystemInfo;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, MutexGuard};

/// Kind of notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Down,
    Recovered,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Down => "down",
            AlertStatus::Recovered => "recovered",
        }
    }
}

/// One incident log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub time: DateTime<Utc>,
    pub service: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: AlertStatus,
    #[serde(default)]
    pub info: Option<String>,
    #[serde(default)]
    pub system: Option<SystemInfo>,
}

/// File-backed alert log
///
/// Every read-modify-write holds two locks: an async mutex that orders
/// writers sharing this handle, and an advisory lock on `<log>.lock` that
/// keeps other handles and other processes (the CLI next to a running
/// monitor) out until the new document is in place.
#[derive(Debug)]
pub struct AlertLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

/// Held for the duration of one append or clear
struct WriteGuard<'a> {
    // Closing the file releases the advisory lock; fields drop in order
    _file: File,
    _local: MutexGuard<'a, ()>,
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "alerts".into());
    name.push(".lock");
    path.with_file_name(name)
}

fn lock_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)?;
    FileExt::lock_exclusive(&file)?;
    Ok(file)
}

impl AlertLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn lock(&self) -> AppResult<WriteGuard<'_>> {
        let local = self.write_lock.lock().await;
        let path = lock_path(&self.path);
        let file = tokio::task::spawn_blocking(move || lock_file(&path))
            .await
            .unwrap_or_else(|e| Err(io::Error::other(e)))
            .map_err(|source| AppError::AlertLogWrite {
                path: self.path.display().to_string(),
                source,
            })?;
        Ok(WriteGuard {
            _file: file,
            _local: local,
        })
    }

    async fn read_values(&self) -> AppResult<Vec<serde_json::Value>> {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(AppError::AlertLogRead {
                    path: self.path.display().to_string(),
                    source,
                });
            }
        };

        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&content).map_err(|source| AppError::AlertLogCorrupt {
            path: self.path.display().to_string(),
            source,
        })
    }

    async fn write_values(&self, values: &[serde_json::Value]) -> AppResult<()> {
        let body = serde_json::to_vec_pretty(values)?;
        write_atomic(&self.path, &body)
            .await
            .map_err(|source| AppError::AlertLogWrite {
                path: self.path.display().to_string(),
                source,
            })
    }

    /// Append a record, returning the number of records now in the log
    ///
    /// Fails without touching the file if the existing log cannot be parsed.
    pub async fn append(&self, record: &AlertRecord) -> AppResult<usize> {
        let _guard = self.lock().await?;
        let mut values = self.read_values().await?;
        values.push(serde_json::to_value(record)?);
        self.write_values(&values).await?;
        Ok(values.len())
    }

    /// All records, oldest first
    pub async fn read_all(&self) -> AppResult<Vec<AlertRecord>> {
        let values = self.read_values().await?;
        let mut records = Vec::with_capacity(values.len());
        for value in values {
            match serde_json::from_value(value) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %e,
                        "Skipping unreadable alert record"
                    );
                }
            }
        }
        Ok(records)
    }

    /// Up to `limit` records, newest first
    pub async fn recent(&self, limit: usize) -> AppResult<Vec<AlertRecord>> {
        let mut records = self.read_all().await?;
        records.sort_by(|a, b| b.time.cmp(&a.time));
        records.truncate(limit);
        Ok(records)
    }

    /// Replace the log with an empty sequence
    pub async fn clear(&self) -> AppResult<()> {
        let _guard = self.lock().await?;
        self.write_values(&[]).await
    }
}
