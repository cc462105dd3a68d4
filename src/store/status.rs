//! Status store: last-known snapshot for every monitored service
//!
//! The whole mapping is rewritten on every save. Snapshots are replaced,
//! never merged, so a success always lands with `failures = 0`.

use super::{timestamp, write_atomic};
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Status as shown to operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Unknown,
    Up,
    Down,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Unknown => "unknown",
            ServiceStatus::Up => "up",
            ServiceStatus::Down => "down",
        }
    }
}

/// Persisted view of one service after the latest check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: ServiceStatus,
    pub failures: u32,
    #[serde(default, deserialize_with = "timestamp::option::deserialize")]
    pub last_checked: Option<DateTime<Utc>>,
}

impl StatusSnapshot {
    /// Placeholder written before a service has been checked
    pub fn unknown() -> Self {
        Self {
            status: ServiceStatus::Unknown,
            failures: 0,
            last_checked: None,
        }
    }

    pub fn up(checked_at: DateTime<Utc>) -> Self {
        Self {
            status: ServiceStatus::Up,
            failures: 0,
            last_checked: Some(checked_at),
        }
    }

    pub fn down(failures: u32, checked_at: DateTime<Utc>) -> Self {
        Self {
            status: ServiceStatus::Down,
            failures,
            last_checked: Some(checked_at),
        }
    }
}

/// In-memory status mapping plus the file it is persisted to
#[derive(Debug)]
pub struct StatusStore {
    path: PathBuf,
    snapshots: BTreeMap<String, StatusSnapshot>,
}

impl StatusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            snapshots: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start over with an `unknown` snapshot for each named service
    ///
    /// Services that are no longer configured drop out of the store.
    pub fn reset<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        self.snapshots = names
            .into_iter()
            .map(|name| (name.to_string(), StatusSnapshot::unknown()))
            .collect();
    }

    pub fn update(&mut self, name: &str, snapshot: StatusSnapshot) {
        self.snapshots.insert(name.to_string(), snapshot);
    }

    pub fn get(&self, name: &str) -> Option<&StatusSnapshot> {
        self.snapshots.get(name)
    }

    pub fn snapshots(&self) -> &BTreeMap<String, StatusSnapshot> {
        &self.snapshots
    }

    /// Overwrite the persisted mapping with the in-memory one
    pub async fn save(&self) -> AppResult<()> {
        let body = serde_json::to_vec_pretty(&self.snapshots)?;
        write_atomic(&self.path, &body)
            .await
            .map_err(|source| AppError::StatusStoreWrite {
                path: self.path.display().to_string(),
                source,
            })
    }

    /// Read a persisted mapping
    ///
    /// A missing file reads as an empty mapping (the monitor has not run yet).
    pub async fn load(path: &Path) -> AppResult<BTreeMap<String, StatusSnapshot>> {
        let content = match tokio::fs::read(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(AppError::StatusStoreRead {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        Ok(serde_json::from_slice(&content)?)
    }
}
