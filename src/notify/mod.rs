//! Alert delivery
//!
//! Notices go out through an optional primary transport (SMTP). Whenever
//! that transport is missing or fails, the notice is appended to the alert
//! log instead.

pub mod sink;
pub mod smtp;

pub use sink::{AlertSink, Delivery};
pub use smtp::SmtpNotifier;

use crate::config::Service;
use crate::store::{AlertRecord, AlertStatus};
use crate::system_info::SystemInfo;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// A down or recovered notice for one service
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub service: String,
    pub kind: String,
    pub status: AlertStatus,
    pub info: Option<String>,
    pub time: DateTime<Utc>,
}

impl Alert {
    pub fn new(service: &Service, status: AlertStatus, time: DateTime<Utc>) -> Self {
        Self {
            service: service.name().to_string(),
            kind: service.kind().as_str().to_string(),
            status,
            info: None,
            time,
        }
    }

    pub fn down(service: &Service, time: DateTime<Utc>) -> Self {
        Self::new(service, AlertStatus::Down, time)
    }

    pub fn recovered(service: &Service, time: DateTime<Utc>) -> Self {
        Self::new(service, AlertStatus::Recovered, time)
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    /// Email subject line
    pub fn subject(&self) -> String {
        match self.status {
            AlertStatus::Down => format!("ALERT: {}", self.service),
            AlertStatus::Recovered => format!("RECOVERED: {}", self.service),
        }
    }

    /// Plain-text body shared by every transport
    pub fn body(&self, system: &SystemInfo) -> String {
        let mut body = format!(
            "Service: {}\nType: {}\nStatus: {}\nTime: {}\n",
            self.service,
            self.kind,
            self.status.as_str(),
            self.time.to_rfc3339()
        );
        if let Some(info) = &self.info {
            body.push_str(&format!("Info: {}\n", info));
        }
        body.push_str(&format!(
            "\nSystem: {} ({} {}, {}) {}",
            system.hostname, system.system, system.release, system.machine, system.runtime_version
        ));
        body
    }

    pub fn into_record(self, system: SystemInfo) -> AlertRecord {
        AlertRecord {
            time: self.time,
            service: self.service,
            kind: self.kind,
            status: self.status,
            info: self.info,
            system: Some(system),
        }
    }
}

/// Primary alert transport
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;
    async fn send(&self, alert: &Alert, system: &SystemInfo) -> Result<(), NotifyError>;
}

#[derive(Debug, Error)]
#[error("notify: {0}")]
pub struct NotifyError(pub String);
