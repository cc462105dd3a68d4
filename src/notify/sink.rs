//! Best-effort alert delivery with alert-log fallback

use super::{Alert, Notifier, NotifyError};
use crate::error::AppResult;
use crate::metrics::{Metrics, PersistenceTarget};
use crate::store::AlertLog;
use crate::system_info::SystemInfo;
use std::sync::Arc;

/// Where a notice ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Sent through the primary transport
    Transport,
    /// Appended to the alert log
    Logged,
    /// Neither worked; only the process log has it
    Dropped,
}

/// Delivers alerts: primary transport first, alert log second
///
/// `notify` never fails. Every problem is logged and counted.
pub struct AlertSink {
    transport: Option<Arc<dyn Notifier>>,
    log: Arc<AlertLog>,
    system: SystemInfo,
    metrics: Arc<Metrics>,
}

impl AlertSink {
    pub fn new(
        transport: Option<Arc<dyn Notifier>>,
        log: Arc<AlertLog>,
        system: SystemInfo,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            transport,
            log,
            system,
            metrics,
        }
    }

    pub fn alert_log(&self) -> &Arc<AlertLog> {
        &self.log
    }

    async fn send_via_transport(
        &self,
        transport: &dyn Notifier,
        alert: &Alert,
    ) -> Result<(), NotifyError> {
        transport.send(alert, &self.system).await
    }

    async fn append_to_log(&self, alert: &Alert) -> AppResult<usize> {
        let record = alert.clone().into_record(self.system.clone());
        self.log.append(&record).await
    }

    pub async fn notify(&self, alert: &Alert) -> Delivery {
        if let Some(transport) = &self.transport {
            match self.send_via_transport(transport.as_ref(), alert).await {
                Ok(()) => {
                    tracing::info!(
                        service = %alert.service,
                        status = alert.status.as_str(),
                        transport = transport.name(),
                        "Alert delivered"
                    );
                    return Delivery::Transport;
                }
                Err(e) => {
                    tracing::error!(
                        service = %alert.service,
                        transport = transport.name(),
                        error = %e,
                        "Alert transport failed, falling back to alert log"
                    );
                    self.metrics.notification_fallback(transport.name());
                }
            }
        }

        match self.append_to_log(alert).await {
            Ok(total) => {
                tracing::info!(
                    service = %alert.service,
                    status = alert.status.as_str(),
                    path = %self.log.path().display(),
                    total_records = total,
                    "Alert appended to alert log"
                );
                Delivery::Logged
            }
            Err(e) => {
                tracing::error!(
                    service = %alert.service,
                    status = alert.status.as_str(),
                    error = %e,
                    "Failed to persist alert; notice is only in the process log"
                );
                self.metrics.persistence_failure(PersistenceTarget::AlertLog);
                Delivery::Dropped
            }
        }
    }
}
