//! Health tracking and the monitoring loop
//!
//! [`start`] wires the production collaborators (HTTP probe, SMTP transport,
//! file-backed stores) into a [`Scheduler`] and runs it until shutdown.

pub mod clock;
pub mod scheduler;
pub mod tracker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use scheduler::{CycleReport, Scheduler, ServiceOutcome, compute_sleep};
pub use tracker::{HealthRecord, HealthState, HealthTracker};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::handlers::{self, AppState};
use crate::metrics::Metrics;
use crate::notify::{AlertSink, Notifier, SmtpNotifier};
use crate::probe::HttpProbe;
use crate::store::{AlertLog, StatusStore};
use crate::system_info::SystemInfo;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

fn alert_transport(config: &Config) -> Option<Arc<dyn Notifier>> {
    match SmtpNotifier::from_config(&config.email) {
        Ok(Some(notifier)) => {
            tracing::info!(
                recipients = config.email.recipient_emails.len(),
                "SMTP alerts enabled"
            );
            Some(Arc::new(notifier))
        }
        Ok(None) => {
            tracing::info!("No SMTP credentials configured, alerts go to the alert log");
            None
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                "SMTP transport could not be created, alerts go to the alert log"
            );
            None
        }
    }
}

async fn spawn_status_api(config: &Arc<Config>, state: AppState) -> AppResult<()> {
    let ip = config
        .server
        .host
        .parse::<std::net::IpAddr>()
        .map_err(|e| {
            AppError::Config(format!(
                "server.host '{}' is not an IP address: {}",
                config.server.host, e
            ))
        })?;
    let addr = SocketAddr::from((ip, config.server.port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| AppError::ServerBind {
            addr: addr.to_string(),
            source,
        })?;
    tracing::info!("Status API listening on http://{}", addr);

    let app = handlers::router(state);
    let handle = tokio::spawn(async move { axum::serve(listener, app).await });

    // Report if the API dies; monitoring itself carries on
    tokio::spawn(async move {
        match handle.await {
            Ok(Ok(())) => tracing::warn!("Status API stopped"),
            Ok(Err(e)) => tracing::error!(error = %e, "Status API failed"),
            Err(e) => tracing::error!(error = %e, "Status API task panicked"),
        }
    });
    Ok(())
}

/// Run the monitor with production collaborators until `shutdown` resolves
pub async fn start<F>(config: Config, shutdown: F) -> AppResult<()>
where
    F: Future<Output = ()>,
{
    config.ensure_services()?;

    let config = Arc::new(config);
    let metrics = Arc::new(
        Metrics::new().map_err(|e| AppError::Internal(format!("metrics registry: {}", e)))?,
    );
    let alert_log = Arc::new(AlertLog::new(&config.storage.alerts_file));

    if config.server.enabled {
        let state = AppState::new(config.clone(), metrics.clone(), alert_log.clone());
        spawn_status_api(&config, state).await?;
    }

    let probe = Arc::new(HttpProbe::new(
        config.monitor_settings.request_timeout_duration(),
    )?);
    let sink = AlertSink::new(
        alert_transport(&config),
        alert_log,
        SystemInfo::collect(),
        metrics.clone(),
    );
    let store = StatusStore::new(&config.storage.status_file);

    tracing::info!("Starting Vigil monitor");
    let scheduler = Scheduler::new(
        &config,
        probe,
        store,
        sink,
        Arc::new(SystemClock),
        metrics,
    )?;
    scheduler.run(shutdown).await;
    Ok(())
}
