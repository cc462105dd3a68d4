//! Fixed-interval monitoring loop
//!
//! Each cycle probes every service in order, feeds the outcome to the
//! health tracker, persists the status store and dispatches alerts the
//! tracker asks for. Then it sleeps whatever is left of the check interval.

use super::clock::Clock;
use super::tracker::HealthTracker;
use crate::config::{Config, MonitorSettings, Service};
use crate::error::AppResult;
use crate::metrics::{CheckResult, Metrics, PersistenceTarget};
use crate::notify::{Alert, AlertSink, Delivery};
use crate::probe::{Probe, RetryPolicy};
use crate::store::{AlertStatus, StatusSnapshot, StatusStore};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shortest sleep between cycles, even when probing overran the interval
pub const MIN_CYCLE_SLEEP: Duration = Duration::from_secs(1);

/// Time left in the cycle budget, never less than [`MIN_CYCLE_SLEEP`]
pub fn compute_sleep(elapsed: Duration, interval: Duration) -> Duration {
    interval.saturating_sub(elapsed).max(MIN_CYCLE_SLEEP)
}

/// What happened to one service during a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceOutcome {
    pub service: String,
    pub healthy: bool,
    /// Consecutive failures or successes after this check
    pub streak: u32,
    /// Alert dispatched this cycle, if any
    pub alert: Option<AlertStatus>,
    pub delivery: Option<Delivery>,
}

/// Summary of one pass over all services
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub outcomes: Vec<ServiceOutcome>,
    pub elapsed: Duration,
}

impl CycleReport {
    pub fn healthy_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.healthy).count()
    }

    pub fn alerts(&self) -> impl Iterator<Item = &ServiceOutcome> {
        self.outcomes.iter().filter(|o| o.alert.is_some())
    }
}

/// Drives the monitoring loop; sole owner of tracker and status store
pub struct Scheduler {
    services: Vec<Service>,
    settings: MonitorSettings,
    probe: Arc<dyn Probe>,
    tracker: HealthTracker,
    store: StatusStore,
    sink: AlertSink,
    clock: Arc<dyn Clock>,
    metrics: Arc<Metrics>,
}

impl Scheduler {
    /// Build a scheduler for the websites in `config`
    ///
    /// # Errors
    /// `NoServicesConfigured` when neither websites nor databases are set.
    pub fn new(
        config: &Config,
        probe: Arc<dyn Probe>,
        store: StatusStore,
        sink: AlertSink,
        clock: Arc<dyn Clock>,
        metrics: Arc<Metrics>,
    ) -> AppResult<Self> {
        config.ensure_services()?;

        if !config.databases.is_empty() {
            tracing::warn!(
                databases = config.databases.len(),
                "Database entries are configured but not probed"
            );
        }

        Ok(Self {
            services: config.services(),
            settings: config.monitor_settings.clone(),
            probe,
            tracker: HealthTracker::new(clock.clone()),
            store,
            sink,
            clock,
            metrics,
        })
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn tracker(&self) -> &HealthTracker {
        &self.tracker
    }

    pub fn store(&self) -> &StatusStore {
        &self.store
    }

    async fn persist(&self) {
        if let Err(e) = self.store.save().await {
            tracing::error!(error = %e, "Failed saving status store");
            self.metrics.persistence_failure(PersistenceTarget::StatusStore);
        }
    }

    /// Write an `unknown` snapshot for every service before the first cycle
    pub async fn initialize(&mut self) {
        self.store
            .reset(self.services.iter().map(|service| service.name()));
        self.persist().await;
        tracing::info!(
            services = self.services.len(),
            path = %self.store.path().display(),
            "Status store initialized"
        );
    }

    async fn check_service(&mut self, service: &Service, policy: &RetryPolicy) -> ServiceOutcome {
        let name = service.name();
        tracing::info!(service = %name, target = %service.target(), "Checking service");

        let healthy = self.probe.check(service.target(), policy).await;
        let now = self.clock.now();

        if !healthy {
            let failures = self.tracker.record_failure(name);
            self.store.update(name, StatusSnapshot::down(failures, now));
            self.persist().await;
            self.metrics
                .record_check(name, CheckResult::Failure, failures);

            let mut outcome = ServiceOutcome {
                service: name.to_string(),
                healthy,
                streak: failures,
                alert: None,
                delivery: None,
            };

            if self.tracker.should_alert(
                name,
                self.settings.alert_threshold,
                self.settings.alert_repeat_duration(),
            ) {
                tracing::error!(service = %name, failures, "Service is DOWN, sending alert");
                let delivery = self.sink.notify(&Alert::down(service, now)).await;
                self.tracker.mark_alerted(name);
                self.metrics.record_alert(name, AlertStatus::Down);
                outcome.alert = Some(AlertStatus::Down);
                outcome.delivery = Some(delivery);
            } else {
                tracing::warn!(service = %name, failures, "Service check failed");
            }
            outcome
        } else {
            let successes = self.tracker.record_success(name);
            self.store.update(name, StatusSnapshot::up(now));
            self.persist().await;
            self.metrics.record_check(name, CheckResult::Success, 0);

            let mut outcome = ServiceOutcome {
                service: name.to_string(),
                healthy,
                streak: successes,
                alert: None,
                delivery: None,
            };

            if self
                .tracker
                .is_recovered(name, self.settings.recovery_threshold)
            {
                tracing::info!(service = %name, successes, "Service recovered, sending notice");
                let delivery = self.sink.notify(&Alert::recovered(service, now)).await;
                self.tracker.mark_recovered(name);
                self.metrics.record_alert(name, AlertStatus::Recovered);
                outcome.alert = Some(AlertStatus::Recovered);
                outcome.delivery = Some(delivery);
            }
            outcome
        }
    }

    /// Probe every service once
    pub async fn run_cycle(&mut self) -> CycleReport {
        let started = Instant::now();
        let policy = RetryPolicy::from(&self.settings);

        let mut outcomes = Vec::with_capacity(self.services.len());
        for index in 0..self.services.len() {
            let service = self.services[index].clone();
            outcomes.push(self.check_service(&service, &policy).await);
        }

        let elapsed = started.elapsed();
        self.metrics.observe_cycle_duration(elapsed.as_secs_f64());
        CycleReport { outcomes, elapsed }
    }

    /// Run cycles until `shutdown` resolves
    ///
    /// A panic inside a cycle is logged and followed by the configured
    /// cooldown; it never ends the loop. Shutdown is honoured at the top of
    /// each iteration and while sleeping between cycles, never mid-probe.
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        self.initialize().await;
        tracing::info!(
            services = self.services.len(),
            check_interval_secs = self.settings.check_interval,
            "Starting monitor loop"
        );

        loop {
            if shutdown.as_mut().now_or_never().is_some() {
                break;
            }

            let pause = match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
                Ok(report) => {
                    let pause =
                        compute_sleep(report.elapsed, self.settings.check_interval_duration());
                    tracing::info!(
                        healthy = report.healthy_count(),
                        total = report.outcomes.len(),
                        alerts = report.alerts().count(),
                        elapsed_ms = report.elapsed.as_millis() as u64,
                        sleep_secs = pause.as_secs_f64(),
                        "Cycle complete"
                    );
                    pause
                }
                Err(panic) => {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    tracing::error!(
                        error = %message,
                        cooldown_secs = self.settings.error_cooldown,
                        "Unexpected error in monitor loop"
                    );
                    self.metrics.cycle_failure();
                    self.settings.error_cooldown_duration()
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = shutdown.as_mut() => break,
            }
        }

        tracing::info!("Monitor stopped");
    }
}
