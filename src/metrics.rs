//! Prometheus metrics collection for Vigil
//!
//! This module provides metrics instrumentation for tracking:
//! - Check outcomes per service
//! - Dispatched down/recovered alerts
//! - Notification fallbacks and persistence failures
//! - Cycle duration and cycles aborted by unexpected faults
//!
//! Metrics are exposed via the `/metrics` endpoint of the status API in
//! Prometheus text format.

use crate::store::AlertStatus;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Probe outcome label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckResult {
    Success,
    Failure,
}

impl CheckResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckResult::Success => "success",
            CheckResult::Failure => "failure",
        }
    }
}

/// Persisted document label
///
/// Restricting labels to an enum keeps cardinality bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceTarget {
    StatusStore,
    AlertLog,
}

impl PersistenceTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersistenceTarget::StatusStore => "status_store",
            PersistenceTarget::AlertLog => "alert_log",
        }
    }
}

/// Label-free running totals read by the health endpoint
#[derive(Debug, Default)]
struct Totals {
    alerts: AtomicU64,
    notification_fallbacks: AtomicU64,
    persistence_failures: AtomicU64,
}

/// Metrics collector for Vigil
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    checks_total: IntCounterVec,
    alerts_total: IntCounterVec,
    service_up: IntGaugeVec,
    consecutive_failures: IntGaugeVec,
    notification_fallbacks: IntCounterVec,
    persistence_failures: IntCounterVec,
    cycle_duration: Histogram,
    cycle_failures: IntCounter,
    totals: Arc<Totals>,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// Registers all metrics with a new Prometheus registry.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: N services × 2 results
        let checks_total = IntCounterVec::new(
            Opts::new(
                "vigil_checks_total",
                "Total number of probe checks by service and result",
            ),
            &["service", "result"],
        )?;

        // Cardinality: N services × 2 statuses
        let alerts_total = IntCounterVec::new(
            Opts::new(
                "vigil_alerts_total",
                "Total number of dispatched alerts by service and status (down, recovered)",
            ),
            &["service", "status"],
        )?;

        let service_up = IntGaugeVec::new(
            Opts::new(
                "vigil_service_up",
                "1 if the latest check of the service succeeded, 0 otherwise",
            ),
            &["service"],
        )?;

        let consecutive_failures = IntGaugeVec::new(
            Opts::new(
                "vigil_consecutive_failures",
                "Current consecutive failure count per service",
            ),
            &["service"],
        )?;

        // Labels:
        // - transport: primary transport that failed (e.g., "smtp")
        let notification_fallbacks = IntCounterVec::new(
            Opts::new(
                "vigil_notification_fallbacks_total",
                "Total number of alerts that fell back to the alert log because the primary transport failed",
            ),
            &["transport"],
        )?;

        // Alert on ANY increment: the status store or alert log is not being written
        let persistence_failures = IntCounterVec::new(
            Opts::new(
                "vigil_persistence_failures_total",
                "Total number of failed writes by target (status_store, alert_log)",
            ),
            &["target"],
        )?;

        let cycle_duration = Histogram::with_opts(
            HistogramOpts::new(
                "vigil_cycle_duration_seconds",
                "Wall time spent probing all services in one cycle",
            )
            .buckets(vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        )?;

        let cycle_failures = IntCounter::with_opts(Opts::new(
            "vigil_cycle_failures_total",
            "Total number of monitor cycles aborted by an unexpected fault",
        ))?;

        registry.register(Box::new(checks_total.clone()))?;
        registry.register(Box::new(alerts_total.clone()))?;
        registry.register(Box::new(service_up.clone()))?;
        registry.register(Box::new(consecutive_failures.clone()))?;
        registry.register(Box::new(notification_fallbacks.clone()))?;
        registry.register(Box::new(persistence_failures.clone()))?;
        registry.register(Box::new(cycle_duration.clone()))?;
        registry.register(Box::new(cycle_failures.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            checks_total,
            alerts_total,
            service_up,
            consecutive_failures,
            notification_fallbacks,
            persistence_failures,
            cycle_duration,
            cycle_failures,
            totals: Arc::new(Totals::default()),
        })
    }

    /// Record one probe outcome and the resulting failure streak
    pub fn record_check(&self, service: &str, result: CheckResult, consecutive_failures: u32) {
        self.checks_total
            .with_label_values(&[service, result.as_str()])
            .inc();
        self.service_up
            .with_label_values(&[service])
            .set(i64::from(result == CheckResult::Success));
        self.consecutive_failures
            .with_label_values(&[service])
            .set(i64::from(consecutive_failures));
    }

    pub fn record_alert(&self, service: &str, status: AlertStatus) {
        self.alerts_total
            .with_label_values(&[service, status.as_str()])
            .inc();
        self.totals.alerts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn notification_fallback(&self, transport: &str) {
        self.notification_fallbacks
            .with_label_values(&[transport])
            .inc();
        self.totals
            .notification_fallbacks
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn persistence_failure(&self, target: PersistenceTarget) {
        self.persistence_failures
            .with_label_values(&[target.as_str()])
            .inc();
        self.totals
            .persistence_failures
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Record how long a cycle took to probe every service
    ///
    /// Non-finite or negative values are dropped; they would poison the
    /// histogram's sum.
    pub fn observe_cycle_duration(&self, seconds: f64) {
        if seconds.is_finite() && seconds >= 0.0 {
            self.cycle_duration.observe(seconds);
        } else {
            tracing::warn!(seconds, "Ignoring invalid cycle duration");
        }
    }

    pub fn cycle_failure(&self) {
        self.cycle_failures.inc();
    }

    pub fn cycle_failures_count(&self) -> u64 {
        self.cycle_failures.get()
    }

    /// Sum of persistence failures across all targets
    pub fn persistence_failures_count(&self) -> u64 {
        self.totals.persistence_failures.load(Ordering::Relaxed)
    }

    /// Sum of notification fallbacks across all transports
    pub fn notification_fallbacks_count(&self) -> u64 {
        self.totals.notification_fallbacks.load(Ordering::Relaxed)
    }

    /// Sum of dispatched alerts across services and statuses
    pub fn alerts_count(&self) -> u64 {
        self.totals.alerts.load(Ordering::Relaxed)
    }

    /// Encode all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();

        encoder.encode(&metric_families, &mut buffer).map_err(|e| {
            tracing::error!(
                error = %e,
                metric_family_count = metric_families.len(),
                "Prometheus text encoder failed"
            );
            e
        })?;

        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!("Metrics output is not valid UTF-8: {}", e))
        })
    }
}
