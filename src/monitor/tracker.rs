//! Per-service health tracking with hysteresis
//!
//! The tracker counts consecutive failures and successes for every service
//! and remembers whether a down alert has been sent. It only answers
//! questions; the scheduler decides when to act on them and reports back
//! through `mark_alerted` / `mark_recovered`.
//!
//! State is in-memory only. A restart starts every service from scratch.

use super::clock::{Clock, SystemClock};
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Hysteresis counters and alert memory for a single service
///
/// At most one of the two counters is nonzero at any time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthRecord {
    consecutive_failures: u32,
    consecutive_successes: u32,
    last_alert_time: Option<DateTime<Utc>>,
    is_down: bool,
}

impl HealthRecord {
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn consecutive_successes(&self) -> u32 {
        self.consecutive_successes
    }

    pub fn last_alert_time(&self) -> Option<DateTime<Utc>> {
        self.last_alert_time
    }

    /// True between a dispatched down alert and the matching recovery
    pub fn is_down(&self) -> bool {
        self.is_down
    }
}

/// Derived view of a service's health
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    /// Never observed
    Unknown,
    /// Last observation succeeded and no alert is outstanding
    Up,
    /// Last observation failed, or an alert is still outstanding
    Down { alerted: bool },
}

/// Health state machine for every monitored service
///
/// Owned by the scheduler loop. Records are created lazily on first use.
pub struct HealthTracker {
    records: HashMap<String, HealthRecord>,
    clock: Arc<dyn Clock>,
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl HealthTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: HashMap::new(),
            clock,
        }
    }

    fn entry(&mut self, name: &str) -> &mut HealthRecord {
        self.records.entry(name.to_string()).or_default()
    }

    /// Record a failed check, returning the new consecutive failure count
    pub fn record_failure(&mut self, name: &str) -> u32 {
        let record = self.entry(name);
        record.consecutive_failures = record.consecutive_failures.saturating_add(1);
        record.consecutive_successes = 0;
        record.consecutive_failures
    }

    /// Record a successful check, returning the new consecutive success count
    pub fn record_success(&mut self, name: &str) -> u32 {
        let record = self.entry(name);
        record.consecutive_successes = record.consecutive_successes.saturating_add(1);
        record.consecutive_failures = 0;
        record.consecutive_successes
    }

    /// Whether a down alert should be dispatched now
    ///
    /// False below `threshold`. At or above it, true when no alert has been
    /// sent yet, or when `repeat_interval` has elapsed since the last one.
    /// This is a pure query: asking twice without `mark_alerted` in between
    /// gives the same answer.
    pub fn should_alert(&self, name: &str, threshold: u32, repeat_interval: Duration) -> bool {
        let (failures, last_alert) = self
            .records
            .get(name)
            .map(|r| (r.consecutive_failures, r.last_alert_time))
            .unwrap_or((0, None));

        if failures < threshold {
            return false;
        }

        match last_alert {
            None => true,
            Some(last) => {
                let window = TimeDelta::from_std(repeat_interval).unwrap_or(TimeDelta::MAX);
                self.clock.now().signed_duration_since(last) >= window
            }
        }
    }

    /// Note that a down alert was dispatched
    pub fn mark_alerted(&mut self, name: &str) {
        let now = self.clock.now();
        let record = self.entry(name);
        record.last_alert_time = Some(now);
        record.is_down = true;
    }

    /// Whether a recovery notice is due
    ///
    /// Only services that were alerted as down can recover.
    pub fn is_recovered(&self, name: &str, recovery_threshold: u32) -> bool {
        self.records
            .get(name)
            .is_some_and(|r| r.is_down && r.consecutive_successes >= recovery_threshold)
    }

    /// Note that a recovery notice was dispatched
    pub fn mark_recovered(&mut self, name: &str) {
        let record = self.entry(name);
        record.last_alert_time = None;
        record.is_down = false;
    }

    pub fn record(&self, name: &str) -> Option<&HealthRecord> {
        self.records.get(name)
    }

    pub fn state(&self, name: &str) -> HealthState {
        match self.records.get(name) {
            None => HealthState::Unknown,
            Some(r) if r.is_down => HealthState::Down { alerted: true },
            Some(r) if r.consecutive_failures > 0 => HealthState::Down { alerted: false },
            Some(r) if r.consecutive_successes > 0 => HealthState::Up,
            Some(_) => HealthState::Unknown,
        }
    }
}
