//! Vigil - Endpoint health monitor with hysteresis alerting
//!
//! This library probes a fixed set of HTTP endpoints on an interval, tracks
//! consecutive failures and successes per service, and raises a down alert or
//! a recovery notice only once a streak crosses its threshold.

pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod monitor;
pub mod notify;
pub mod probe;
pub mod shutdown;
pub mod store;
pub mod system_info;
pub mod telemetry;
