//! Command-line interface for Vigil
//!
//! Provides argument parsing and the offline subcommands that read or edit the
//! persisted status store and alert log without a running monitor.

use crate::config::{Config, ServiceKind};
use crate::error::AppResult;
use crate::store::{AlertLog, AlertRecord, AlertStatus, StatusStore};
use chrono::{DateTime, SecondsFormat, Utc};
use clap::{Parser, Subcommand};
use std::fmt::Write;

/// Endpoint health monitor with hysteresis alerting
#[derive(Parser)]
#[command(name = "vigil")]
#[command(version)]
#[command(about = "Endpoint health monitor with hysteresis alerting")]
#[command(
    long_about = "Vigil probes the configured endpoints on a fixed interval, raises an alert \
    once a service has failed enough consecutive checks, and announces recovery once it \
    has passed enough consecutive checks again."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "vigil.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the monitor until interrupted (default)
    Run,
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Print the last persisted status of every service
    Status,
    /// Print the most recent alerts, newest first
    Alerts {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Empty the alert log
    ClearAlerts,
    /// Append a synthetic "down" alert for a service
    SimulateFailure {
        /// Service name written into the alert
        service: String,
        #[arg(long, default_value = "Simulated failure by user")]
        info: String,
    },
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "N/A".to_string())
}

/// Render the persisted status store as a table
pub async fn render_status(config: &Config) -> AppResult<String> {
    let snapshots = StatusStore::load(&config.storage.status_file).await?;
    if snapshots.is_empty() {
        return Ok(format!(
            "No status data yet. Start the monitor to populate {}\n",
            config.storage.status_file.display()
        ));
    }

    let width = snapshots.keys().map(String::len).max().unwrap_or(0).max(7);
    let mut out = format!(
        "{:<width$}  {:<7}  {:>8}  LAST CHECKED\n",
        "SERVICE", "STATUS", "FAILURES"
    );
    for (name, snapshot) in &snapshots {
        let _ = writeln!(
            out,
            "{:<width$}  {:<7}  {:>8}  {}",
            name,
            snapshot.status.as_str(),
            snapshot.failures,
            format_time(snapshot.last_checked),
        );
    }
    Ok(out)
}

/// Render up to `limit` alerts, newest first
pub async fn render_alerts(config: &Config, limit: usize) -> AppResult<String> {
    let log = AlertLog::new(&config.storage.alerts_file);
    let records = log.recent(limit).await?;
    if records.is_empty() {
        return Ok("No incidents logged\n".to_string());
    }

    let mut out = String::new();
    for record in &records {
        let _ = write!(
            out,
            "{}  {:<9}  {}",
            format_time(Some(record.time)),
            record.status.as_str(),
            record.service
        );
        if let Some(info) = &record.info {
            let _ = write!(out, "  ({})", info);
        }
        out.push('\n');
    }
    Ok(out)
}

/// Empty the alert log
pub async fn clear_alerts(config: &Config) -> AppResult<()> {
    AlertLog::new(&config.storage.alerts_file).clear().await?;
    tracing::warn!(
        path = %config.storage.alerts_file.display(),
        "Alert log cleared"
    );
    Ok(())
}

/// Append a synthetic down alert, returning the new log length
pub async fn simulate_failure(config: &Config, service: &str, info: &str) -> AppResult<usize> {
    let record = AlertRecord {
        time: Utc::now(),
        service: service.to_string(),
        kind: ServiceKind::Web.as_str().to_string(),
        status: AlertStatus::Down,
        info: Some(info.to_string()),
        system: None,
    };
    AlertLog::new(&config.storage.alerts_file)
        .append(&record)
        .await
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# Vigil Configuration
# ===================
#
# Services to probe, alerting policy, alert delivery and storage locations.

# ─────────────────────────────────────────────────────────────────────────────
# SERVICES
# ─────────────────────────────────────────────────────────────────────────────
#
# Each website is probed with an HTTP GET. Any 2xx response is healthy.

[websites]
"Telemetry-API-01" = "http://localhost:8000/health"
"Control-Panel" = "http://localhost:8001/"

# Databases are listed for inventory only and are not probed.
# [databases]
# "Historian-DB" = { host = "localhost", port = 5432 }

# ─────────────────────────────────────────────────────────────────────────────
# MONITOR SETTINGS
# ─────────────────────────────────────────────────────────────────────────────
#
# All intervals are in seconds.

[monitor_settings]
# Probe attempts per check (a check fails only if every attempt fails)
retry_attempts = 2
retry_delay = 3

# Consecutive failed checks before the first alert
alert_threshold = 2

# While a service stays down, re-alert at most this often
alert_repeat_interval = 120

# Consecutive successful checks before a down service is declared recovered
recovery_threshold = 2

# Target time between the start of two cycles
check_interval = 30

# Per-attempt HTTP timeout
request_timeout = 10

# Pause after a cycle aborted by an unexpected fault
error_cooldown = 30

# ─────────────────────────────────────────────────────────────────────────────
# EMAIL
# ─────────────────────────────────────────────────────────────────────────────
#
# Email is only attempted when sender_password is set. Without it, or when
# sending fails, alerts are appended to the alert log instead.

[email]
smtp_server = "smtp.example.com"
smtp_port = 587
smtp_use_tls = true
sender_email = "monitor@example.com"
# sender_password = "app-password"
recipient_emails = ["oncall@example.com"]

# ─────────────────────────────────────────────────────────────────────────────
# STORAGE
# ─────────────────────────────────────────────────────────────────────────────

[storage]
status_file = "status_store.json"
alerts_file = "alerts.json"

# ─────────────────────────────────────────────────────────────────────────────
# STATUS API (Optional)
# ─────────────────────────────────────────────────────────────────────────────
#
# Serves /health, /status, /alerts and /metrics.

[server]
enabled = false
host = "127.0.0.1"
port = 8080

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
log_level = "info"

# Also log to a daily-rotated file
# log_file = "logs/vigil.log"
log_max_files = 5
"#
}
