//! HTTP request handlers for the Vigil status API
//!
//! Read-only views over the persisted status store and alert log, plus the
//! operator's alert-log clear. The API never touches tracker state.

use crate::config::Config;
use crate::metrics::Metrics;
use crate::store::AlertLog;
use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod alerts;
pub mod health;
pub mod metrics;
pub mod status;

/// Application state shared across all handlers
///
/// All fields are Arc'd for cheap cloning across Axum handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    metrics: Arc<Metrics>,
    alert_log: Arc<AlertLog>,
}

impl AppState {
    pub fn new(config: Arc<Config>, metrics: Arc<Metrics>, alert_log: Arc<AlertLog>) -> Self {
        Self {
            config,
            metrics,
            alert_log,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn alert_log(&self) -> &AlertLog {
        &self.alert_log
    }
}

/// Build the status API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::handler))
        .route("/status", get(status::handler))
        .route("/alerts", get(alerts::list).delete(alerts::clear))
        .route("/metrics", get(metrics::handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::str::FromStr;

    /// State backed by files inside `dir`
    pub fn state_in(dir: &std::path::Path) -> AppState {
        let mut config = Config::from_str(
            r#"
[websites]
"API-1" = "http://localhost:9000/health"
"#,
        )
        .expect("should parse test config");
        config.storage.status_file = dir.join("status_store.json");
        config.storage.alerts_file = dir.join("alerts.json");

        let alert_log = Arc::new(AlertLog::new(&config.storage.alerts_file));
        AppState::new(
            Arc::new(config),
            Arc::new(Metrics::new().expect("should create metrics")),
            alert_log,
        )
    }
}
