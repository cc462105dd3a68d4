//! HTTP-level tests for the status API
//!
//! Serves the real router on an ephemeral port and talks to it with reqwest.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use vigil::config::Config;
use vigil::handlers::{self, AppState};
use vigil::metrics::Metrics;
use vigil::store::{AlertLog, AlertRecord, AlertStatus, StatusSnapshot, StatusStore};

struct TestServer {
    addr: SocketAddr,
    state: AppState,
    _dir: tempfile::TempDir,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

async fn serve() -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::from_str(
        r#"
[websites]
"API-1" = "http://localhost:9000/health"
"#,
    )
    .unwrap();
    config.storage.status_file = dir.path().join("status_store.json");
    config.storage.alerts_file = dir.path().join("alerts.json");

    let alert_log = Arc::new(AlertLog::new(&config.storage.alerts_file));
    let state = AppState::new(
        Arc::new(config),
        Arc::new(Metrics::new().unwrap()),
        alert_log,
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = handlers::router(state.clone());
    tokio::spawn(async move { axum::serve(listener, app).await });

    TestServer {
        addr,
        state,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = serve().await;
    let body: serde_json::Value = reqwest::get(server.url("/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "OK");
    assert_eq!(body["monitor_status"], "operational");
}

#[tokio::test]
async fn test_status_endpoint_reflects_store() {
    let server = serve().await;
    let mut store = StatusStore::new(&server.state.config().storage.status_file);
    store.reset(["API-1"]);
    store.update("API-1", StatusSnapshot::down(2, chrono::Utc::now()));
    store.save().await.unwrap();

    let response = reqwest::get(server.url("/status")).await.unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["API-1"]["status"], "down");
    assert_eq!(body["API-1"]["failures"], 2);
}

#[tokio::test]
async fn test_alerts_list_and_clear() {
    let server = serve().await;
    server
        .state
        .alert_log()
        .append(&AlertRecord {
            time: chrono::Utc::now(),
            service: "API-1".to_string(),
            kind: "web".to_string(),
            status: AlertStatus::Down,
            info: Some("Simulated failure by user".to_string()),
            system: None,
        })
        .await
        .unwrap();

    let body: serde_json::Value = reqwest::get(server.url("/alerts?limit=5"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["type"], "web");
    assert_eq!(body[0]["status"], "down");

    let response = reqwest::Client::new()
        .delete(server.url("/alerts"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let body: serde_json::Value = reqwest::get(server.url("/alerts"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_corrupt_alert_log_is_reported_as_conflict() {
    let server = serve().await;
    std::fs::write(server.state.alert_log().path(), "not json").unwrap();

    let response = reqwest::get(server.url("/alerts")).await.unwrap();
    assert_eq!(response.status(), 409);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("refusing to overwrite"));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let server = serve().await;
    let response = reqwest::get(server.url("/metrics")).await.unwrap();
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("vigil_cycle_failures_total"));
}
