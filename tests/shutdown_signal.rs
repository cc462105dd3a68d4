//! Stop signals that arrive before the shutdown future is first polled
//!
//! Raises real signals at this test process. Each test installs its
//! handlers before raising, so the default action (terminating the test
//! binary) never runs.
#![cfg(unix)]

use std::str::FromStr;
use std::time::Duration;
use vigil::config::Config;
use vigil::shutdown;
use vigil::store::StatusStore;

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

fn raise(signal: libc::c_int) {
    // SAFETY: raise has no memory-safety preconditions
    let rc = unsafe { libc::raise(signal) };
    assert_eq!(rc, 0, "raise failed");
}

#[tokio::test]
async fn test_sigterm_before_first_poll_resolves_listener() {
    let stop = shutdown::listen();
    raise(libc::SIGTERM);

    tokio::time::timeout(TEST_TIMEOUT, stop)
        .await
        .expect("SIGTERM should resolve the shutdown future");
}

#[tokio::test]
async fn test_interrupt_during_startup_stops_monitor_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::from_str(
        r#"
[websites]
"API-1" = "http://127.0.0.1:9/health"

[monitor_settings]
retry_attempts = 1
request_timeout = 1
"#,
    )
    .unwrap();
    config.storage.status_file = dir.path().join("status_store.json");
    config.storage.alerts_file = dir.path().join("alerts.json");
    let status_file = config.storage.status_file.clone();

    // As in the binary: listen first, then start the monitor
    let stop = shutdown::listen();
    raise(libc::SIGINT);

    let result = tokio::time::timeout(TEST_TIMEOUT, vigil::monitor::start(config, stop))
        .await
        .expect("monitor should stop before its first cycle");
    assert!(result.is_ok(), "got {:?}", result);

    // Startup ran to completion before the loop saw the signal
    let persisted = StatusStore::load(&status_file).await.unwrap();
    assert!(persisted.contains_key("API-1"));
}
