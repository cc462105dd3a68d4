//! Shared fixtures for scheduler integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use vigil::config::Config;
use vigil::metrics::Metrics;
use vigil::monitor::{ManualClock, Scheduler};
use vigil::notify::{Alert, AlertSink, Notifier, NotifyError};
use vigil::probe::{Probe, RetryPolicy};
use vigil::store::{AlertLog, StatusStore};
use vigil::system_info::SystemInfo;

/// Probe that replays scripted outcomes per target, then reports healthy
#[derive(Default)]
pub struct ScriptedProbe {
    script: Mutex<HashMap<String, VecDeque<bool>>>,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, target: &str, outcomes: &[bool]) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(target.to_string(), outcomes.iter().copied().collect());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    async fn check(&self, target: &str, _policy: &RetryPolicy) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .get_mut(target)
            .and_then(VecDeque::pop_front)
            .unwrap_or(true)
    }
}

/// Transport that records what it was asked to send
#[derive(Default)]
pub struct RecordingNotifier {
    pub fail: bool,
    pub sent: Mutex<Vec<Alert>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, alert: &Alert, _system: &SystemInfo) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(alert.clone());
        if self.fail {
            Err(NotifyError("mailbox unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

pub fn test_system() -> SystemInfo {
    SystemInfo {
        hostname: "test-host".to_string(),
        system: "Linux".to_string(),
        release: "6.1".to_string(),
        machine: "x86_64".to_string(),
        runtime_version: "vigil test".to_string(),
    }
}

/// Config with the given websites, storage inside `dir`, default policy
pub fn config_in(dir: &Path, websites: &[(&str, &str)]) -> Config {
    let mut toml = String::from("[websites]\n");
    for (name, url) in websites {
        toml.push_str(&format!("\"{}\" = \"{}\"\n", name, url));
    }
    let mut config = Config::from_str(&toml).expect("should parse test config");
    config.storage.status_file = dir.join("status_store.json");
    config.storage.alerts_file = dir.join("alerts.json");
    config
}

pub fn scheduler(
    config: &Config,
    probe: Arc<dyn Probe>,
    clock: Arc<ManualClock>,
    metrics: Arc<Metrics>,
    transport: Option<Arc<dyn Notifier>>,
) -> Scheduler {
    let sink = AlertSink::new(
        transport,
        Arc::new(AlertLog::new(&config.storage.alerts_file)),
        test_system(),
        metrics.clone(),
    );
    Scheduler::new(
        config,
        probe,
        StatusStore::new(&config.storage.status_file),
        sink,
        clock,
        metrics,
    )
    .expect("should build scheduler")
}
