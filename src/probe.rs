//! Endpoint probes
//!
//! A probe answers one question: is the target reachable right now? It may
//! retry internally, but callers only ever see the final boolean. Details
//! of individual attempts are reported through logs.

use crate::config::MonitorSettings;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use std::time::Duration;

const USER_AGENT: &str = concat!("vigil/", env!("CARGO_PKG_VERSION"));

/// How many attempts a probe makes and how long it waits between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Zero attempts is treated as one
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl From<&MonitorSettings> for RetryPolicy {
    fn from(settings: &MonitorSettings) -> Self {
        Self::new(settings.retry_attempts, settings.retry_delay_duration())
    }
}

/// Reachability check for a single target
#[async_trait]
pub trait Probe: Send + Sync {
    /// True on the first successful attempt, false once all attempts fail
    async fn check(&self, target: &str, policy: &RetryPolicy) -> bool;
}

/// HTTP GET probe: any 2xx response is a success
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    /// Build a probe whose attempts each time out after `timeout`
    pub fn new(timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn attempt(&self, target: &str) -> Result<(), String> {
        match self.client.get(target).send().await {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => Err(format!("status {}", response.status())),
            Err(e) => Err(e.to_string()),
        }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn check(&self, target: &str, policy: &RetryPolicy) -> bool {
        for attempt in 1..=policy.attempts() {
            match self.attempt(target).await {
                Ok(()) => {
                    tracing::debug!(target = %target, attempt, "Probe succeeded");
                    return true;
                }
                Err(reason) => {
                    tracing::warn!(
                        target = %target,
                        attempt,
                        max_attempts = policy.attempts(),
                        reason = %reason,
                        "Probe attempt failed"
                    );
                }
            }

            if attempt < policy.attempts() {
                tokio::time::sleep(policy.delay()).await;
            }
        }
        false
    }
}
