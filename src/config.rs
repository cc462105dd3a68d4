//! Configuration management for Vigil
//!
//! Parses TOML configuration files and provides typed access to settings.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Root configuration structure
///
/// Loaded once at process start. There is no hot reload: a running monitor
/// keeps the configuration it started with.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Websites to probe, keyed by service name
    #[serde(default)]
    pub websites: BTreeMap<String, String>,
    /// Database connection info, keyed by service name
    ///
    /// Databases are not probed; they only count towards the
    /// "no services configured" startup check.
    #[serde(default)]
    pub databases: BTreeMap<String, toml::Value>,
    #[serde(default)]
    pub monitor_settings: MonitorSettings,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Kind of monitored service, written into alert records as `type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Web,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Web => "web",
        }
    }
}

/// A monitored service, immutable for the lifetime of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    name: String,
    target: String,
    kind: ServiceKind,
}

impl Service {
    pub fn new(name: impl Into<String>, target: impl Into<String>, kind: ServiceKind) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            kind,
        }
    }

    /// Create a website service
    pub fn web(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(name, url, ServiceKind::Web)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn kind(&self) -> ServiceKind {
        self.kind
    }
}

/// Probe and alerting policy
///
/// All interval values are in seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorSettings {
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: u32,
    #[serde(default = "default_alert_repeat_interval")]
    pub alert_repeat_interval: u64,
    #[serde(default = "default_recovery_threshold")]
    pub recovery_threshold: u32,
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
    /// Per-attempt probe timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    /// Sleep after a cycle aborted by an unexpected fault
    #[serde(default = "default_error_cooldown")]
    pub error_cooldown: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_delay: default_retry_delay(),
            alert_threshold: default_alert_threshold(),
            alert_repeat_interval: default_alert_repeat_interval(),
            recovery_threshold: default_recovery_threshold(),
            check_interval: default_check_interval(),
            request_timeout: default_request_timeout(),
            error_cooldown: default_error_cooldown(),
        }
    }
}

impl MonitorSettings {
    pub fn retry_delay_duration(&self) -> Duration {
        Duration::from_secs(self.retry_delay)
    }

    pub fn alert_repeat_duration(&self) -> Duration {
        Duration::from_secs(self.alert_repeat_interval)
    }

    pub fn check_interval_duration(&self) -> Duration {
        Duration::from_secs(self.check_interval)
    }

    pub fn request_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn error_cooldown_duration(&self) -> Duration {
        Duration::from_secs(self.error_cooldown)
    }
}

fn default_retry_attempts() -> u32 {
    2
}

fn default_retry_delay() -> u64 {
    3
}

fn default_alert_threshold() -> u32 {
    2
}

fn default_alert_repeat_interval() -> u64 {
    120
}

fn default_recovery_threshold() -> u32 {
    2
}

fn default_check_interval() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    10
}

fn default_error_cooldown() -> u64 {
    30
}

/// SMTP notification settings
///
/// Email delivery is attempted only when a sender password is present.
/// Without one, every alert goes straight to the alert log.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub smtp_server: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default = "default_smtp_use_tls")]
    pub smtp_use_tls: bool,
    #[serde(default)]
    pub sender_email: Option<String>,
    #[serde(default)]
    pub sender_password: Option<String>,
    #[serde(default)]
    pub recipient_emails: Vec<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_server: None,
            smtp_port: default_smtp_port(),
            smtp_use_tls: default_smtp_use_tls(),
            sender_email: None,
            sender_password: None,
            recipient_emails: Vec::new(),
        }
    }
}

impl EmailConfig {
    /// Whether SMTP delivery should be attempted
    pub fn is_enabled(&self) -> bool {
        self.sender_password
            .as_deref()
            .is_some_and(|password| !password.is_empty())
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_use_tls() -> bool {
    true
}

/// Locations of the persisted status store and alert log
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_status_file")]
    pub status_file: PathBuf,
    #[serde(default = "default_alerts_file")]
    pub alerts_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            status_file: default_status_file(),
            alerts_file: default_alerts_file(),
        }
    }
}

fn default_status_file() -> PathBuf {
    PathBuf::from("status_store.json")
}

fn default_alerts_file() -> PathBuf {
    PathBuf::from("alerts.json")
}

/// Status API server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Optional log file; rotated daily when set
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// Number of rotated log files kept on disk
    #[serde(default = "default_log_max_files")]
    pub log_max_files: usize,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: None,
            log_max_files: default_log_max_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_max_files() -> usize {
    5
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        // Phase 1: Read file (preserves io::Error context)
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|source| AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            })?;

        // Phase 2: Parse TOML (preserves toml::de::Error context)
        let config: Self = toml::from_str(&content).map_err(|source| {
            AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            }
        })?;

        // Phase 3: Validate parsed config (provides contextual reason)
        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Websites to probe, in deterministic (name-sorted) order
    pub fn services(&self) -> Vec<Service> {
        self.websites
            .iter()
            .map(|(name, url)| Service::web(name.clone(), url.clone()))
            .collect()
    }

    /// Whether anything at all is configured to be monitored
    pub fn has_services(&self) -> bool {
        !self.websites.is_empty() || !self.databases.is_empty()
    }

    /// Fail fast when nothing is configured to be monitored
    pub fn ensure_services(&self) -> AppResult<()> {
        if self.has_services() {
            Ok(())
        } else {
            Err(AppError::NoServicesConfigured)
        }
    }

    /// Validate configuration after parsing
    ///
    /// This is called automatically by `from_file()`, but can also be called
    /// explicitly when constructing Config via other means (e.g., in tests).
    /// An empty service list is not a validation error here; the monitor
    /// checks it at startup with `ensure_services()`.
    pub fn validate(&self) -> AppResult<()> {
        for (name, url) in &self.websites {
            if name.trim().is_empty() {
                return Err(AppError::Config(
                    "websites contains an entry with an empty name".to_string(),
                ));
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(AppError::Config(format!(
                    "website '{}' has invalid url '{}'. url must start with 'http://' or 'https://'.",
                    name, url
                )));
            }
        }

        let settings = &self.monitor_settings;
        for (field, value) in [
            ("retry_attempts", settings.retry_attempts),
            ("alert_threshold", settings.alert_threshold),
            ("recovery_threshold", settings.recovery_threshold),
        ] {
            if value == 0 {
                return Err(AppError::Config(format!(
                    "monitor_settings.{} must be at least 1, got 0",
                    field
                )));
            }
        }

        if settings.check_interval == 0 {
            return Err(AppError::Config(
                "monitor_settings.check_interval must be greater than 0".to_string(),
            ));
        }
        if settings.request_timeout == 0 || settings.request_timeout > 300 {
            return Err(AppError::Config(format!(
                "monitor_settings.request_timeout must be in 1..=300 seconds, got {}",
                settings.request_timeout
            )));
        }

        if self.email.is_enabled() {
            if self.email.smtp_server.as_deref().is_none_or(str::is_empty) {
                return Err(AppError::Config(
                    "email.smtp_server is required when email.sender_password is set".to_string(),
                ));
            }
            if self.email.sender_email.as_deref().is_none_or(str::is_empty) {
                return Err(AppError::Config(
                    "email.sender_email is required when email.sender_password is set".to_string(),
                ));
            }
            if self.email.recipient_emails.is_empty() {
                return Err(AppError::Config(
                    "email.recipient_emails must list at least one address when email.sender_password is set"
                        .to_string(),
                ));
            }
        }

        if !LOG_LEVELS.contains(&self.observability.log_level.as_str()) {
            return Err(AppError::Config(format!(
                "observability.log_level '{}' is not one of {}",
                self.observability.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_CONFIG: &str = r#"
[websites]
"Telemetry-API-01" = "https://telemetry.example.com/health"
"SCADA-Gateway" = "http://10.0.0.5:8080/status"

[databases]
"Historian" = "postgres://historian.internal:5432/plant"

[monitor_settings]
retry_attempts = 3
retry_delay = 5
alert_threshold = 3
alert_repeat_interval = 300
recovery_threshold = 2
check_interval = 60

[email]
smtp_server = "smtp.example.com"
smtp_port = 587
smtp_use_tls = true
sender_email = "monitor@example.com"
sender_password = "secret"
recipient_emails = ["ops@example.com"]

[observability]
log_level = "debug"
"#;

    #[test]
    fn test_config_from_str_parses_successfully() {
        let config = Config::from_str(TEST_CONFIG).expect("should parse config");
        assert_eq!(config.websites.len(), 2);
        assert_eq!(config.databases.len(), 1);
        assert_eq!(config.monitor_settings.retry_attempts, 3);
        assert_eq!(config.monitor_settings.alert_repeat_interval, 300);
        assert_eq!(config.observability.log_level, "debug");
        assert!(config.email.is_enabled());
    }

    #[test]
    fn test_services_are_sorted_by_name() {
        let config = Config::from_str(TEST_CONFIG).expect("should parse config");
        let names: Vec<_> = config
            .services()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["SCADA-Gateway", "Telemetry-API-01"]);
        assert!(config.services().iter().all(|s| s.kind() == ServiceKind::Web));
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_str(
            r#"
[websites]
"API-1" = "http://localhost:9000"
"#,
        )
        .expect("should parse minimal config");

        let settings = &config.monitor_settings;
        assert_eq!(settings.retry_attempts, 2);
        assert_eq!(settings.retry_delay, 3);
        assert_eq!(settings.alert_threshold, 2);
        assert_eq!(settings.alert_repeat_interval, 120);
        assert_eq!(settings.recovery_threshold, 2);
        assert_eq!(settings.check_interval, 30);
        assert_eq!(settings.request_timeout, 10);
        assert_eq!(settings.error_cooldown, 30);
        assert_eq!(config.storage.status_file, PathBuf::from("status_store.json"));
        assert_eq!(config.storage.alerts_file, PathBuf::from("alerts.json"));
        assert!(!config.server.enabled);
        assert!(!config.email.is_enabled());
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_empty_config_parses_but_has_no_services() {
        let config = Config::from_str("").expect("empty config is structurally valid");
        assert!(!config.has_services());
        assert!(matches!(
            config.ensure_services(),
            Err(AppError::NoServicesConfigured)
        ));
    }

    #[test]
    fn test_databases_alone_count_as_services() {
        let config = Config::from_str(
            r#"
[databases]
"Historian" = { host = "db.internal", port = 5432 }
"#,
        )
        .expect("should parse");
        assert!(config.ensure_services().is_ok());
        assert!(config.services().is_empty());
    }

    #[test]
    fn test_rejects_non_http_url() {
        let result = Config::from_str(
            r#"
[websites]
"API-1" = "ftp://example.com"
"#,
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("API-1"));
        assert!(err.contains("http://"));
    }

    #[test]
    fn test_rejects_zero_thresholds() {
        for field in ["retry_attempts", "alert_threshold", "recovery_threshold"] {
            let toml = format!(
                "[websites]\n\"a\" = \"http://a\"\n[monitor_settings]\n{} = 0\n",
                field
            );
            let err = Config::from_str(&toml).unwrap_err().to_string();
            assert!(err.contains(field), "error should name {}: {}", field, err);
        }
    }

    #[test]
    fn test_rejects_zero_check_interval() {
        let err = Config::from_str("[monitor_settings]\ncheck_interval = 0\n")
            .unwrap_err()
            .to_string();
        assert!(err.contains("check_interval"));
    }

    #[test]
    fn test_email_requires_server_when_password_set() {
        let err = Config::from_str(
            r#"
[email]
sender_email = "a@example.com"
sender_password = "pw"
recipient_emails = ["b@example.com"]
"#,
        )
        .unwrap_err()
        .to_string();
        assert!(err.contains("smtp_server"));
    }

    #[test]
    fn test_empty_password_disables_email() {
        let config = Config::from_str("[email]\nsender_password = \"\"\n").expect("should parse");
        assert!(!config.email.is_enabled());
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let err = Config::from_str("[observability]\nlog_level = \"verbose\"\n")
            .unwrap_err()
            .to_string();
        assert!(err.contains("verbose"));
    }

    #[test]
    fn test_duration_helpers() {
        let settings = MonitorSettings::default();
        assert_eq!(settings.retry_delay_duration(), Duration::from_secs(3));
        assert_eq!(settings.alert_repeat_duration(), Duration::from_secs(120));
        assert_eq!(settings.check_interval_duration(), Duration::from_secs(30));
        assert_eq!(settings.request_timeout_duration(), Duration::from_secs(10));
        assert_eq!(settings.error_cooldown_duration(), Duration::from_secs(30));
    }

    #[test]
    fn test_from_file_reports_missing_file() {
        let err = Config::from_file("/nonexistent/vigil.toml").unwrap_err();
        assert!(matches!(err, AppError::ConfigFileRead { .. }));
    }
}
