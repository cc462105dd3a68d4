//! Host metadata attached to every alert record

use serde::{Deserialize, Serialize};

/// Describes the machine the monitor runs on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub hostname: String,
    pub system: String,
    pub release: String,
    pub machine: String,
    /// Absent from records written by older deployments
    #[serde(default)]
    pub runtime_version: String,
}

impl SystemInfo {
    /// Gather host details, falling back to "unknown" where the OS won't say
    pub fn collect() -> Self {
        let unknown = || "unknown".to_string();
        Self {
            hostname: sysinfo::System::host_name().unwrap_or_else(unknown),
            system: sysinfo::System::name().unwrap_or_else(unknown),
            release: sysinfo::System::kernel_version()
                .or_else(sysinfo::System::os_version)
                .unwrap_or_else(unknown),
            machine: std::env::consts::ARCH.to_string(),
            runtime_version: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }
}
