//! Error types for Vigil
//!
//! All errors implement `IntoResponse` for the Axum status API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("No services configured to monitor (websites and databases are both empty)")]
    NoServicesConfigured,

    #[error("Failed to write status store {path}: {source}")]
    StatusStoreWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read status store {path}: {source}")]
    StatusStoreRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write alert log {path}: {source}")]
    AlertLogWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read alert log {path}: {source}")]
    AlertLogRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Alert log {path} is not a valid JSON array, refusing to overwrite it: {source}")]
    AlertLogCorrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to bind status API on {addr}: {source}")]
    ServerBind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::AlertLogCorrupt { .. } => StatusCode::CONFLICT,
            Self::StatusStoreRead { .. } | Self::AlertLogRead { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(serde_json::json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;
