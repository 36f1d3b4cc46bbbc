use std::io;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Custom error type for litepipe operations
#[derive(Debug, thiserror::Error)]
pub enum LitePipeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to spawn task: {0}")]
    TaskSpawnFailed(io::Error),

    #[error("{0}")]
    TaskExitStatus(std::process::ExitStatus),

    #[error("Task timed out after {0:?}")]
    TaskTimedOut(std::time::Duration),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("JSON parsing error: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

/// Helper type for Results that use LitePipeError
pub type Result<T> = std::result::Result<T, LitePipeError>;

/// Per-request failures of the webhook endpoint.
///
/// None of these ever reach the task runner; they are answered with a status
/// code and the server keeps listening.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    #[error("Invalid webhook signature")]
    Authentication,

    #[error("Failed to parse JSON payload: {0}")]
    PayloadDecode(#[from] serde_json::Error),
}

impl WebhookError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::BodyRead(_) => StatusCode::INTERNAL_SERVER_ERROR,
            WebhookError::Authentication => StatusCode::FORBIDDEN,
            WebhookError::PayloadDecode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}
