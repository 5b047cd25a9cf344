//! Error types for the release API

use thiserror::Error;

/// Main error type for the release API
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Deploy webhook is disabled for this deployment: {0}")]
    AutoDeployDisabled(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upgrade failed: {0}")]
    UpgradeFailed(String),

    #[error("Malformed release config: {0}")]
    MalformedConfig(String),

    #[error("Unrecognized chart kind: {0}")]
    UnrecognizedKind(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Deployment engine error: {0}")]
    EngineError(String),

    #[error("Upstream returned {status}: {body}")]
    UpstreamError { status: u16, body: String },

    #[error("Integration error: {0}")]
    IntegrationError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<semver::Error> for ReleaseError {
    fn from(err: semver::Error) -> Self {
        ReleaseError::IntegrationError(format!("invalid tool version: {}", err))
    }
}
