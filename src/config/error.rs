//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid socket address: {0}")]
    InvalidSocketAddr(String),

    #[error("max_handoffs must be between 1 and 16")]
    InvalidHandoffLimit,

    #[error("Session store path must not be empty")]
    EmptyStorePath,

    #[error("Invalid WhatsApp API base URL")]
    InvalidApiBaseUrl,

    #[error("Webhook signature verification is required in production")]
    AppSecretRequired,
}
