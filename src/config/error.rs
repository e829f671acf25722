//! Configuration error types

use thiserror::Error;

/// Errors that occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Errors that occur while validating configuration values
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Backend base URL must start with http:// or https://")]
    InvalidBaseUrl,

    #[error("Request timeout must be between 1 and 300 seconds")]
    InvalidRequestTimeout,

    #[error("Stream timeout must be between 1 and 600 seconds")]
    InvalidStreamTimeout,

    #[error("Log level directive cannot be empty")]
    InvalidLogLevel,
}
