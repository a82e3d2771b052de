//! Error types for the topic logger.

use mqtt433_core::ConfigError;
use thiserror::Error;

/// Result type for logger operations.
pub type LoggerResult<T> = Result<T, LoggerError>;

#[derive(Debug, Error)]
pub enum LoggerError {
    /// The configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A log item lacks a required key.
    #[error("Item '{item}' is missing '{field}'")]
    MissingField { item: String, field: String },

    /// The first broker connection failed.
    #[error("Invalid connection, check server address: {0}")]
    Connect(String),
}
