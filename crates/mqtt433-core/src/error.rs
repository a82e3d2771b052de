//! Error types for the configuration store.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while loading, saving or interpreting a configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not well-formed XML.
    #[error("Error parsing xml file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// Two siblings share the same tag.
    #[error("Duplicate key '{key}' under <{parent}>")]
    DuplicateKey { parent: String, key: String },

    /// No document exists at the configured path.
    #[error("No XML file found at {}", .0.display())]
    NotFound(PathBuf),

    /// The document cannot be written.
    #[error("XML file {} cannot be written, please run as super user", .0.display())]
    Permission(PathBuf),

    /// The broker address is absent.
    #[error("No broker entered")]
    MissingBroker,

    /// The broker address is present but empty.
    #[error("Empty broker entered")]
    EmptyBroker,

    /// A value has the wrong type for its key.
    #[error("Invalid value for '{key}': {value}")]
    InvalidValue { key: String, value: String },

    /// Other I/O failure.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            return Self::Permission(path);
        }
        Self::Io { path, source }
    }
}
