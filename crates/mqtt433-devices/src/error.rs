//! Error types for the RF bridge.

use mqtt433_core::ConfigError;
use thiserror::Error;

/// A device entry that cannot be used for one routing table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A required attribute is absent.
    #[error("Device '{device}' is missing '{field}'")]
    MissingField { device: String, field: String },

    /// An attribute is present but has the wrong type.
    #[error("Device '{device}' has invalid '{field}': {value}")]
    InvalidField {
        device: String,
        field: String,
        value: String,
    },
}

impl RegistryError {
    pub fn device(&self) -> &str {
        match self {
            Self::MissingField { device, .. } | Self::InvalidField { device, .. } => device,
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Self::MissingField { field, .. } | Self::InvalidField { field, .. } => field,
        }
    }
}

/// RF frame decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Frames carry 2, 3 or 4 values.
    #[error("Unsupported frame length {0}")]
    UnsupportedArity(usize),
}

/// Errors reported by the bus or RF transports.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The bus client rejected a request.
    #[error("Bus error: {0}")]
    Bus(String),

    /// The RF device failed.
    #[error("RF device error: {0}")]
    Rf(#[from] std::io::Error),

    /// The transport has been shut down.
    #[error("Transport closed")]
    Closed,
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Fatal bridge errors.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The first broker connection failed.
    #[error("Invalid connection, check server address: {0}")]
    Connect(String),

    /// A transport failed irrecoverably.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
