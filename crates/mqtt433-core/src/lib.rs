//! Configuration core shared by the mqtt433 daemons.
//!
//! ## Architecture
//!
//! - **TypedValue**: classified leaf value (integer, float, boolean, string, empty)
//! - **ConfigTree**: insertion-ordered, schema-less tree of records and values
//! - **ConfigStore**: the tree bound to its XML document, with comment preservation
//! - **BrokerSettings** / **NodeId**: typed views over well-known top-level keys
//! - **LinkMonitor**: broker link state with repeated-code log suppression
//! - **session**: `rumqttc` options, event pump and orderly disconnect
//!
//! There is exactly one store per process. It is created at startup and
//! handed by reference to the components that read it.

pub mod config;
pub mod error;
pub mod link;
pub mod session;
pub mod settings;
pub mod store;
pub mod tree;
pub mod value;

pub use config::join_topic;
pub use error::{ConfigError, Result};
pub use link::{LinkMonitor, LinkState};
pub use session::MqttEvent;
pub use settings::{BrokerSettings, NodeId};
pub use store::{ConfigStore, DocumentSchema};
pub use tree::{ConfigNode, ConfigTree};
pub use value::TypedValue;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
