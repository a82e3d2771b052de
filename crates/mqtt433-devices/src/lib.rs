//! RF bridge between an MQTT bus and a 433 MHz transceiver.
//!
//! ## Features
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `mqtt` | ✅ | MQTT bus over `rumqttc` and the bridge service |
//!
//! ## Architecture
//!
//! - **DeviceRegistry**: typed view over the `devices` record of the configuration
//! - **RoutingTables**: command, status, RF identity and discovery lookups built from the registry
//! - **TranslationEngine**: turns bus messages and RF frames into [`engine::Action`]s
//! - **Bridge**: single consumer that feeds the engine and executes its actions
//!
//! The engine never touches a transport. Transports are reached through
//! [`BusTransport`] and [`RfTransport`].

pub mod bridge;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod frame;
pub mod registry;
pub mod routing;
pub mod schema;
pub mod transport;

#[cfg(feature = "mqtt")]
pub mod mqtt;

pub use bridge::{spawn_rf_poller, Bridge, BridgeInput, SharedRf};
pub use discovery::{DiscoveryEntry, DiscoverySettings};
pub use engine::{Action, Publication, TranslationEngine};
pub use error::{BridgeError, BridgeResult, FrameError, RegistryError, TransportError};
pub use frame::{RfCode, RfFrame, RfIdentity};
pub use registry::{DeviceEntry, DeviceRegistry};
pub use routing::{RouteTable, RoutingTables, SkippedEntry};
pub use schema::{BRIDGE_SCHEMA, CONFIG_FILE};
pub use transport::{BusTransport, LineTransport, RfTransport};

#[cfg(feature = "mqtt")]
pub use bridge::run_bridge;
#[cfg(feature = "mqtt")]
pub use mqtt::MqttBus;
