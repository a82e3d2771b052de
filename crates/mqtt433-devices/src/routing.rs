//! Routing tables derived from the device registry.
//!
//! Built in a single pass over the registry. Each table is filled
//! independently: a device that lacks what one table needs is left out of
//! that table only, and the reason is kept in [`RoutingTables::skipped`].

use std::fmt;

use indexmap::map::Entry;
use indexmap::IndexMap;
use mqtt433_core::join_topic;
use tracing::{debug, warn};

use crate::discovery::{DiscoveryEntry, DiscoverySettings};
use crate::error::RegistryError;
use crate::frame::{RfCode, RfIdentity};
use crate::registry::{DeviceEntry, DeviceRegistry};

/// The routing table a device was left out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteTable {
    Command,
    Status,
    RfIdentity,
    Discovery,
}

impl fmt::Display for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => write!(f, "command"),
            Self::Status => write!(f, "status"),
            Self::RfIdentity => write!(f, "rf identity"),
            Self::Discovery => write!(f, "discovery"),
        }
    }
}

/// A device left out of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub table: RouteTable,
    pub error: RegistryError,
}

/// Lookup tables consulted by the translation engine.
#[derive(Debug, Clone, Default)]
pub struct RoutingTables {
    /// Command topic to device name.
    command_topics: IndexMap<String, String>,
    /// Device name to status topic.
    status_topics: IndexMap<String, String>,
    /// Device name to RF identity.
    rf_identities: IndexMap<String, RfIdentity>,
    /// Device name to discovery entry.
    discovery: IndexMap<String, DiscoveryEntry>,
    /// Names of the event-only devices.
    inputs: Vec<String>,
    platform_status_topic: String,
    skipped: Vec<SkippedEntry>,
}

impl RoutingTables {
    /// Build every table from the registry. The registry is not modified.
    pub fn build(registry: &DeviceRegistry<'_>, settings: &DiscoverySettings) -> Self {
        let mut tables = Self {
            platform_status_topic: settings.platform_status_topic(),
            ..Default::default()
        };

        for device in registry.entries() {
            let name = device.name();

            if matches!(device.is_output(), Ok(false)) {
                tables.inputs.push(name.to_string());
            }

            match command_topic(&device) {
                Ok(Some(topic)) => match tables.command_topics.entry(topic) {
                    Entry::Occupied(owner) => warn!(
                        "Command topic {} of '{}' already used by '{}'",
                        owner.key(),
                        name,
                        owner.get()
                    ),
                    Entry::Vacant(slot) => {
                        slot.insert(name.to_string());
                    }
                },
                Ok(None) => {}
                Err(e) => tables.skip(RouteTable::Command, e),
            }

            match status_topic(&device) {
                Ok(Some(topic)) => {
                    tables.status_topics.insert(name.to_string(), topic);
                }
                Ok(None) => {}
                Err(e) => tables.skip(RouteTable::Status, e),
            }

            match device.rf_identity() {
                Ok(identity) => {
                    tables.rf_identities.insert(name.to_string(), identity);
                }
                Err(e) => tables.skip(RouteTable::RfIdentity, e),
            }

            match DiscoveryEntry::build(&device, settings) {
                Ok(entry) => {
                    tables.discovery.insert(name.to_string(), entry);
                }
                Err(e) => tables.skip(RouteTable::Discovery, e),
            }
        }

        debug!(
            "Routing: {} command topics, {} status topics, {} RF identities, {} discovery documents, {} skipped",
            tables.command_topics.len(),
            tables.status_topics.len(),
            tables.rf_identities.len(),
            tables.discovery.len(),
            tables.skipped.len()
        );
        tables
    }

    fn skip(&mut self, table: RouteTable, error: RegistryError) {
        debug!("Skipping '{}' for {} table: {}", error.device(), table, error);
        self.skipped.push(SkippedEntry { table, error });
    }

    /// Command topics in registry order.
    pub fn command_topics(&self) -> impl Iterator<Item = &str> {
        self.command_topics.keys().map(String::as_str)
    }

    /// Device driven by `topic`.
    pub fn device_for_command(&self, topic: &str) -> Option<&str> {
        self.command_topics.get(topic).map(String::as_str)
    }

    pub fn status_topic(&self, device: &str) -> Option<&str> {
        self.status_topics.get(device).map(String::as_str)
    }

    pub fn rf_identity(&self, device: &str) -> Option<&RfIdentity> {
        self.rf_identities.get(device)
    }

    pub fn discovery(&self, device: &str) -> Option<&DiscoveryEntry> {
        self.discovery.get(device)
    }

    /// Discovery entries in registry order.
    pub fn discovery_entries(&self) -> impl Iterator<Item = (&str, &DiscoveryEntry)> {
        self.discovery.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Whether any event-only device is configured, which is when the RF
    /// receiver needs polling.
    pub fn has_inputs(&self) -> bool {
        !self.inputs.is_empty()
    }

    /// First device, in registry order, whose RF identity matches the
    /// received codes.
    pub fn find_device(&self, code: &RfCode) -> Option<&str> {
        self.rf_identities
            .iter()
            .find(|(_, identity)| identity.matches(code))
            .map(|(name, _)| name.as_str())
    }

    pub fn platform_status_topic(&self) -> &str {
        &self.platform_status_topic
    }

    /// Devices left out of a table, with the reason.
    pub fn skipped(&self) -> &[SkippedEntry] {
        &self.skipped
    }
}

fn command_topic(device: &DeviceEntry<'_>) -> Result<Option<String>, RegistryError> {
    if !device.is_output()? {
        return Ok(None);
    }
    match device.command_suffix()? {
        Some(cmd) => Ok(Some(join_topic(&device.main_topic()?, &cmd))),
        None => Ok(None),
    }
}

fn status_topic(device: &DeviceEntry<'_>) -> Result<Option<String>, RegistryError> {
    match device.status_suffix()? {
        Some(stat) => Ok(Some(join_topic(&device.main_topic()?, &stat))),
        None => Ok(None),
    }
}
