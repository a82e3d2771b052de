//! Typed views over the top-level configuration keys.

use std::fmt;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::{keys, mqtt};
use crate::error::{ConfigError, Result};
use crate::tree::ConfigTree;
use crate::value::TypedValue;

/// Broker connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl BrokerSettings {
    /// Read the broker settings. A missing or empty `broker` is an error.
    pub fn from_tree(tree: &ConfigTree) -> Result<Self> {
        let host = match tree.get(keys::BROKER) {
            None => return Err(ConfigError::MissingBroker),
            Some(node) => match node.as_scalar() {
                Some(TypedValue::Empty) | None => return Err(ConfigError::EmptyBroker),
                Some(value) => value.format(),
            },
        };

        let port = match tree.scalar(keys::PORT) {
            None | Some(TypedValue::Empty) => mqtt::DEFAULT_PORT,
            Some(value) => value
                .as_i64()
                .and_then(|p| u16::try_from(p).ok())
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: keys::PORT.to_string(),
                    value: value.format(),
                })?,
        };

        // Credentials only count when non-empty; a password without a user
        // name is ignored.
        let username = non_empty(tree, keys::USERNAME);
        let password = username
            .as_ref()
            .and_then(|_| non_empty(tree, keys::PASSWORD));

        Ok(Self {
            host,
            port,
            username,
            password,
        })
    }
}

fn non_empty(tree: &ConfigTree, key: &str) -> Option<String> {
    tree.scalar(key)
        .filter(|v| !v.is_empty())
        .map(TypedValue::format)
}

/// Stable identifier of this host, six upper-case hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(String);

impl NodeId {
    const FALLBACK: &'static str = "000000";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// `nodeid` from the configuration, else the host's hardware address.
    pub fn resolve(tree: &ConfigTree) -> Self {
        match non_empty(tree, keys::NODE_ID) {
            Some(id) => Self(id),
            None => Self::detect(),
        }
    }

    /// Derive the identifier from the first non-zero interface address.
    pub fn detect() -> Self {
        Self::from_interfaces(Path::new("/sys/class/net"))
            .unwrap_or_else(|| Self(Self::FALLBACK.to_string()))
    }

    fn from_interfaces(dir: &Path) -> Option<Self> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .ok()?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .collect();
        names.sort();

        names.iter().find_map(|iface| {
            let address = fs::read_to_string(iface.join("address")).ok()?;
            let id = Self::from_hardware_address(&address)?;
            debug!("Node id {} from {}", id, iface.display());
            Some(id)
        })
    }

    /// Last six hex digits of a `aa:bb:cc:dd:ee:ff` address.
    pub fn from_hardware_address(address: &str) -> Option<Self> {
        let hex: String = address
            .trim()
            .chars()
            .filter(|c| c.is_ascii_hexdigit())
            .collect::<String>()
            .to_ascii_uppercase();

        if hex.len() < 6 || hex.chars().all(|c| c == '0') {
            return None;
        }
        Some(Self(hex[hex.len() - 6..].to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
