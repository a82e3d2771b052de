//! Device Registry - typed view over the `devices` record of the configuration
//!
//! Each child record of `devices` describes one device, keyed by its name:
//!
//! ```text
//! devices
//! └─ lamp
//!    ├─ RFout        true
//!    ├─ item433      SysCode?, GroupCode?, DeviceCode
//!    ├─ itemmqtt     maintopic, cmd_t | command_topic, stat_t | status_topic
//!    ├─ hatype       switch | event
//!    ├─ hadisco      name, dev_cla?, ...
//!    └─ hadevice     name, mf, mdl, ...
//! ```
//!
//! Accessors return a [`RegistryError`] naming the device and field when an
//! attribute is missing, so a caller can skip that device and still explain
//! why.

use mqtt433_core::config::keys as config_keys;
use mqtt433_core::{ConfigTree, TypedValue};

use crate::error::RegistryError;
use crate::frame::RfIdentity;
use crate::schema::keys;

/// Read-only view over the configured devices.
#[derive(Debug, Clone, Copy)]
pub struct DeviceRegistry<'a> {
    devices: Option<&'a ConfigTree>,
}

impl<'a> DeviceRegistry<'a> {
    /// View the `devices` record of `tree`. A missing record is an empty registry.
    pub fn new(tree: &'a ConfigTree) -> Self {
        Self {
            devices: tree.record(config_keys::DEVICES),
        }
    }

    /// View a record that directly holds the device entries.
    pub fn from_devices(devices: &'a ConfigTree) -> Self {
        Self {
            devices: Some(devices),
        }
    }

    pub fn len(&self) -> usize {
        self.devices.map(|d| d.records().count()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Device entries in document order.
    pub fn entries(&self) -> impl Iterator<Item = DeviceEntry<'a>> + 'a {
        self.devices
            .into_iter()
            .flat_map(|devices| devices.records())
            .map(|(name, tree)| DeviceEntry { name, tree })
    }

    pub fn get(&self, name: &str) -> Option<DeviceEntry<'a>> {
        self.entries().find(|entry| entry.name == name)
    }
}

/// One configured device.
#[derive(Debug, Clone, Copy)]
pub struct DeviceEntry<'a> {
    name: &'a str,
    tree: &'a ConfigTree,
}

impl<'a> DeviceEntry<'a> {
    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn tree(&self) -> &'a ConfigTree {
        self.tree
    }

    /// `RFout`: true for devices driven by the bridge, false for event sources.
    pub fn is_output(&self) -> Result<bool, RegistryError> {
        self.tree
            .scalar(keys::RF_OUT)
            .map(TypedValue::as_bool)
            .ok_or_else(|| self.missing(keys::RF_OUT))
    }

    /// System, group and device codes from `item433`.
    pub fn rf_identity(&self) -> Result<RfIdentity, RegistryError> {
        let item = self.record(keys::ITEM_433)?;
        let field = |key: &str| format!("{}/{}", keys::ITEM_433, key);

        let code = |key: &str| -> Result<Option<i64>, RegistryError> {
            match item.scalar(key) {
                None | Some(TypedValue::Empty) => Ok(None),
                Some(value) => value.as_i64().map(Some).ok_or_else(|| {
                    RegistryError::InvalidField {
                        device: self.name.to_string(),
                        field: field(key),
                        value: value.format(),
                    }
                }),
            }
        };

        let device_code = code(keys::DEVICE_CODE)?.ok_or_else(|| RegistryError::MissingField {
            device: self.name.to_string(),
            field: field(keys::DEVICE_CODE),
        })?;

        Ok(RfIdentity::new(
            code(keys::SYS_CODE)?,
            code(keys::GROUP_CODE)?,
            device_code,
        ))
    }

    /// `itemmqtt/maintopic`.
    pub fn main_topic(&self) -> Result<String, RegistryError> {
        let item = self.record(keys::ITEM_MQTT)?;
        item.scalar(keys::MAIN_TOPIC)
            .filter(|v| !v.is_empty())
            .map(TypedValue::format)
            .ok_or_else(|| self.missing(&format!("{}/{}", keys::ITEM_MQTT, keys::MAIN_TOPIC)))
    }

    /// Command topic suffix, `cmd_t` preferred over `command_topic`.
    pub fn command_suffix(&self) -> Result<Option<String>, RegistryError> {
        self.topic_suffix(&keys::COMMAND_SUFFIX)
    }

    /// Status topic suffix, `stat_t` preferred over `status_topic`.
    pub fn status_suffix(&self) -> Result<Option<String>, RegistryError> {
        self.topic_suffix(&keys::STATUS_SUFFIX)
    }

    fn topic_suffix(&self, names: &[&str]) -> Result<Option<String>, RegistryError> {
        let item = self.record(keys::ITEM_MQTT)?;
        Ok(names
            .iter()
            .find_map(|name| item.scalar(name).filter(|v| !v.is_empty()))
            .map(TypedValue::format))
    }

    /// `hatype`: the discovery component kind.
    pub fn discovery_kind(&self) -> Result<String, RegistryError> {
        self.tree
            .scalar(keys::HA_TYPE)
            .filter(|v| !v.is_empty())
            .map(TypedValue::format)
            .ok_or_else(|| self.missing(keys::HA_TYPE))
    }

    /// `hadisco`: discovery fields.
    pub fn discovery_fields(&self) -> Result<&'a ConfigTree, RegistryError> {
        self.record(keys::HA_DISCO)
    }

    /// `hadisco/name`.
    pub fn discovery_name(&self) -> Result<String, RegistryError> {
        self.discovery_fields()?
            .scalar(keys::NAME)
            .filter(|v| !v.is_empty())
            .map(TypedValue::format)
            .ok_or_else(|| self.missing(&format!("{}/{}", keys::HA_DISCO, keys::NAME)))
    }

    /// `hadisco/dev_cla`, if configured.
    pub fn device_class(&self) -> Result<Option<String>, RegistryError> {
        Ok(self
            .discovery_fields()?
            .scalar(keys::DEVICE_CLASS)
            .filter(|v| !v.is_empty())
            .map(TypedValue::format))
    }

    /// `hadevice`: device metadata, if configured.
    pub fn device_info(&self) -> Option<&'a ConfigTree> {
        self.tree.record(keys::HA_DEVICE)
    }

    fn record(&self, key: &str) -> Result<&'a ConfigTree, RegistryError> {
        self.tree.record(key).ok_or_else(|| self.missing(key))
    }

    fn missing(&self, field: &str) -> RegistryError {
        RegistryError::MissingField {
            device: self.name.to_string(),
            field: field.to_string(),
        }
    }
}
