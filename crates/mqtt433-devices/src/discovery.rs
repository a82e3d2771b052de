//! Discovery documents for the home automation platform.
//!
//! One retained JSON document per device is published under
//! `<hatopic>/<hatype>/<name>[_<dev_cla>]/config`. The platform announces
//! itself on `<hatopic>/status`; an `online` payload there asks for every
//! document to be published again.

use mqtt433_core::config::keys as config_keys;
use mqtt433_core::{join_topic, ConfigNode, ConfigTree, NodeId, TypedValue};
use serde_json::{json, Map, Value};

use crate::error::RegistryError;
use crate::registry::DeviceEntry;

/// Default platform base topic.
pub const DEFAULT_BASE_TOPIC: &str = "homeassistant";
/// Platform availability sub-topic.
pub const STATUS_TOPIC: &str = "status";
/// Platform availability payload that triggers a republish.
pub const ONLINE_PAYLOAD: &str = "online";
/// Last level of every discovery topic.
pub const CONFIG_TOPIC: &str = "config";

/// Inputs shared by every discovery document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverySettings {
    pub base_topic: String,
    pub node_id: NodeId,
}

impl DiscoverySettings {
    pub fn new(base_topic: impl Into<String>, node_id: NodeId) -> Self {
        Self {
            base_topic: base_topic.into(),
            node_id,
        }
    }

    /// `hatopic` (default `homeassistant`) and the resolved node id.
    pub fn from_tree(tree: &ConfigTree) -> Self {
        let base_topic = tree
            .scalar(config_keys::HA_TOPIC)
            .filter(|v| !v.is_empty())
            .map(TypedValue::format)
            .unwrap_or_else(|| DEFAULT_BASE_TOPIC.to_string());
        Self::new(base_topic, NodeId::resolve(tree))
    }

    /// Topic the platform announces its availability on.
    pub fn platform_status_topic(&self) -> String {
        join_topic(&self.base_topic, STATUS_TOPIC)
    }

    /// Stable unique id of a device: `<node>_<name>`.
    pub fn unique_id(&self, name: &str) -> String {
        format!("{}_{}", self.node_id, name)
    }
}

/// Discovery topic and document of one device.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryEntry {
    pub topic: String,
    pub document: Value,
}

impl DiscoveryEntry {
    /// Build the entry for `device`.
    pub fn build(device: &DeviceEntry<'_>, settings: &DiscoverySettings) -> Result<Self, RegistryError> {
        let fields = device.discovery_fields()?;
        let name = device.discovery_name()?;
        let kind = device.discovery_kind()?;
        let main_topic = device.main_topic()?;
        let is_output = device.is_output()?;
        let unique_id = settings.unique_id(&name);

        let mut document = tree_to_json(fields);
        document.insert("~".to_string(), Value::String(main_topic));
        document.insert("uniq_id".to_string(), Value::String(unique_id.clone()));

        if is_output {
            if let Some(cmd) = device.command_suffix()? {
                document.insert("cmd_t".to_string(), Value::String(join_topic("~", &cmd)));
            }
        }
        if let Some(stat) = device.status_suffix()? {
            document.insert("stat_t".to_string(), Value::String(join_topic("~", &stat)));
        }
        if is_output {
            document.insert("pl_on".to_string(), json!("1"));
            document.insert("pl_off".to_string(), json!("0"));
        } else {
            document.insert("event_types".to_string(), json!(["1", "0"]));
        }

        let mut dev = device.device_info().map(tree_to_json).unwrap_or_default();
        dev.insert("ids".to_string(), json!([unique_id]));
        document.insert("dev".to_string(), Value::Object(dev));

        let object_id = match device.device_class()? {
            Some(class) => format!("{}_{}", name, class),
            None => name,
        };
        let topic = join_topic(
            &join_topic(&join_topic(&settings.base_topic, &kind), &object_id),
            CONFIG_TOPIC,
        );

        Ok(Self {
            topic,
            document: Value::Object(document),
        })
    }

    /// Serialized document.
    pub fn payload(&self) -> String {
        self.document.to_string()
    }
}

/// Convert a record to a JSON object, keeping the typed leaf values.
pub fn tree_to_json(tree: &ConfigTree) -> Map<String, Value> {
    tree.iter()
        .map(|(key, node)| {
            let value = match node {
                ConfigNode::Record(child) => Value::Object(tree_to_json(child)),
                ConfigNode::Scalar(scalar) => scalar.to_json(),
            };
            (key.to_string(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DeviceRegistry;

    fn leaves(entries: &[(&str, &str)]) -> ConfigTree {
        let mut tree = ConfigTree::new();
        for (k, v) in entries {
            tree.insert(*k, TypedValue::parse(v));
        }
        tree
    }

    fn lamp(dev_cla: Option<&str>) -> ConfigTree {
        let mut disco = leaves(&[("name", "lamp")]);
        if let Some(class) = dev_cla {
            disco.insert("dev_cla", class);
        }
        let mut device = ConfigTree::new();
        device.insert("RFout", true);
        device.insert("item433", leaves(&[("DeviceCode", "3")]));
        device.insert(
            "itemmqtt",
            leaves(&[("maintopic", "home/lamp"), ("cmd_t", "set"), ("stat_t", "state")]),
        );
        device.insert("hatype", "switch");
        device.insert("hadisco", disco);
        device.insert("hadevice", leaves(&[("name", "Lamp"), ("mf", "Acme")]));
        device
    }

    fn settings() -> DiscoverySettings {
        DiscoverySettings::new("homeassistant", NodeId::new("A1B2C3"))
    }

    #[test]
    fn test_output_document() {
        let mut devices = ConfigTree::new();
        devices.insert("lamp", lamp(Some("outlet")));
        let registry = DeviceRegistry::from_devices(&devices);
        let device = registry.get("lamp").unwrap();

        let entry = DiscoveryEntry::build(&device, &settings()).unwrap();
        assert_eq!(entry.topic, "homeassistant/switch/lamp_outlet/config");
        assert_eq!(
            entry.document,
            json!({
                "name": "lamp",
                "dev_cla": "outlet",
                "~": "home/lamp",
                "uniq_id": "A1B2C3_lamp",
                "cmd_t": "~/set",
                "stat_t": "~/state",
                "pl_on": "1",
                "pl_off": "0",
                "dev": {"name": "Lamp", "mf": "Acme", "ids": ["A1B2C3_lamp"]}
            })
        );
    }

    #[test]
    fn test_topic_without_device_class() {
        let mut devices = ConfigTree::new();
        devices.insert("lamp", lamp(None));
        let registry = DeviceRegistry::from_devices(&devices);
        let entry = DiscoveryEntry::build(&registry.get("lamp").unwrap(), &settings()).unwrap();
        assert_eq!(entry.topic, "homeassistant/switch/lamp/config");
    }

    #[test]
    fn test_event_document() {
        let mut device = ConfigTree::new();
        device.insert("RFout", false);
        device.insert("item433", leaves(&[("SysCode", "21"), ("DeviceCode", "4")]));
        device.insert(
            "itemmqtt",
            leaves(&[("maintopic", "home/bell"), ("cmd_t", "ignored"), ("stat_t", "event")]),
        );
        device.insert("hatype", "event");
        device.insert("hadisco", leaves(&[("name", "bell"), ("dev_cla", "doorbell")]));
        let mut devices = ConfigTree::new();
        devices.insert("bell", device);
        let registry = DeviceRegistry::from_devices(&devices);

        let entry = DiscoveryEntry::build(&registry.get("bell").unwrap(), &settings()).unwrap();
        assert_eq!(entry.topic, "homeassistant/event/bell_doorbell/config");
        assert_eq!(entry.document["event_types"], json!(["1", "0"]));
        assert_eq!(entry.document["stat_t"], json!("~/event"));
        assert!(entry.document.get("cmd_t").is_none());
        assert!(entry.document.get("pl_on").is_none());
        assert_eq!(entry.document["dev"], json!({"ids": ["A1B2C3_bell"]}));
    }

    #[test]
    fn test_payload_is_stable() {
        let mut devices = ConfigTree::new();
        devices.insert("lamp", lamp(Some("outlet")));
        let registry = DeviceRegistry::from_devices(&devices);
        let device = registry.get("lamp").unwrap();

        let first = DiscoveryEntry::build(&device, &settings()).unwrap().payload();
        let second = DiscoveryEntry::build(&device, &settings()).unwrap().payload();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_discovery_name() {
        let mut device = lamp(None);
        device.insert("hadisco", leaves(&[("dev_cla", "outlet")]));
        let mut devices = ConfigTree::new();
        devices.insert("lamp", device);
        let registry = DeviceRegistry::from_devices(&devices);

        let err = DiscoveryEntry::build(&registry.get("lamp").unwrap(), &settings()).unwrap_err();
        assert_eq!(err.field(), "hadisco/name");
    }

    #[test]
    fn test_settings_from_tree() {
        let mut tree = ConfigTree::new();
        tree.insert("nodeid", "ABCDEF");
        let settings = DiscoverySettings::from_tree(&tree);
        assert_eq!(settings.base_topic, "homeassistant");
        assert_eq!(settings.platform_status_topic(), "homeassistant/status");
        assert_eq!(settings.unique_id("x"), "ABCDEF_x");

        tree.insert("hatopic", "ha");
        assert_eq!(DiscoverySettings::from_tree(&tree).base_topic, "ha");
    }
}
