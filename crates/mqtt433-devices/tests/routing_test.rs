//! Routing from a complete configuration document
//!
//! Loads a bridge configuration from disk and checks:
//! - Command, status and RF identity tables
//! - Discovery documents and topics
//! - Per-table skipping of incomplete devices
//! - Engine round trips over the loaded tables

use std::fs;

use mqtt433_core::{ConfigStore, NodeId};
use mqtt433_devices::{
    Action, DeviceRegistry, DiscoverySettings, Publication, RfFrame, RfIdentity, RouteTable,
    RoutingTables, TranslationEngine, BRIDGE_SCHEMA,
};
use serde_json::json;
use tempfile::TempDir;

const DOCUMENT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<mqtt433MHz>
	<!--bridge configuration-->
	<broker>localhost</broker>
	<port>1883</port>
	<hatopic>homeassistant</hatopic>
	<devices>
		<lamp>
			<RFout>true</RFout>
			<item433>
				<SysCode>21</SysCode>
				<GroupCode>0</GroupCode>
				<DeviceCode>3</DeviceCode>
			</item433>
			<hadevice>
				<name>Living room lamp</name>
				<mf>Acme</mf>
				<mdl>RC-3</mdl>
			</hadevice>
			<itemmqtt>
				<maintopic>home/lamp</maintopic>
				<cmd_t>set</cmd_t>
				<stat_t>state</stat_t>
			</itemmqtt>
			<hatype>switch</hatype>
			<hadisco>
				<name>lamp</name>
				<dev_cla>outlet</dev_cla>
			</hadisco>
		</lamp>
		<doorbell>
			<RFout>false</RFout>
			<item433>
				<SysCode>21</SysCode>
				<DeviceCode>4</DeviceCode>
			</item433>
			<itemmqtt>
				<maintopic>home/doorbell</maintopic>
				<status_topic>event</status_topic>
			</itemmqtt>
			<hatype>event</hatype>
			<hadisco>
				<name>doorbell</name>
				<dev_cla>doorbell</dev_cla>
			</hadisco>
		</doorbell>
		<broken>
			<RFout>true</RFout>
			<item433>
				<DeviceCode>9</DeviceCode>
			</item433>
		</broken>
	</devices>
</mqtt433MHz>
"#;

fn load() -> (TempDir, ConfigStore) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mqtt433MHz.xml");
    fs::write(&path, DOCUMENT).unwrap();
    let store = ConfigStore::open(&path, BRIDGE_SCHEMA).unwrap();
    (dir, store)
}

fn tables(store: &ConfigStore) -> RoutingTables {
    let settings = DiscoverySettings::new("homeassistant", NodeId::new("00AB12"));
    RoutingTables::build(&DeviceRegistry::new(store.tree()), &settings)
}

#[test]
fn test_tables_from_document() {
    let (_dir, store) = load();
    let tables = tables(&store);

    assert_eq!(tables.command_topics().collect::<Vec<_>>(), vec!["home/lamp/set"]);
    assert_eq!(tables.status_topic("lamp"), Some("home/lamp/state"));
    assert_eq!(tables.status_topic("doorbell"), Some("home/doorbell/event"));
    assert_eq!(
        tables.rf_identity("lamp"),
        Some(&RfIdentity::new(Some(21), Some(0), 3))
    );
    assert_eq!(
        tables.rf_identity("broken"),
        Some(&RfIdentity::new(None, None, 9))
    );
    assert_eq!(tables.inputs(), &["doorbell".to_string()]);
    assert_eq!(tables.platform_status_topic(), "homeassistant/status");
}

#[test]
fn test_incomplete_device_only_leaves_affected_tables() {
    let (_dir, store) = load();
    let tables = tables(&store);

    let broken: Vec<_> = tables
        .skipped()
        .iter()
        .filter(|s| s.error.device() == "broken")
        .map(|s| s.table)
        .collect();
    assert_eq!(
        broken,
        vec![RouteTable::Command, RouteTable::Status, RouteTable::Discovery]
    );
    assert!(tables.rf_identity("broken").is_some());
}

#[test]
fn test_discovery_documents() {
    let (_dir, store) = load();
    let tables = tables(&store);

    let lamp = tables.discovery("lamp").unwrap();
    assert_eq!(lamp.topic, "homeassistant/switch/lamp_outlet/config");
    assert_eq!(
        lamp.document,
        json!({
            "name": "lamp",
            "dev_cla": "outlet",
            "~": "home/lamp",
            "uniq_id": "00AB12_lamp",
            "cmd_t": "~/set",
            "stat_t": "~/state",
            "pl_on": "1",
            "pl_off": "0",
            "dev": {
                "name": "Living room lamp",
                "mf": "Acme",
                "mdl": "RC-3",
                "ids": ["00AB12_lamp"]
            }
        })
    );

    let bell = tables.discovery("doorbell").unwrap();
    assert_eq!(bell.topic, "homeassistant/event/doorbell_doorbell/config");
    assert_eq!(bell.document["event_types"], json!(["1", "0"]));
    assert_eq!(bell.document["stat_t"], json!("~/event"));
}

#[test]
fn test_engine_over_loaded_tables() {
    let (_dir, store) = load();
    let mut engine = TranslationEngine::new(tables(&store));

    let actions = engine.on_connect(0);
    assert_eq!(actions[0], Action::Subscribe("home/lamp/set".to_string()));
    assert_eq!(
        actions[1],
        Action::Subscribe("homeassistant/status".to_string())
    );
    assert_eq!(actions.len(), 4);

    // Group code 0 is left out of the frame.
    assert_eq!(
        engine.on_message("home/lamp/set", "0"),
        vec![
            Action::SendFrame(RfFrame::new(vec![21, 3, 0])),
            Action::Publish(Publication::new("home/lamp/state", "0", true)),
        ]
    );

    assert_eq!(
        engine.on_frame(&RfFrame::new(vec![21, 4, 1])),
        vec![Action::Publish(Publication::new(
            "home/doorbell/event",
            r#"{"event_type":"1"}"#,
            false
        ))]
    );

    // Frames from the lamp's own remote are reported on its status topic.
    assert_eq!(
        engine.on_frame(&RfFrame::new(vec![21, 0, 3, 1])),
        vec![Action::Publish(Publication::new(
            "home/lamp/state",
            r#"{"event_type":"1"}"#,
            false
        ))]
    );
    assert!(engine.on_frame(&RfFrame::new(vec![21, 5, 1])).is_empty());

    let republish = engine.on_message("homeassistant/status", "online");
    assert_eq!(republish.len(), 2);
    assert!(republish
        .iter()
        .all(|a| matches!(a, Action::Publish(p) if p.retain)));
}
