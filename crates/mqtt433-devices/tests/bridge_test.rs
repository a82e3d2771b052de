//! Bridge Runner Tests
//!
//! Drives the bridge consumer with a recording bus and an in-memory
//! transceiver:
//! - Connect, command and event flows end to end
//! - RF poller forwarding frames
//! - Fatal first connection failure
//! - Shutdown through the running flag

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mqtt433_core::{ConfigTree, NodeId, TypedValue};
use mqtt433_devices::{
    spawn_rf_poller, Bridge, BridgeError, BridgeInput, BusTransport, DeviceRegistry,
    DiscoverySettings, RfFrame, RfTransport, RoutingTables, TranslationEngine, TransportError,
};
use parking_lot::Mutex;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
enum BusCall {
    Subscribe(String),
    Publish(String, String, bool),
    Disconnect,
}

#[derive(Clone, Default)]
struct RecordingBus {
    calls: Arc<Mutex<Vec<BusCall>>>,
}

impl RecordingBus {
    fn calls(&self) -> Vec<BusCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl BusTransport for RecordingBus {
    async fn subscribe(&self, topic: &str) -> Result<(), TransportError> {
        self.calls.lock().push(BusCall::Subscribe(topic.to_string()));
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: &str, retain: bool) -> Result<(), TransportError> {
        self.calls
            .lock()
            .push(BusCall::Publish(topic.to_string(), payload.to_string(), retain));
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.calls.lock().push(BusCall::Disconnect);
        Ok(())
    }
}

#[derive(Default)]
struct MemoryRf {
    incoming: VecDeque<RfFrame>,
    sent: Vec<RfFrame>,
}

impl RfTransport for MemoryRf {
    fn read_frame(&mut self, _timeout: Duration) -> Result<Option<RfFrame>, TransportError> {
        Ok(self.incoming.pop_front())
    }

    fn write_frame(&mut self, frame: &RfFrame) -> Result<(), TransportError> {
        self.sent.push(frame.clone());
        Ok(())
    }
}

fn leaves(entries: &[(&str, &str)]) -> ConfigTree {
    let mut tree = ConfigTree::new();
    for (k, v) in entries {
        tree.insert(*k, TypedValue::parse(v));
    }
    tree
}

fn engine() -> TranslationEngine {
    let mut lamp = ConfigTree::new();
    lamp.insert("RFout", true);
    lamp.insert("item433", leaves(&[("SysCode", "7"), ("GroupCode", "2"), ("DeviceCode", "3")]));
    lamp.insert(
        "itemmqtt",
        leaves(&[("maintopic", "home/lamp"), ("cmd_t", "set"), ("stat_t", "state")]),
    );

    let mut bell = ConfigTree::new();
    bell.insert("RFout", false);
    bell.insert("item433", leaves(&[("DeviceCode", "4")]));
    bell.insert("itemmqtt", leaves(&[("maintopic", "home/bell"), ("stat_t", "event")]));

    let mut devices = ConfigTree::new();
    devices.insert("lamp", lamp);
    devices.insert("bell", bell);

    let settings = DiscoverySettings::new("homeassistant", NodeId::new("000001"));
    TranslationEngine::new(RoutingTables::build(
        &DeviceRegistry::from_devices(&devices),
        &settings,
    ))
}

#[tokio::test]
async fn test_command_flow() {
    let bus = RecordingBus::default();
    let rf = Arc::new(Mutex::new(MemoryRf::default()));
    let running = Arc::new(AtomicBool::new(true));
    let mut bridge = Bridge::new(engine(), bus.clone(), Some(rf.clone()), running.clone());

    let (tx, mut rx) = mpsc::unbounded_channel();
    tx.send(BridgeInput::ConnAck(0)).unwrap();
    tx.send(BridgeInput::Message {
        topic: "home/lamp/set".to_string(),
        payload: "1".to_string(),
    })
    .unwrap();
    tx.send(BridgeInput::Frame(RfFrame::new(vec![4, 0]))).unwrap();
    drop(tx);

    bridge.run(&mut rx).await.unwrap();

    assert_eq!(rf.lock().sent, vec![RfFrame::new(vec![7, 2, 3, 1])]);
    assert_eq!(
        bus.calls(),
        vec![
            BusCall::Subscribe("home/lamp/set".to_string()),
            BusCall::Subscribe("homeassistant/status".to_string()),
            BusCall::Publish("home/lamp/state".to_string(), "1".to_string(), true),
            BusCall::Publish(
                "home/bell/event".to_string(),
                r#"{"event_type":"0"}"#.to_string(),
                false
            ),
            BusCall::Disconnect,
        ]
    );
    assert!(!running.load(Ordering::Relaxed));
}

#[tokio::test]
async fn test_events_before_connect_are_flushed() {
    let bus = RecordingBus::default();
    let running = Arc::new(AtomicBool::new(true));
    let mut bridge: Bridge<_, MemoryRf> = Bridge::new(engine(), bus.clone(), None, running);

    bridge
        .handle(BridgeInput::Frame(RfFrame::new(vec![4, 1])))
        .await
        .unwrap();
    assert!(bus.calls().is_empty());
    assert_eq!(bridge.engine().pending(), 1);

    bridge.handle(BridgeInput::ConnAck(0)).await.unwrap();
    assert_eq!(
        bus.calls().last(),
        Some(&BusCall::Publish(
            "home/bell/event".to_string(),
            r#"{"event_type":"1"}"#.to_string(),
            false
        ))
    );
}

#[tokio::test]
async fn test_first_connection_failure_is_fatal() {
    let bus = RecordingBus::default();
    let running = Arc::new(AtomicBool::new(true));
    let mut bridge: Bridge<_, MemoryRf> = Bridge::new(engine(), bus.clone(), None, running);

    let (tx, mut rx) = mpsc::unbounded_channel();
    tx.send(BridgeInput::ConnectFailed("connection refused".to_string()))
        .unwrap();

    let err = bridge.run(&mut rx).await.unwrap_err();
    assert!(matches!(err, BridgeError::Connect(_)));
    assert_eq!(bus.calls(), vec![BusCall::Disconnect]);
}

#[tokio::test]
async fn test_running_flag_stops_consumer() {
    let bus = RecordingBus::default();
    let running = Arc::new(AtomicBool::new(true));
    let mut bridge: Bridge<_, MemoryRf> = Bridge::new(engine(), bus.clone(), None, running.clone());

    // Keep a sender alive so only the flag can stop the loop.
    let (_tx, mut rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(async move { bridge.run(&mut rx).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    running.store(false, Ordering::Relaxed);

    let result = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
    assert_eq!(bus.calls(), vec![BusCall::Disconnect]);
}

#[tokio::test]
async fn test_rf_poller_forwards_frames() {
    let rf = Arc::new(Mutex::new(MemoryRf::default()));
    rf.lock().incoming.push_back(RfFrame::new(vec![4, 1]));
    rf.lock().incoming.push_back(RfFrame::new(vec![1, 2, 3, 4, 5]));

    let running = Arc::new(AtomicBool::new(true));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let poller = spawn_rf_poller(rf, tx, running.clone());

    let first = rx.recv().await.unwrap();
    let second = rx.recv().await.unwrap();
    assert_eq!(first, BridgeInput::Frame(RfFrame::new(vec![4, 1])));
    assert_eq!(second, BridgeInput::Frame(RfFrame::new(vec![1, 2, 3, 4, 5])));

    running.store(false, Ordering::Relaxed);
    poller.await.unwrap();
}
