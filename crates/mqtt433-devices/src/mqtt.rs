//! MQTT bus over `rumqttc`.
//!
//! The event loop itself is driven by [`mqtt433_core::session::pump_events`];
//! this module only adapts the client to [`BusTransport`].

use async_trait::async_trait;
use mqtt433_core::config::mqtt;
use mqtt433_core::session::{self, MqttEvent};
use mqtt433_core::{BrokerSettings, NodeId};
use rumqttc::{AsyncClient, EventLoop, QoS};

use crate::bridge::BridgeInput;
use crate::error::TransportError;
use crate::transport::BusTransport;

/// Prefix of the client id, followed by the node id.
pub const CLIENT_ID_PREFIX: &str = "mqtt433MHz";

const QOS: QoS = QoS::AtMostOnce;

/// Bus client handle. The matching [`EventLoop`] is driven by
/// [`session::pump_events`].
#[derive(Clone)]
pub struct MqttBus {
    client: AsyncClient,
}

impl MqttBus {
    /// Create the client and its event loop. Nothing is sent until the event
    /// loop is polled.
    pub fn new(settings: &BrokerSettings, node_id: &NodeId) -> (Self, EventLoop) {
        let options = session::options(CLIENT_ID_PREFIX, settings, node_id);
        let (client, eventloop) = AsyncClient::new(options, mqtt::REQUEST_CAPACITY);
        (Self { client }, eventloop)
    }
}

#[async_trait]
impl BusTransport for MqttBus {
    async fn subscribe(&self, topic: &str) -> Result<(), TransportError> {
        self.client
            .subscribe(topic, QOS)
            .await
            .map_err(|e| TransportError::Bus(e.to_string()))
    }

    async fn publish(&self, topic: &str, payload: &str, retain: bool) -> Result<(), TransportError> {
        self.client
            .publish(topic, QOS, retain, payload.as_bytes().to_vec())
            .await
            .map_err(|e| TransportError::Bus(e.to_string()))
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.client
            .try_disconnect()
            .map_err(|e| TransportError::Bus(e.to_string()))
    }
}

impl From<MqttEvent> for BridgeInput {
    fn from(event: MqttEvent) -> Self {
        match event {
            MqttEvent::ConnAck(code) => Self::ConnAck(code),
            MqttEvent::Disconnected(code) => Self::Disconnected(code),
            MqttEvent::ConnectFailed(reason) => Self::ConnectFailed(reason),
            MqttEvent::Message { topic, payload } => Self::Message { topic, payload },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_map_to_inputs() {
        assert_eq!(BridgeInput::from(MqttEvent::ConnAck(5)), BridgeInput::ConnAck(5));
        assert_eq!(
            BridgeInput::from(MqttEvent::Message {
                topic: "home/lamp/set".to_string(),
                payload: "1".to_string(),
            }),
            BridgeInput::Message {
                topic: "home/lamp/set".to_string(),
                payload: "1".to_string(),
            }
        );
        assert_eq!(
            BridgeInput::from(MqttEvent::Disconnected(session::CONNECTION_LOST)),
            BridgeInput::Disconnected(7)
        );
    }
}
