//! Translation between bus messages and RF frames.
//!
//! The engine never talks to a transport. Each event handler returns the
//! [`Action`]s the caller has to carry out, in order.

use std::collections::VecDeque;

use mqtt433_core::{LinkMonitor, LinkState};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::discovery::ONLINE_PAYLOAD;
use crate::frame::RfFrame;
use crate::routing::RoutingTables;

/// Publications kept while the broker link is down.
pub const PENDING_CAPACITY: usize = 64;

/// A message to publish on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

impl Publication {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>, retain: bool) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            retain,
        }
    }
}

/// Work produced by the engine for the transports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Subscribe(String),
    Publish(Publication),
    SendFrame(RfFrame),
}

/// Routes bus messages to RF frames and RF frames to bus messages.
#[derive(Debug)]
pub struct TranslationEngine {
    routes: RoutingTables,
    link: LinkMonitor,
    pending: VecDeque<Publication>,
}

impl TranslationEngine {
    pub fn new(routes: RoutingTables) -> Self {
        Self {
            routes,
            link: LinkMonitor::new(),
            pending: VecDeque::new(),
        }
    }

    pub fn routes(&self) -> &RoutingTables {
        &self.routes
    }

    pub fn link_state(&self) -> LinkState {
        self.link.state()
    }

    /// Publications waiting for the link to come up.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Connect acknowledgement from the broker.
    ///
    /// On success: subscribe to every command topic and the platform status
    /// topic, publish all discovery documents, then flush what was queued
    /// while disconnected.
    pub fn on_connect(&mut self, code: u8) -> Vec<Action> {
        if !self.link.on_connect(code) {
            return Vec::new();
        }

        let mut actions: Vec<Action> = self
            .routes
            .command_topics()
            .map(|topic| {
                debug!("Subscribing {}", topic);
                Action::Subscribe(topic.to_string())
            })
            .collect();
        actions.push(Action::Subscribe(
            self.routes.platform_status_topic().to_string(),
        ));
        actions.extend(self.discovery_actions());

        if !self.pending.is_empty() {
            debug!("Flushing {} queued publications", self.pending.len());
        }
        actions.extend(self.pending.drain(..).map(Action::Publish));
        actions
    }

    pub fn on_disconnect(&mut self, code: u8) {
        self.link.on_disconnect(code);
    }

    /// Publish every discovery document, retained.
    pub fn discovery_actions(&self) -> Vec<Action> {
        self.routes
            .discovery_entries()
            .map(|(device, entry)| {
                debug!("Discovery for '{}' on {}: {}", device, entry.topic, entry.payload());
                Action::Publish(Publication::new(entry.topic.clone(), entry.payload(), true))
            })
            .collect()
    }

    /// Message received on a subscribed topic.
    pub fn on_message(&mut self, topic: &str, payload: &str) -> Vec<Action> {
        if topic == self.routes.platform_status_topic() {
            if payload == ONLINE_PAYLOAD {
                info!("Platform online, publishing discovery");
                return self.discovery_actions();
            }
            return Vec::new();
        }

        let Some(device) = self.routes.device_for_command(topic) else {
            debug!("Ignoring message on {}", topic);
            return Vec::new();
        };
        let Some(identity) = self.routes.rf_identity(device) else {
            warn!("Device '{}' has no RF identity, dropping command", device);
            return Vec::new();
        };
        let value = match payload.trim().parse::<i64>() {
            Ok(value) => value,
            Err(_) => {
                warn!("Invalid command '{}' for '{}' on {}", payload, device, topic);
                return Vec::new();
            }
        };

        let frame = RfFrame::encode(identity, value);
        debug!("Command {} for '{}', sending frame [{}]", value, device, frame);
        let mut actions = vec![Action::SendFrame(frame)];

        // Actual state is unknown, so the command is echoed as status.
        if let Some(status) = self.routes.status_topic(device) {
            let echo = Publication::new(status, payload, true);
            self.publish(echo, &mut actions);
        }
        actions
    }

    /// Frame received from the RF transceiver.
    pub fn on_frame(&mut self, frame: &RfFrame) -> Vec<Action> {
        let code = match frame.decode() {
            Ok(code) => code,
            Err(e) => {
                debug!("Discarding frame [{}]: {}", frame, e);
                return Vec::new();
            }
        };

        let Some(device) = self.routes.find_device(&code) else {
            debug!("No device for frame [{}]", frame);
            return Vec::new();
        };
        let Some(status) = self.routes.status_topic(device) else {
            debug!("Device '{}' has no status topic", device);
            return Vec::new();
        };

        let payload = json!({ "event_type": code.value.to_string() }).to_string();
        debug!("Event from '{}': {} on {}", device, payload, status);
        let event = Publication::new(status, payload, false);

        let mut actions = Vec::new();
        self.publish(event, &mut actions);
        actions
    }

    fn publish(&mut self, publication: Publication, actions: &mut Vec<Action>) {
        if self.link.is_connected() {
            actions.push(Action::Publish(publication));
            return;
        }
        if self.pending.len() == PENDING_CAPACITY {
            if let Some(dropped) = self.pending.pop_front() {
                warn!("Publication queue full, dropping message on {}", dropped.topic);
            }
        }
        self.pending.push_back(publication);
    }
}
