//! MQTT session plumbing shared by both daemons.
//!
//! [`pump_events`] owns the `rumqttc` event loop on its own task and turns
//! what it yields into [`MqttEvent`]s on a channel. The event loop is never
//! cancelled mid-poll, so a slow handshake is not restarted, and requests
//! queued on the client are always drained. [`shutdown`] sends the
//! disconnect and waits for it to go out.

use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Outgoing,
    Packet,
};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

use crate::config::mqtt;
use crate::link::CODE_OK;
use crate::settings::{BrokerSettings, NodeId};

/// Code reported when the connection drops without a broker return code.
pub const CONNECTION_LOST: u8 = 7;
/// Pause before the event loop reconnects after a failure or refusal.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);
/// How long shutdown waits for the disconnect to be sent.
pub const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// What the event loop reports to its consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MqttEvent {
    /// Connect acknowledgement or refusal, with its return code.
    ConnAck(u8),
    /// Link lost, with its return code.
    Disconnected(u8),
    /// The first connection attempt failed at the network level.
    ConnectFailed(String),
    /// Message on a subscribed topic.
    Message { topic: String, payload: String },
}

/// Connection options for `<client_prefix>_<node>`.
pub fn options(client_prefix: &str, settings: &BrokerSettings, node_id: &NodeId) -> MqttOptions {
    let client_id = format!("{}_{}", client_prefix, node_id);
    let mut options = MqttOptions::new(client_id, settings.host.clone(), settings.port);
    options.set_keep_alive(Duration::from_secs(mqtt::KEEP_ALIVE_SECS));
    options.set_clean_session(true);

    if let Some(user) = &settings.username {
        options.set_credentials(user.clone(), settings.password.clone().unwrap_or_default());
    }
    options
}

/// Numeric return code of a connect acknowledgement.
pub fn return_code(code: ConnectReturnCode) -> u8 {
    #[allow(unreachable_patterns)]
    match code {
        ConnectReturnCode::Success => 0,
        ConnectReturnCode::RefusedProtocolVersion => 1,
        ConnectReturnCode::BadClientId => 2,
        ConnectReturnCode::ServiceUnavailable => 3,
        ConnectReturnCode::BadUserNamePassword => 4,
        ConnectReturnCode::NotAuthorized => 5,
        _ => CONNECTION_LOST,
    }
}

/// Drive the event loop until the disconnect has been sent, the consumer
/// is gone, or the first connection attempt fails.
///
/// Refusals and later failures are reported and followed by
/// [`RECONNECT_DELAY`] before the event loop dials again.
pub async fn pump_events<T>(mut eventloop: EventLoop, events: UnboundedSender<T>)
where
    T: From<MqttEvent>,
{
    let mut acknowledged = false;

    loop {
        let (event, pause) = match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                acknowledged = true;
                (Some(MqttEvent::ConnAck(return_code(ack.code))), false)
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => (
                Some(MqttEvent::Message {
                    topic: publish.topic.clone(),
                    payload: String::from_utf8_lossy(&publish.payload).into_owned(),
                }),
                false,
            ),
            Ok(Event::Incoming(Packet::Disconnect)) => {
                (Some(MqttEvent::Disconnected(CODE_OK)), false)
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("MQTT disconnect sent");
                break;
            }
            Ok(event) => {
                trace!("MQTT event: {:?}", event);
                (None, false)
            }
            Err(ConnectionError::ConnectionRefused(code)) => {
                acknowledged = true;
                (Some(MqttEvent::ConnAck(return_code(code))), true)
            }
            Err(e) if !acknowledged => {
                error!("MQTT connection failed: {}", e);
                let _ = events.send(MqttEvent::ConnectFailed(e.to_string()).into());
                break;
            }
            Err(e) => {
                debug!("MQTT connection error: {}", e);
                (Some(MqttEvent::Disconnected(CONNECTION_LOST)), true)
            }
        };

        if let Some(event) = event {
            if events.send(event.into()).is_err() {
                break;
            }
        }
        if pause {
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }
    info!("MQTT event loop stopped");
}

/// Queue a disconnect and wait for the pump to send it.
pub async fn shutdown(client: &AsyncClient, pump: JoinHandle<()>) {
    if let Err(e) = client.try_disconnect() {
        debug!("Disconnect failed: {}", e);
    }
    join_pump(pump).await;
}

/// Give the pump [`DISCONNECT_TIMEOUT`] to send a queued disconnect, then
/// abort it.
pub async fn join_pump(mut pump: JoinHandle<()>) {
    if tokio::time::timeout(DISCONNECT_TIMEOUT, &mut pump)
        .await
        .is_err()
    {
        debug!("MQTT event loop did not stop in time");
        pump.abort();
    }
}
