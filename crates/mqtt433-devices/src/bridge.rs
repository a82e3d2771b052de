//! Bridge runner.
//!
//! The MQTT event loop and the RF poller each run on their own task and
//! feed [`BridgeInput`]s into one channel. A single consumer owns the
//! [`TranslationEngine`] and executes the actions it returns. All loops stop
//! when the shared running flag is cleared.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::engine::{Action, TranslationEngine};
use crate::error::{BridgeError, BridgeResult};
use crate::frame::RfFrame;
use crate::transport::{BusTransport, RfTransport};

/// How long one RF read may block.
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);
/// Pause between RF reads when nothing was received.
pub const IDLE_SLEEP: Duration = Duration::from_millis(100);
/// How often the consumer checks the running flag while idle.
const TICK: Duration = Duration::from_millis(200);

/// Events fed to the bridge consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeInput {
    /// Connect acknowledgement with its return code.
    ConnAck(u8),
    /// Link lost, with its return code.
    Disconnected(u8),
    /// The first connection attempt failed.
    ConnectFailed(String),
    /// Message on a subscribed topic.
    Message { topic: String, payload: String },
    /// Frame from the RF receiver.
    Frame(RfFrame),
}

/// RF transport shared by the poller and the consumer.
pub type SharedRf<R> = Arc<Mutex<R>>;

/// Consumer side of the bridge.
pub struct Bridge<B, R> {
    engine: TranslationEngine,
    bus: B,
    rf: Option<SharedRf<R>>,
    running: Arc<AtomicBool>,
}

impl<B, R> Bridge<B, R>
where
    B: BusTransport,
    R: RfTransport + 'static,
{
    pub fn new(
        engine: TranslationEngine,
        bus: B,
        rf: Option<SharedRf<R>>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            engine,
            bus,
            rf,
            running,
        }
    }

    pub fn engine(&self) -> &TranslationEngine {
        &self.engine
    }

    /// Consume inputs until the running flag is cleared or every sender is
    /// gone, then disconnect from the bus. `inputs` stays open afterwards so
    /// the producers can finish sending the disconnect.
    pub async fn run(&mut self, inputs: &mut UnboundedReceiver<BridgeInput>) -> BridgeResult<()> {
        let mut result = Ok(());

        while self.running.load(Ordering::Relaxed) {
            let input = match tokio::time::timeout(TICK, inputs.recv()).await {
                Ok(Some(input)) => input,
                Ok(None) => break,
                Err(_) => continue,
            };
            if let Err(e) = self.handle(input).await {
                result = Err(e);
                break;
            }
        }

        self.running.store(false, Ordering::Relaxed);
        if let Err(e) = self.bus.disconnect().await {
            debug!("Disconnect failed: {}", e);
        }
        info!("Bridge stopped");
        result
    }

    /// Apply one input to the engine and execute the resulting actions.
    pub async fn handle(&mut self, input: BridgeInput) -> BridgeResult<()> {
        let actions = match input {
            BridgeInput::ConnAck(code) => self.engine.on_connect(code),
            BridgeInput::Disconnected(code) => {
                self.engine.on_disconnect(code);
                Vec::new()
            }
            BridgeInput::ConnectFailed(reason) => return Err(BridgeError::Connect(reason)),
            BridgeInput::Message { topic, payload } => self.engine.on_message(&topic, &payload),
            BridgeInput::Frame(frame) => self.engine.on_frame(&frame),
        };
        self.execute(actions).await;
        Ok(())
    }

    async fn execute(&self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Subscribe(topic) => {
                    if let Err(e) = self.bus.subscribe(&topic).await {
                        warn!("Subscribe to {} failed: {}", topic, e);
                    }
                }
                Action::Publish(publication) => {
                    if let Err(e) = self
                        .bus
                        .publish(&publication.topic, &publication.payload, publication.retain)
                        .await
                    {
                        warn!("Publish to {} failed: {}", publication.topic, e);
                    }
                }
                Action::SendFrame(frame) => match &self.rf {
                    Some(rf) => send_frame(rf.clone(), frame).await,
                    None => warn!("No RF transport, dropping frame [{}]", frame),
                },
            }
        }
    }
}

/// Write a frame on a blocking task; the poller may hold the transport for
/// up to [`READ_TIMEOUT`].
async fn send_frame<R>(rf: SharedRf<R>, frame: RfFrame)
where
    R: RfTransport + 'static,
{
    let sent = tokio::task::spawn_blocking(move || {
        let result = rf.lock().write_frame(&frame);
        (frame, result)
    })
    .await;
    match sent {
        Ok((_, Ok(()))) => {}
        Ok((frame, Err(e))) => warn!("Sending frame [{}] failed: {}", frame, e),
        Err(e) => warn!("Sending frame failed: {}", e),
    }
}

/// Poll the RF receiver on a blocking task and forward received frames.
pub fn spawn_rf_poller<R>(
    rf: SharedRf<R>,
    inputs: UnboundedSender<BridgeInput>,
    running: Arc<AtomicBool>,
) -> JoinHandle<()>
where
    R: RfTransport + 'static,
{
    tokio::task::spawn_blocking(move || {
        debug!("RF poller started");
        while running.load(Ordering::Relaxed) {
            let received = rf.lock().read_frame(READ_TIMEOUT);
            match received {
                Ok(Some(frame)) => {
                    if inputs.send(BridgeInput::Frame(frame)).is_err() {
                        break;
                    }
                }
                Ok(None) => std::thread::sleep(IDLE_SLEEP),
                Err(e) => {
                    error!("RF receiver stopped: {}", e);
                    break;
                }
            }
        }
        debug!("RF poller stopped");
    })
}

#[cfg(feature = "mqtt")]
pub use self::service::run_bridge;

#[cfg(feature = "mqtt")]
mod service {
    use super::*;

    use mqtt433_core::session::{self, pump_events};
    use mqtt433_core::{BrokerSettings, ConfigTree, TypedValue};
    use tokio::sync::mpsc;

    use crate::discovery::DiscoverySettings;
    use crate::mqtt::MqttBus;
    use crate::registry::DeviceRegistry;
    use crate::routing::RoutingTables;
    use crate::schema::{keys, DEFAULT_RF_DEVICE};
    use crate::transport::LineTransport;

    /// Run the RF bridge described by `tree` until `running` is cleared.
    pub async fn run_bridge(tree: &ConfigTree, running: Arc<AtomicBool>) -> BridgeResult<()> {
        let broker = BrokerSettings::from_tree(tree)?;
        let discovery = DiscoverySettings::from_tree(tree);
        let routes = RoutingTables::build(&DeviceRegistry::new(tree), &discovery);
        for skipped in routes.skipped() {
            debug!("{} table: {}", skipped.table, skipped.error);
        }

        let rf = Arc::new(Mutex::new(open_rf(tree, routes.has_inputs())?));

        let (bus, eventloop) = MqttBus::new(&broker, &discovery.node_id);
        info!(
            "Connecting to {}:{} as node {}",
            broker.host, broker.port, discovery.node_id
        );

        let (tx, mut rx) = mpsc::unbounded_channel::<BridgeInput>();
        let pump = tokio::spawn(pump_events(eventloop, tx.clone()));
        let poller = if routes.has_inputs() {
            Some(spawn_rf_poller(rf.clone(), tx.clone(), running.clone()))
        } else {
            debug!("No input devices, RF receiver not polled");
            None
        };
        drop(tx);

        let mut bridge = Bridge::new(TranslationEngine::new(routes), bus, Some(rf), running);
        let result = bridge.run(&mut rx).await;

        session::join_pump(pump).await;
        if let Some(poller) = poller {
            let _ = poller.await;
        }
        result
    }

    /// Open the transceiver. Without input devices it is only written to.
    fn open_rf(tree: &ConfigTree, receive: bool) -> BridgeResult<LineTransport> {
        let path = |key: &str| {
            tree.scalar(key)
                .filter(|v| !v.is_empty())
                .map(TypedValue::format)
        };
        let device = path(keys::RF_DEVICE).unwrap_or_else(|| DEFAULT_RF_DEVICE.to_string());

        let rf = match (receive, path(keys::RF_RECEIVE)) {
            (false, _) => LineTransport::open_output(&device)?,
            (true, Some(input)) => {
                info!("RF receiver on {}", input);
                LineTransport::open_pair(&input, &device)?
            }
            (true, None) => LineTransport::open(&device)?,
        };
        info!("RF transceiver on {}", device);
        Ok(rf)
    }
}
