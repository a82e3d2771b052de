//! Topic logger daemon.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mqtt433_core::config::mqtt;
use mqtt433_core::session::{self, pump_events, MqttEvent};
use mqtt433_core::{BrokerSettings, ConfigTree, LinkMonitor, NodeId};
use rumqttc::{AsyncClient, QoS};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::csv_log::CsvLog;
use crate::error::{LoggerError, LoggerResult};
use crate::items::{log_items, LogItem};
use crate::rotation::LogRotator;

/// Prefix of the client id, followed by the node id.
pub const CLIENT_ID_PREFIX: &str = "mqttlogger";

/// How often the running flag is checked while idle.
const TICK: Duration = Duration::from_millis(200);

/// Routes received values to the CSV log of their item.
#[derive(Debug)]
pub struct TopicLogger {
    items: Vec<(LogItem, CsvLog)>,
    link: LinkMonitor,
}

impl TopicLogger {
    pub fn new(items: Vec<LogItem>) -> Self {
        let items = items
            .into_iter()
            .map(|item| {
                let log = CsvLog::new(&item.folder, &item.main_topic);
                (item, log)
            })
            .collect();
        Self {
            items,
            link: LinkMonitor::new(),
        }
    }

    pub fn from_tree(tree: &ConfigTree) -> Self {
        Self::new(log_items(tree))
    }

    pub fn items(&self) -> impl Iterator<Item = &LogItem> {
        self.items.iter().map(|(item, _)| item)
    }

    pub fn log(&self, name: &str) -> Option<&CsvLog> {
        self.items
            .iter()
            .find(|(item, _)| item.name == name)
            .map(|(_, log)| log)
    }

    /// Move the files of the previous run into numbered backups.
    pub fn rotate_files(&self, rotator: &LogRotator) {
        for (item, log) in &self.items {
            for path in [log.header_path(), log.log_path()] {
                let report = rotator.rotate_and_reset(path);
                if report.reset {
                    debug!("Rotated {} for '{}'", path.display(), item.name);
                }
            }
        }
    }

    /// Every topic to subscribe to, in item order.
    pub fn subscriptions(&self) -> Vec<String> {
        self.items
            .iter()
            .flat_map(|(item, _)| item.topics.iter().cloned())
            .collect()
    }

    /// Connect acknowledgement. Returns `true` when subscriptions are due.
    pub fn on_connect(&mut self, code: u8) -> bool {
        self.link.on_connect(code)
    }

    pub fn on_disconnect(&mut self, code: u8) {
        self.link.on_disconnect(code);
    }

    /// Record a message with the first item whose main topic is the
    /// message's parent topic. Returns that item's name.
    pub fn on_message(&mut self, topic: &str, payload: &str) -> Option<&str> {
        let (item, log) = self.items.iter_mut().find(|(item, _)| item.matches(topic))?;
        debug!("Logging {} = {} for '{}'", topic, payload, item.name);
        log.record(topic, payload);
        Some(item.name.as_str())
    }
}

/// Run the topic logger described by `tree` until `running` is cleared.
///
/// The event loop runs on its own task; this task records messages and
/// issues subscriptions.
pub async fn run_logger(tree: &ConfigTree, running: Arc<AtomicBool>) -> LoggerResult<()> {
    let broker = BrokerSettings::from_tree(tree)?;
    let node_id = NodeId::resolve(tree);

    let mut logger = TopicLogger::from_tree(tree);
    logger.rotate_files(&LogRotator::default());
    let subscriptions = logger.subscriptions();
    info!(
        "Logging {} items, {} topics",
        logger.items().count(),
        subscriptions.len()
    );

    let options = session::options(CLIENT_ID_PREFIX, &broker, &node_id);
    let (client, eventloop) = AsyncClient::new(options, mqtt::REQUEST_CAPACITY);
    info!("Connecting to {}:{}", broker.host, broker.port);

    let (tx, mut events) = mpsc::unbounded_channel::<MqttEvent>();
    let pump = tokio::spawn(pump_events(eventloop, tx));
    let mut result = Ok(());

    while running.load(Ordering::Relaxed) {
        let event = match tokio::time::timeout(TICK, events.recv()).await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(_) => continue,
        };

        match event {
            MqttEvent::ConnAck(code) => {
                if logger.on_connect(code) {
                    for topic in &subscriptions {
                        debug!("Subscribing {}", topic);
                        if let Err(e) = client.subscribe(topic.as_str(), QoS::AtMostOnce).await {
                            warn!("Subscribe to {} failed: {}", topic, e);
                        }
                    }
                }
            }
            MqttEvent::Disconnected(code) => logger.on_disconnect(code),
            MqttEvent::ConnectFailed(reason) => {
                result = Err(LoggerError::Connect(reason));
                break;
            }
            MqttEvent::Message { topic, payload } => {
                if logger.on_message(&topic, &payload).is_none() {
                    trace!("No item for {}", topic);
                }
            }
        }
    }

    running.store(false, Ordering::Relaxed);
    session::shutdown(&client, pump).await;
    info!("Logger stopped");
    result
}
