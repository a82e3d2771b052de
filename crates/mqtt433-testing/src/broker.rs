//! Scripted MQTT broker
//!
//! Speaks just enough MQTT 3.1.1 over TCP to let a client connect,
//! subscribe, publish and disconnect. Every packet it sees is counted in
//! [`BrokerStats`] so tests can assert on what a client actually sent.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::debug;

const CONNECT: u8 = 1;
const PUBLISH: u8 = 3;
const SUBSCRIBE: u8 = 8;
const PINGREQ: u8 = 12;
const DISCONNECT: u8 = 14;

/// How the broker answers connection attempts.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrokerBehaviour {
    /// Delay between receiving CONNECT and answering CONNACK.
    pub connack_delay: Duration,
    /// CONNACK return code. Non-zero codes close the connection.
    pub return_code: u8,
}

/// Publish packet as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedPublish {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

/// Everything the broker has seen so far.
#[derive(Debug, Clone, Default)]
pub struct BrokerStats {
    pub connects: usize,
    pub subscriptions: Vec<String>,
    pub publishes: Vec<ReceivedPublish>,
    pub disconnects: usize,
}

/// Broker listening on a random local port.
pub struct FakeBroker {
    port: u16,
    stats: Arc<Mutex<BrokerStats>>,
    task: JoinHandle<()>,
}

impl FakeBroker {
    /// Start listening on `127.0.0.1`.
    pub async fn start(behaviour: BrokerBehaviour) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let stats = Arc::new(Mutex::new(BrokerStats::default()));

        let shared = stats.clone();
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let stats = shared.clone();
                tokio::spawn(async move {
                    if let Err(e) = serve(stream, behaviour, stats).await {
                        debug!("Fake broker connection ended: {}", e);
                    }
                });
            }
        });

        Ok(Self { port, stats, task })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> BrokerStats {
        self.stats.lock().clone()
    }

    /// Wait until `done` holds for the counters or `timeout` passes.
    /// Returns whether `done` held.
    pub async fn wait_for<F>(&self, timeout: Duration, done: F) -> bool
    where
        F: Fn(&BrokerStats) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if done(&self.stats.lock()) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

impl Drop for FakeBroker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    mut stream: TcpStream,
    behaviour: BrokerBehaviour,
    stats: Arc<Mutex<BrokerStats>>,
) -> io::Result<()> {
    loop {
        let (header, body) = read_packet(&mut stream).await?;
        match header >> 4 {
            CONNECT => {
                stats.lock().connects += 1;
                tokio::time::sleep(behaviour.connack_delay).await;
                stream
                    .write_all(&[0x20, 0x02, 0x00, behaviour.return_code])
                    .await?;
                if behaviour.return_code != 0 {
                    return Ok(());
                }
            }
            SUBSCRIBE => {
                let topics = subscribe_topics(&body);
                let mut suback = vec![0x90, (2 + topics.len()) as u8, body[0], body[1]];
                suback.extend(std::iter::repeat(0x00).take(topics.len()));
                stats.lock().subscriptions.extend(topics);
                stream.write_all(&suback).await?;
            }
            PUBLISH => {
                let qos = (header >> 1) & 0x03;
                let topic_len = u16::from_be_bytes([body[0], body[1]]) as usize;
                let topic = String::from_utf8_lossy(&body[2..2 + topic_len]).into_owned();
                let mut offset = 2 + topic_len;
                if qos > 0 {
                    stream
                        .write_all(&[0x40, 0x02, body[offset], body[offset + 1]])
                        .await?;
                    offset += 2;
                }
                stats.lock().publishes.push(ReceivedPublish {
                    topic,
                    payload: String::from_utf8_lossy(&body[offset..]).into_owned(),
                    retain: header & 0x01 == 1,
                });
            }
            PINGREQ => stream.write_all(&[0xD0, 0x00]).await?,
            DISCONNECT => {
                stats.lock().disconnects += 1;
                return Ok(());
            }
            _ => {}
        }
    }
}

async fn read_packet(stream: &mut TcpStream) -> io::Result<(u8, Vec<u8>)> {
    let header = stream.read_u8().await?;

    let mut remaining = 0usize;
    let mut shift = 0;
    loop {
        let byte = stream.read_u8().await?;
        remaining |= ((byte & 0x7F) as usize) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift > 21 {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "bad remaining length"));
        }
    }

    let mut body = vec![0u8; remaining];
    stream.read_exact(&mut body).await?;
    Ok((header, body))
}

/// Topic filters of a SUBSCRIBE body, after its packet id.
fn subscribe_topics(body: &[u8]) -> Vec<String> {
    let mut topics = Vec::new();
    let mut offset = 2;
    while offset + 2 <= body.len() {
        let len = u16::from_be_bytes([body[offset], body[offset + 1]]) as usize;
        let start = offset + 2;
        if start + len >= body.len() {
            break;
        }
        topics.push(String::from_utf8_lossy(&body[start..start + len]).into_owned());
        // Skip the requested QoS byte.
        offset = start + len + 1;
    }
    topics
}
