//! Transport seams of the bridge.
//!
//! [`BusTransport`] is the publish/subscribe side, implemented over MQTT by
//! [`crate::mqtt::MqttBus`]. [`RfTransport`] is the transceiver side; the
//! radio driver itself lives outside this crate and is reached through
//! device nodes that exchange one frame per line.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TrySendError};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::frame::RfFrame;

/// Publish/subscribe bus client.
#[async_trait]
pub trait BusTransport: Send + Sync {
    async fn subscribe(&self, topic: &str) -> Result<(), TransportError>;

    async fn publish(&self, topic: &str, payload: &str, retain: bool) -> Result<(), TransportError>;

    async fn disconnect(&self) -> Result<(), TransportError>;
}

/// RF transceiver.
pub trait RfTransport: Send {
    /// Wait up to `timeout` for a received frame.
    fn read_frame(&mut self, timeout: Duration) -> Result<Option<RfFrame>, TransportError>;

    fn write_frame(&mut self, frame: &RfFrame) -> Result<(), TransportError>;
}

/// Frames buffered between the reader thread and [`RfTransport::read_frame`].
/// Frames arriving while the buffer is full are dropped.
pub const FRAME_BACKLOG: usize = 64;

/// RF transport over line-oriented device nodes.
///
/// Every line holds one frame as whitespace separated integers. Lines are
/// read on a background thread so [`RfTransport::read_frame`] can honour its
/// timeout.
pub struct LineTransport<W = File> {
    frames: Option<Receiver<RfFrame>>,
    writer: W,
}

impl LineTransport<File> {
    /// Open a character device that carries both directions.
    ///
    /// A FIFO would hand every written frame back to the reader; use
    /// [`LineTransport::open_pair`] for FIFOs.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let path = path.as_ref();
        let writer = open_rw(path)?;
        let reader = writer.try_clone()?;
        debug!("Opened RF device {}", path.display());
        Ok(Self::from_parts(BufReader::new(reader), writer))
    }

    /// Receive from `input` and send to `output`.
    pub fn open_pair(
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<Self, TransportError> {
        let (input, output) = (input.as_ref(), output.as_ref());
        let reader = open_rw(input)?;
        let writer = open_rw(output)?;
        debug!(
            "Opened RF receiver {} and sender {}",
            input.display(),
            output.display()
        );
        Ok(Self::from_parts(BufReader::new(reader), writer))
    }

    /// Send-only transport. Nothing is read from the device.
    pub fn open_output(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let path = path.as_ref();
        let writer = open_rw(path)?;
        debug!("Opened RF sender {}", path.display());
        Ok(Self::output_only(writer))
    }
}

/// Read-write open, which keeps opening a FIFO from waiting for its peer.
fn open_rw(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().read(true).write(true).open(path)
}

impl<W: Write + Send> LineTransport<W> {
    /// Read frames from `reader` on a background thread and send to `writer`.
    pub fn from_parts<R>(reader: R, writer: W) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let (tx, frames) = mpsc::sync_channel(FRAME_BACKLOG);
        thread::spawn(move || {
            for line in reader.lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("RF device read failed: {}", e);
                        break;
                    }
                };
                let Some(frame) = parse_line(&line) else {
                    continue;
                };
                match tx.try_send(frame) {
                    Ok(()) => {}
                    Err(TrySendError::Full(frame)) => {
                        debug!("RF backlog full, dropping frame [{}]", frame)
                    }
                    Err(TrySendError::Disconnected(_)) => break,
                }
            }
            debug!("RF reader finished");
        });
        Self {
            frames: Some(frames),
            writer,
        }
    }

    /// Transport that only sends. Reads never yield a frame.
    pub fn output_only(writer: W) -> Self {
        Self {
            frames: None,
            writer,
        }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }
}

impl<W: Write + Send> RfTransport for LineTransport<W> {
    fn read_frame(&mut self, timeout: Duration) -> Result<Option<RfFrame>, TransportError> {
        let Some(frames) = &self.frames else {
            return Ok(None);
        };
        match frames.recv_timeout(timeout) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }

    fn write_frame(&mut self, frame: &RfFrame) -> Result<(), TransportError> {
        writeln!(self.writer, "{}", frame)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Parse one line into a frame. Blank lines and lines with anything but
/// integers yield nothing.
pub fn parse_line(line: &str) -> Option<RfFrame> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match line
        .split_whitespace()
        .map(str::parse::<i64>)
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(values) => Some(RfFrame::new(values)),
        Err(e) => {
            warn!("Discarding RF line '{}': {}", line, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("21 4 1"), Some(RfFrame::new(vec![21, 4, 1])));
        assert_eq!(parse_line("  3\t0 \n"), Some(RfFrame::new(vec![3, 0])));
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("3 on"), None);
    }

    #[test]
    fn test_read_frames_then_closed() {
        let reader = Cursor::new(b"7 2 3 1\n\nbad\n3 0\n".to_vec());
        let mut rf = LineTransport::from_parts(reader, Vec::new());
        let timeout = Duration::from_secs(1);

        assert_eq!(rf.read_frame(timeout).unwrap(), Some(RfFrame::new(vec![7, 2, 3, 1])));
        assert_eq!(rf.read_frame(timeout).unwrap(), Some(RfFrame::new(vec![3, 0])));
        assert!(matches!(rf.read_frame(timeout), Err(TransportError::Closed)));
    }

    #[test]
    fn test_write_frame() {
        let mut rf = LineTransport::from_parts(Cursor::new(Vec::new()), Vec::new());
        rf.write_frame(&RfFrame::new(vec![21, 4, 0])).unwrap();
        rf.write_frame(&RfFrame::new(vec![3, 1])).unwrap();
        assert_eq!(rf.writer().as_slice(), b"21 4 0\n3 1\n");
    }

    #[test]
    fn test_backlog_is_bounded() {
        let lines: String = (0..FRAME_BACKLOG + 10).map(|i| format!("4 {}\n", i)).collect();
        let mut rf = LineTransport::from_parts(Cursor::new(lines.into_bytes()), Vec::new());
        thread::sleep(Duration::from_millis(300));

        let mut received = Vec::new();
        while let Some(frame) = rf.read_frame(Duration::from_secs(1)).unwrap_or(None) {
            received.push(frame);
        }
        assert_eq!(received.len(), FRAME_BACKLOG);
        assert_eq!(received[0], RfFrame::new(vec![4, 0]));
    }

    #[test]
    fn test_output_only_never_reads() {
        let mut rf = LineTransport::output_only(Vec::new());
        rf.write_frame(&RfFrame::new(vec![3, 1])).unwrap();
        assert_eq!(rf.read_frame(Duration::from_millis(10)).unwrap(), None);
        assert_eq!(rf.writer().as_slice(), b"3 1\n");
    }

    #[test]
    fn test_pair_keeps_directions_apart() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("rx");
        let output = dir.path().join("tx");
        std::fs::write(&input, "4 1\n").unwrap();
        std::fs::write(&output, "").unwrap();

        let mut rf = LineTransport::open_pair(&input, &output).unwrap();
        rf.write_frame(&RfFrame::new(vec![3, 1])).unwrap();

        let timeout = Duration::from_secs(1);
        assert_eq!(rf.read_frame(timeout).unwrap(), Some(RfFrame::new(vec![4, 1])));
        assert!(matches!(rf.read_frame(timeout), Err(TransportError::Closed)));
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "3 1\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_fifo_pair_does_not_echo() {
        use std::process::Command;

        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("rx.fifo");
        let output = dir.path().join("tx.fifo");
        for fifo in [&input, &output] {
            assert!(Command::new("mkfifo").arg(fifo).status().unwrap().success());
        }

        let mut rf = LineTransport::open_pair(&input, &output).unwrap();
        rf.write_frame(&RfFrame::new(vec![3, 1])).unwrap();
        assert_eq!(rf.read_frame(Duration::from_millis(300)).unwrap(), None);

        let mut driver_in = OpenOptions::new().write(true).open(&input).unwrap();
        writeln!(driver_in, "4 1").unwrap();
        assert_eq!(
            rf.read_frame(Duration::from_secs(1)).unwrap(),
            Some(RfFrame::new(vec![4, 1]))
        );

        let mut sent = String::new();
        BufReader::new(File::open(&output).unwrap())
            .read_line(&mut sent)
            .unwrap();
        assert_eq!(sent, "3 1\n");
    }
}
