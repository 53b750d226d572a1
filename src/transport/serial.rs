//! # Serial Channel
//!
//! USB serial link to a locally attached device. The firmware interleaves
//! debug output with telemetry, so only lines starting with `>DATA:` carry
//! frames; the JSON record follows the prefix.
//!
//! Opening is user driven and a failed open is final for that attempt.
//! There is no command path over serial.

use super::{ChannelStatus, FrameSink, TransportChannel, TransportKind};
use crate::error::TransportError;
use crate::sample::DeviceCommand;
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Marks a telemetry line on the serial console
pub const DATA_PREFIX: &str = ">DATA:";

/// Port read timeout; bounds how long a stop request can go unnoticed
const READ_TIMEOUT: Duration = Duration::from_millis(100);
const READ_CHUNK: usize = 1024;

/// Longest line kept while waiting for its newline
pub const MAX_LINE_LEN: usize = 4096;

/// Newline framing over an unframed byte stream.
///
/// Bytes after the last newline are held until a later chunk completes
/// the line; they are never parsed early. A line that outgrows
/// `MAX_LINE_LEN` is discarded up to its newline.
#[derive(Debug, Default)]
pub struct LineFramer {
    partial: Vec<u8>,
    /// Inside an over-long line; drop bytes until the next newline
    discarding: bool,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return the payloads of every completed `>DATA:`
    /// line, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut payloads = Vec::new();

        // Only the new chunk is searched; `partial` never holds a newline
        for piece in chunk.split_inclusive(|&b| b == b'\n') {
            let complete = piece.last() == Some(&b'\n');

            if self.discarding {
                self.discarding = !complete;
                continue;
            }

            self.partial.extend_from_slice(piece);
            if complete {
                if let Some(payload) = data_payload(&self.partial) {
                    payloads.push(payload);
                }
                self.partial.clear();
            } else if self.partial.len() > MAX_LINE_LEN {
                log::debug!("Discarding serial line longer than {} bytes", MAX_LINE_LEN);
                self.partial.clear();
                self.discarding = true;
            }
        }
        payloads
    }

    /// Bytes of the unfinished line
    #[cfg(test)]
    pub fn pending(&self) -> &[u8] {
        &self.partial
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(line);
    text.trim().strip_prefix(DATA_PREFIX).map(str::to_owned)
}

pub struct SerialChannel {
    port_name: String,
    baud_rate: u32,
    should_stop: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl SerialChannel {
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            should_stop: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }
}

impl TransportChannel for SerialChannel {
    fn kind(&self) -> TransportKind {
        TransportKind::Serial
    }

    fn connect(&mut self, runtime: &Handle, sink: FrameSink) -> Result<(), TransportError> {
        let port = serialport::new(&self.port_name, self.baud_rate)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| TransportError::SerialUnavailable {
                port: self.port_name.clone(),
                reason: e.to_string(),
            })?;

        log::info!("Opened {} at {} baud", self.port_name, self.baud_rate);

        let should_stop = Arc::new(AtomicBool::new(false));
        self.should_stop = should_stop.clone();

        // Connected goes out before the first frame can
        sink.status(ChannelStatus::Connected);
        self.task = Some(runtime.spawn_blocking(move || read_loop(port, sink, should_stop)));
        Ok(())
    }

    fn send(&self, _command: &DeviceCommand) -> Result<bool, TransportError> {
        Err(TransportError::Unsupported)
    }

    fn close(&mut self) {
        log::info!("Closing {}", self.port_name);
        self.should_stop.store(true, Ordering::Release);
        self.task = None;
    }
}

impl Drop for SerialChannel {
    fn drop(&mut self) {
        self.should_stop.store(true, Ordering::Release);
    }
}

/// Blocking read loop. Ends on stop request, end of stream or read error;
/// the channel is not reopened automatically.
fn read_loop<R: Read>(mut reader: R, sink: FrameSink, should_stop: Arc<AtomicBool>) {
    let mut framer = LineFramer::new();
    let mut buf = [0u8; READ_CHUNK];

    while !should_stop.load(Ordering::Acquire) {
        match reader.read(&mut buf) {
            Ok(0) => {
                log::info!("Serial stream ended");
                break;
            }
            Ok(n) => {
                for payload in framer.push(&buf[..n]) {
                    sink.frame(payload);
                }
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::Interrupted) => {}
            Err(e) => {
                log::error!("Serial read error: {}", e);
                break;
            }
        }
    }

    sink.status(ChannelStatus::Disconnected);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportEvent;
    use std::collections::VecDeque;

    /// Reader that hands out scripted chunks, then end of stream
    struct ScriptedReader {
        chunks: VecDeque<io::Result<Vec<u8>>>,
    }

    impl ScriptedReader {
        fn new(chunks: Vec<io::Result<Vec<u8>>>) -> Self {
            Self { chunks: chunks.into() }
        }
    }

    impl Read for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.chunks.pop_front() {
                Some(Ok(chunk)) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                Some(Err(e)) => Err(e),
                None => Ok(0),
            }
        }
    }

    #[test]
    fn test_partial_line_is_held_until_completed() {
        let mut framer = LineFramer::new();

        let payloads = framer.push(b">DATA:{\"ir\":15000}\n>DATA:{\"bp");
        assert_eq!(payloads, vec![r#"{"ir":15000}"#.to_string()]);
        assert_eq!(framer.pending(), b">DATA:{\"bp");

        let payloads = framer.push(b"m\":72}\n");
        assert_eq!(payloads, vec![r#"{"bpm":72}"#.to_string()]);
        assert!(framer.pending().is_empty());
    }

    #[test]
    fn test_only_prefixed_lines_are_frames() {
        let mut framer = LineFramer::new();
        let payloads = framer.push(b"boot: MAX30102 ok\r\n  >DATA:{\"spo2\":97}\r\nDATA:{}\n\n");
        assert_eq!(payloads, vec![r#"{"spo2":97}"#.to_string()]);
    }

    #[test]
    fn test_overlong_line_is_discarded_up_to_newline() {
        let mut framer = LineFramer::new();

        let noise = vec![b'x'; MAX_LINE_LEN + 1];
        assert!(framer.push(&noise).is_empty());
        assert!(framer.pending().is_empty());

        // Tail of the over-long line, even if it looks like a frame
        let payloads = framer.push(b">DATA:{\"bpm\":1}\n>DATA:{\"bpm\":72}\n");
        assert_eq!(payloads, vec![r#"{"bpm":72}"#.to_string()]);
        assert!(framer.pending().is_empty());
    }

    #[test]
    fn test_buffer_stays_bounded_without_newlines() {
        let mut framer = LineFramer::new();
        for _ in 0..100 {
            framer.push(&[0x55; 1024]);
            assert!(framer.pending().len() <= MAX_LINE_LEN);
        }

        let payloads = framer.push(b"\n>DATA:{\"spo2\":97}\n");
        assert_eq!(payloads, vec![r#"{"spo2":97}"#.to_string()]);
    }

    #[test]
    fn test_line_split_across_many_chunks() {
        let mut framer = LineFramer::new();
        let line = b">DATA:{\"conf\":90}\n";
        let mut payloads = Vec::new();
        for byte in line.iter() {
            payloads.extend(framer.push(std::slice::from_ref(byte)));
        }
        assert_eq!(payloads, vec![r#"{"conf":90}"#.to_string()]);
    }

    #[test]
    fn test_read_loop_delivers_frames_then_disconnects() {
        let reader = ScriptedReader::new(vec![
            Ok(b">DATA:{\"ir\":15000}\n>DATA:{\"ir\":".to_vec()),
            Err(io::Error::new(io::ErrorKind::TimedOut, "idle")),
            Ok(b"16000}\n".to_vec()),
        ]);
        let (tx, rx) = crossbeam_channel::unbounded();
        let sink = FrameSink::new(TransportKind::Serial, tx);

        read_loop(reader, sink, Arc::new(AtomicBool::new(false)));

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                TransportEvent::Frame { source: TransportKind::Serial, payload: r#"{"ir":15000}"#.to_string() },
                TransportEvent::Frame { source: TransportKind::Serial, payload: r#"{"ir":16000}"#.to_string() },
                TransportEvent::Status { source: TransportKind::Serial, status: ChannelStatus::Disconnected },
            ]
        );
    }

    #[test]
    fn test_read_loop_stops_on_error() {
        let reader = ScriptedReader::new(vec![
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged")),
            Ok(b">DATA:{\"bpm\":60}\n".to_vec()),
        ]);
        let (tx, rx) = crossbeam_channel::unbounded();
        read_loop(reader, FrameSink::new(TransportKind::Serial, tx), Arc::new(AtomicBool::new(false)));

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], TransportEvent::Status { status: ChannelStatus::Disconnected, .. }));
    }

    #[test]
    fn test_open_missing_port_is_unavailable() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut channel = SerialChannel::new("/dev/pulse-scope-missing-port", 115_200);

        let result = channel.connect(runtime.handle(), FrameSink::new(TransportKind::Serial, tx));

        assert!(matches!(result, Err(TransportError::SerialUnavailable { .. })));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_send_is_unsupported() {
        let channel = SerialChannel::new("/dev/ttyUSB0", 115_200);
        assert_eq!(
            channel.send(&DeviceCommand::set_frequency(10)),
            Err(TransportError::Unsupported)
        );
    }
}
