//! # Socket Channel
//!
//! Persistent WebSocket link to the device at `ws://<host>/ws`.
//!
//! The device reboots and drops off the network routinely, so a closed link
//! is never final: after any close or failed attempt the channel waits
//! `RECONNECT_DELAY` and tries again, until `close()` is called.

use super::{ChannelStatus, FrameSink, TransportChannel, TransportKind};
use crate::decoder::encode_command;
use crate::error::TransportError;
use crate::sample::DeviceCommand;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Wait between a close and the next connect attempt
pub const RECONNECT_DELAY: Duration = Duration::from_millis(2000);

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

type DeviceSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Telemetry endpoint served by the device at `host`
pub fn endpoint_for(host: &str) -> String {
    format!("ws://{}/ws", host)
}

pub struct SocketChannel {
    host: String,
    reconnect_delay: Duration,
    open: Arc<AtomicBool>,
    should_stop: Arc<AtomicBool>,
    outbound: Option<mpsc::UnboundedSender<String>>,
    task: Option<JoinHandle<()>>,
}

impl SocketChannel {
    /// `host` is the device address, optionally with a port
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            reconnect_delay: RECONNECT_DELAY,
            open: Arc::new(AtomicBool::new(false)),
            should_stop: Arc::new(AtomicBool::new(false)),
            outbound: None,
            task: None,
        }
    }

    #[cfg(test)]
    fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl TransportChannel for SocketChannel {
    fn kind(&self) -> TransportKind {
        TransportKind::Socket
    }

    fn connect(&mut self, runtime: &Handle, sink: FrameSink) -> Result<(), TransportError> {
        if self.is_running() {
            log::debug!("Socket channel already running");
            return Ok(());
        }

        // Fresh flag per run so a late close() on the old run cannot stop this one
        let should_stop = Arc::new(AtomicBool::new(false));
        self.should_stop = should_stop.clone();

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        self.outbound = Some(outbound_tx);

        let link = SocketLink {
            host: self.host.clone(),
            reconnect_delay: self.reconnect_delay,
            open: self.open.clone(),
            should_stop,
            sink,
        };
        self.task = Some(runtime.spawn(link.run(outbound_rx)));
        Ok(())
    }

    fn send(&self, command: &DeviceCommand) -> Result<bool, TransportError> {
        if !self.open.load(Ordering::Acquire) {
            log::debug!("Socket closed, dropping {:?}", command);
            return Ok(false);
        }
        match &self.outbound {
            Some(tx) => Ok(tx.send(encode_command(command)).is_ok()),
            None => Ok(false),
        }
    }

    fn close(&mut self) {
        self.should_stop.store(true, Ordering::Release);
        self.open.store(false, Ordering::Release);
        self.outbound = None;
        self.task = None;
    }
}

impl Drop for SocketChannel {
    fn drop(&mut self) {
        self.should_stop.store(true, Ordering::Release);
    }
}

/// State moved into the background task
struct SocketLink {
    host: String,
    reconnect_delay: Duration,
    open: Arc<AtomicBool>,
    should_stop: Arc<AtomicBool>,
    sink: FrameSink,
}

impl SocketLink {
    fn stopped(&self) -> bool {
        self.should_stop.load(Ordering::Acquire)
    }

    async fn run(self, mut outbound: mpsc::UnboundedReceiver<String>) {
        loop {
            if self.stopped() {
                break;
            }

            // Resolved per attempt so a changed host takes effect on reconnect
            let endpoint = endpoint_for(&self.host);
            self.sink.status(ChannelStatus::Connecting);
            log::info!("Connecting to {}", endpoint);

            let attempt = tokio::select! {
                result = connect_async(endpoint.as_str()) => Some(result),
                _ = wait_for_stop(&self.should_stop) => None,
            };

            match attempt {
                Some(Ok((stream, _response))) => {
                    // Commands queued for a previous session are stale
                    while outbound.try_recv().is_ok() {}

                    self.open.store(true, Ordering::Release);
                    log::info!("WebSocket connected: {}", endpoint);
                    self.sink.status(ChannelStatus::Connected);

                    self.run_session(stream, &mut outbound).await;

                    self.open.store(false, Ordering::Release);
                    log::info!("WebSocket closed: {}", endpoint);
                }
                Some(Err(e)) => {
                    let error = TransportError::SocketConnect {
                        endpoint: endpoint.clone(),
                        reason: e.to_string(),
                    };
                    log::warn!("{}", error);
                }
                None => {}
            }

            self.sink.status(ChannelStatus::Disconnected);

            if self.stopped() {
                break;
            }

            log::debug!("Reconnecting in {:?}", self.reconnect_delay);
            tokio::select! {
                _ = tokio::time::sleep(self.reconnect_delay) => {}
                _ = wait_for_stop(&self.should_stop) => break,
            }
        }

        log::info!("Socket channel stopped");
    }

    /// Pump frames and commands until the link closes or a stop is requested
    async fn run_session(&self, stream: DeviceSocket, outbound: &mut mpsc::UnboundedReceiver<String>) {
        let (mut write, mut read) = stream.split();

        loop {
            tokio::select! {
                item = read.next() => match item {
                    Some(Ok(Message::Text(text))) => self.sink.frame(text.as_str().to_owned()),
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => self.sink.frame(text),
                        Err(_) => log::debug!("Ignoring non-UTF-8 binary frame"),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        log::info!("Device closed the socket: {:?}", frame);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        log::warn!("WebSocket read error: {}", e);
                        break;
                    }
                    None => break,
                },
                command = outbound.recv() => match command {
                    Some(text) => {
                        log::trace!("Sending command {}", text);
                        if let Err(e) = write.send(Message::Text(text.into())).await {
                            log::warn!("WebSocket write error: {}", e);
                            break;
                        }
                    }
                    // Owning channel dropped; the stop flag is already set
                    None => break,
                },
                _ = wait_for_stop(&self.should_stop) => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    }
}

async fn wait_for_stop(should_stop: &AtomicBool) {
    while !should_stop.load(Ordering::Acquire) {
        tokio::time::sleep(STOP_POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportEvent;
    use crossbeam_channel::Receiver;
    use std::time::Instant;
    use tokio::net::TcpListener;

    async fn next_event(rx: &Receiver<TransportEvent>) -> TransportEvent {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Ok(event) = rx.try_recv() {
                return event;
            }
            assert!(Instant::now() < deadline, "timed out waiting for socket event");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn wait_for_status(rx: &Receiver<TransportEvent>, wanted: ChannelStatus) -> Vec<TransportEvent> {
        let mut seen = Vec::new();
        loop {
            let event = next_event(rx).await;
            let done = matches!(&event, TransportEvent::Status { status, .. } if *status == wanted);
            seen.push(event);
            if done {
                return seen;
            }
        }
    }

    fn count_status(events: &[TransportEvent], wanted: &ChannelStatus) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, TransportEvent::Status { status, .. } if status == wanted))
            .count()
    }

    #[test]
    fn test_endpoint_is_derived_from_host() {
        assert_eq!(endpoint_for("192.168.4.1"), "ws://192.168.4.1/ws");
        assert_eq!(endpoint_for("pulse.local:8080"), "ws://pulse.local:8080/ws");
    }

    #[test]
    fn test_send_is_noop_when_not_open() {
        let channel = SocketChannel::new("127.0.0.1:1");
        assert_eq!(channel.send(&DeviceCommand::set_frequency(10)), Ok(false));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reconnects_after_close_no_sooner_than_delay() {
        let delay = Duration::from_millis(300);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let host = listener.local_addr().unwrap().to_string();

        let (tx, rx) = crossbeam_channel::unbounded();
        let mut channel = SocketChannel::new(host).with_reconnect_delay(delay);
        channel
            .connect(&Handle::current(), FrameSink::new(TransportKind::Socket, tx))
            .unwrap();

        // First session: one frame, one command, then the device goes away
        let (tcp, _) = listener.accept().await.unwrap();
        let mut device = tokio_tungstenite::accept_async(tcp).await.unwrap();
        let first = wait_for_status(&rx, ChannelStatus::Connected).await;
        assert_eq!(count_status(&first, &ChannelStatus::Connected), 1);

        assert_eq!(channel.send(&DeviceCommand::set_frequency(10)), Ok(true));
        match device.next().await {
            Some(Ok(Message::Text(text))) => assert_eq!(text.as_str(), r#"{"freq":10}"#),
            other => panic!("unexpected message: {:?}", other),
        }

        device.send(Message::Text(r#"{"bpm":72}"#.into())).await.unwrap();
        let frame = next_event(&rx).await;
        assert_eq!(
            frame,
            TransportEvent::Frame { source: TransportKind::Socket, payload: r#"{"bpm":72}"#.to_string() }
        );

        let closing = Instant::now();
        device.close(None).await.unwrap();
        drop(device);

        // Second session
        let (tcp, _) = tokio::time::timeout(Duration::from_secs(5), listener.accept())
            .await
            .expect("no reconnect attempt")
            .unwrap();
        assert!(closing.elapsed() >= delay, "reconnected after {:?}", closing.elapsed());
        let _device = tokio_tungstenite::accept_async(tcp).await.unwrap();

        let cycle = wait_for_status(&rx, ChannelStatus::Connected).await;
        assert_eq!(count_status(&cycle, &ChannelStatus::Disconnected), 1);
        assert_eq!(count_status(&cycle, &ChannelStatus::Connected), 1);

        channel.close();
        wait_for_status(&rx, ChannelStatus::Disconnected).await;
        assert_eq!(channel.send(&DeviceCommand::set_frequency(10)), Ok(false));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failed_attempts_keep_retrying() {
        // Bind then drop so the port refuses connections
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let host = listener.local_addr().unwrap().to_string();
        drop(listener);

        let (tx, rx) = crossbeam_channel::unbounded();
        let mut channel = SocketChannel::new(host).with_reconnect_delay(Duration::from_millis(50));
        channel
            .connect(&Handle::current(), FrameSink::new(TransportKind::Socket, tx))
            .unwrap();

        let mut events = wait_for_status(&rx, ChannelStatus::Disconnected).await;
        events.extend(wait_for_status(&rx, ChannelStatus::Disconnected).await);
        assert!(count_status(&events, &ChannelStatus::Connecting) >= 2);
        assert_eq!(count_status(&events, &ChannelStatus::Connected), 0);

        channel.close();
    }
}
