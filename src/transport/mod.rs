//! # Transport Module
//!
//! The two interchangeable ways telemetry reaches the dashboard.
//!
//! ## Key Types
//! - `TransportChannel`: connect / send / close contract shared by both variants
//! - `FrameSink`: handler a channel delivers frames and status changes to
//! - `TransportEvent`: what travels from the connection thread to the UI thread
//!
//! Every event is tagged with the channel it came from so the dashboard can
//! drop frames from a channel that is no longer the active one.

pub mod serial;
pub mod socket;

use crate::error::TransportError;
use crate::sample::DeviceCommand;
use crossbeam_channel::Sender;
use tokio::runtime::Handle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Socket,
    Serial,
}

impl TransportKind {
    pub fn label(&self) -> &'static str {
        match self {
            TransportKind::Socket => "WebSocket",
            TransportKind::Serial => "USB Serial",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelStatus {
    Connecting,
    Connected,
    Disconnected,
    /// Terminal failure, not retried
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Frame { source: TransportKind, payload: String },
    Status { source: TransportKind, status: ChannelStatus },
}

/// Frame handler registered by `connect`. Tags everything with its source.
#[derive(Clone)]
pub struct FrameSink {
    source: TransportKind,
    sender: Sender<TransportEvent>,
}

impl FrameSink {
    pub fn new(source: TransportKind, sender: Sender<TransportEvent>) -> Self {
        Self { source, sender }
    }

    pub fn frame(&self, payload: String) {
        let event = TransportEvent::Frame { source: self.source, payload };
        if let Err(why) = self.sender.send(event) {
            log::trace!("Could not deliver {} frame: {:?}", self.source.label(), why);
        }
    }

    pub fn status(&self, status: ChannelStatus) {
        let event = TransportEvent::Status { source: self.source, status };
        if let Err(why) = self.sender.send(event) {
            log::debug!("Could not deliver {} status: {:?}", self.source.label(), why);
        }
    }
}

pub trait TransportChannel: Send {
    fn kind(&self) -> TransportKind;

    /// Start delivering frames to `sink`. Long-running work is spawned on
    /// `runtime`; this returns once the channel is started.
    fn connect(&mut self, runtime: &Handle, sink: FrameSink) -> Result<(), TransportError>;

    /// Best-effort command. `Ok(false)` means dropped because the channel is
    /// not currently open.
    fn send(&self, command: &DeviceCommand) -> Result<bool, TransportError>;

    fn close(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_tags_events_with_source() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let sink = FrameSink::new(TransportKind::Serial, tx);

        sink.status(ChannelStatus::Connected);
        sink.frame("{}".to_string());

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                TransportEvent::Status { source: TransportKind::Serial, status: ChannelStatus::Connected },
                TransportEvent::Frame { source: TransportKind::Serial, payload: "{}".to_string() },
            ]
        );
    }

    #[test]
    fn test_sink_survives_closed_receiver() {
        let (tx, rx) = crossbeam_channel::unbounded();
        drop(rx);
        let sink = FrameSink::new(TransportKind::Socket, tx);
        sink.frame("{}".to_string());
        sink.status(ChannelStatus::Disconnected);
    }
}
