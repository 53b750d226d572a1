//! # Connection Management Module
//!
//! Owns the transport channels and the async runtime they run on.
//! The UI thread never touches a channel directly; it sends
//! `ConnectionCommand`s and receives `TransportEvent`s.
//!
//! ## Key Components
//! - `ConnectionManager`: command loop running on a dedicated thread
//! - `ConnectionCommand`: requests sent from the UI thread
//!
//! The socket channel lives for the whole run and keeps reconnecting in the
//! background even while serial is active. At most one serial channel is
//! open at a time.

use crate::config::Config;
use crate::error::TransportError;
use crate::sample::DeviceCommand;
use crate::transport::serial::SerialChannel;
use crate::transport::socket::SocketChannel;
use crate::transport::{ChannelStatus, FrameSink, TransportChannel, TransportEvent, TransportKind};
use crossbeam_channel::{Receiver, Sender};
use tokio::runtime::Runtime;

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionCommand {
    /// Start the socket channel (no-op when already running)
    ConnectSocket,
    /// Open the named serial port and make it the active transport
    OpenSerial(String),
    /// Close the serial port; the socket becomes active again
    CloseSerial,
    /// Forward a command over the active transport
    Send(DeviceCommand),
}

/// Manages transport lifecycles on its own thread.
///
/// Runs a Tokio runtime so socket I/O and the blocking serial reader never
/// stall the UI thread.
pub struct ConnectionManager {
    command_receiver: Receiver<ConnectionCommand>,
    event_sender: Sender<TransportEvent>,
    device_host: String,
    serial_baud_rate: u32,
}

impl ConnectionManager {
    /// Creates a new ConnectionManager.
    ///
    /// Returns the manager and a sender for issuing commands from the UI thread.
    pub fn new(event_sender: Sender<TransportEvent>, config: &Config) -> (Self, Sender<ConnectionCommand>) {
        let (command_sender, command_receiver) = crossbeam_channel::unbounded();

        let manager = ConnectionManager {
            command_receiver,
            event_sender,
            device_host: config.device_host.clone(),
            serial_baud_rate: config.serial_baud_rate,
        };

        (manager, command_sender)
    }

    fn sink(&self, kind: TransportKind) -> FrameSink {
        FrameSink::new(kind, self.event_sender.clone())
    }

    /// Runs the command loop until every command sender is dropped.
    pub fn run(self) {
        let rt = match Runtime::new() {
            Ok(runtime) => runtime,
            Err(e) => {
                let error = TransportError::RuntimeCreation(e.to_string());
                log::error!("{}", error);
                self.sink(TransportKind::Socket).status(ChannelStatus::Failed(error.to_string()));
                return;
            }
        };

        let mut socket: Box<dyn TransportChannel> = Box::new(SocketChannel::new(self.device_host.clone()));
        let mut serial: Option<Box<dyn TransportChannel>> = None;

        while let Ok(command) = self.command_receiver.recv() {
            match command {
                ConnectionCommand::ConnectSocket => {
                    log::info!("Connection manager: starting socket channel for {}", self.device_host);
                    if let Err(e) = socket.connect(rt.handle(), self.sink(TransportKind::Socket)) {
                        log::error!("{}", e);
                        self.sink(TransportKind::Socket).status(ChannelStatus::Failed(e.to_string()));
                    }
                }
                ConnectionCommand::OpenSerial(port) => {
                    if let Some(mut previous) = serial.take() {
                        previous.close();
                    }

                    log::info!("Connection manager: opening serial port {}", port);
                    let mut channel: Box<dyn TransportChannel> =
                        Box::new(SerialChannel::new(port, self.serial_baud_rate));
                    match channel.connect(rt.handle(), self.sink(TransportKind::Serial)) {
                        Ok(()) => serial = Some(channel),
                        Err(e) => {
                            log::error!("{}", e);
                            self.sink(TransportKind::Serial).status(ChannelStatus::Failed(e.to_string()));
                        }
                    }
                }
                ConnectionCommand::CloseSerial => {
                    if let Some(mut channel) = serial.take() {
                        channel.close();
                    }
                }
                ConnectionCommand::Send(device_command) => {
                    let channel = serial.as_deref().unwrap_or(&*socket);
                    match channel.send(&device_command) {
                        Ok(true) => log::debug!("Sent {:?} over {}", device_command, channel.kind().label()),
                        Ok(false) => log::debug!("{} not open, dropped {:?}", channel.kind().label(), device_command),
                        Err(TransportError::Unsupported) => {
                            log::debug!("{} has no command path, ignoring {:?}", channel.kind().label(), device_command)
                        }
                        Err(e) => log::warn!("{}", e),
                    }
                }
            }
        }

        log::info!("Connection manager: command channel closed, shutting down");
        if let Some(mut channel) = serial.take() {
            channel.close();
        }
        socket.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_connection_manager_creation() {
        let (event_sender, _event_receiver) = crossbeam_channel::unbounded();
        let (_manager, command_sender) = ConnectionManager::new(event_sender, &Config::default());

        assert!(command_sender.send(ConnectionCommand::CloseSerial).is_ok());
    }

    #[test]
    fn test_serial_open_failure_is_reported() {
        let (event_sender, event_receiver) = crossbeam_channel::unbounded();
        let (manager, command_sender) = ConnectionManager::new(event_sender, &Config::default());
        let handle = std::thread::spawn(move || manager.run());

        command_sender
            .send(ConnectionCommand::OpenSerial("/dev/pulse-scope-missing-port".to_string()))
            .unwrap();
        // No socket running and no serial open: dropped quietly
        command_sender
            .send(ConnectionCommand::Send(DeviceCommand::set_frequency(20)))
            .unwrap();

        let event = event_receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("no failure reported");
        match event {
            TransportEvent::Status { source: TransportKind::Serial, status: ChannelStatus::Failed(reason) } => {
                assert!(reason.contains("/dev/pulse-scope-missing-port"));
            }
            other => panic!("unexpected event: {:?}", other),
        }

        drop(command_sender);
        handle.join().unwrap();
    }
}
