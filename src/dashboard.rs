//! # Dashboard Controller Module
//!
//! Owns everything the live view shows and decides which transport feeds it.
//!
//! ## Responsibilities
//! 1. Gate frames by the active transport (the mode flag) before any decode
//! 2. Decode accepted frames and fan each present field out to its series
//!    window and/or readout, independently of the other fields
//! 3. Track socket link, serial port and pulse status for the status bar
//! 4. Route user commands (connect, serial select, reset, frequency) to the
//!    connection thread
//!
//! All state here is touched only from the UI thread, one event at a time.

use crate::connection::ConnectionCommand;
use crate::decoder::decode_frame;
use crate::readout::{self, ConfidenceLevel, PLACEHOLDER};
use crate::sample::{DeviceCommand, Sample, STATUS_PULSE_ACQUIRED, STATUS_SEEKING_PULSE, WAVEFORM_NOISE_FLOOR};
use crate::timeseries::{ScalePolicy, SeriesWindow, SHORT_WINDOW_LEN};
use crate::transport::{ChannelStatus, TransportEvent, TransportKind};
use chrono::{DateTime, Local};
use crossbeam_channel::Sender;

/// Status bar state, driven only by the latest `status` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseState {
    Initializing,
    SeekingPulse,
    PulseAcquired,
    /// Any other status text the firmware sends
    Other,
}

impl PulseState {
    fn from_status(status: &str) -> Self {
        match status {
            STATUS_PULSE_ACQUIRED => PulseState::PulseAcquired,
            STATUS_SEEKING_PULSE => PulseState::SeekingPulse,
            _ => PulseState::Other,
        }
    }
}

/// Socket link indicator, independent of pulse status
#[derive(Debug, Clone, PartialEq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SerialState {
    Closed,
    Opening(String),
    Open(String),
    /// Open refused; not retried
    Failed(String),
}

/// Text shown in each numeric card
#[derive(Debug, Clone, PartialEq)]
pub struct Readouts {
    pub heart_rate: String,
    pub spo2: String,
    pub hrv: String,
    pub perfusion_index: String,
    pub temperature: String,
    pub confidence: String,
    pub confidence_level: Option<ConfidenceLevel>,
    pub status_text: String,
    pub signal_strength: Option<i32>,
}

impl Default for Readouts {
    fn default() -> Self {
        Self {
            heart_rate: PLACEHOLDER.to_string(),
            spo2: PLACEHOLDER.to_string(),
            hrv: PLACEHOLDER.to_string(),
            perfusion_index: PLACEHOLDER.to_string(),
            temperature: PLACEHOLDER.to_string(),
            confidence: PLACEHOLDER.to_string(),
            confidence_level: None,
            status_text: "Initializing...".to_string(),
            signal_strength: None,
        }
    }
}

/// Per-session state; recreated by `Dashboard::reset`
struct Session {
    waveform: SeriesWindow,
    heart_rate: SeriesWindow,
    spo2: SeriesWindow,
    readouts: Readouts,
    pulse_state: PulseState,
    frames_applied: u64,
    frames_dropped: u64,
    last_update: Option<DateTime<Local>>,
}

impl Session {
    fn new() -> Self {
        Self {
            waveform: SeriesWindow::waveform(WAVEFORM_NOISE_FLOOR)
                .with_suggested_range(80_000.0, 120_000.0),
            heart_rate: SeriesWindow::short_metric(),
            spo2: SeriesWindow::new(SHORT_WINDOW_LEN, ScalePolicy::Fixed)
                .with_suggested_range(90.0, 100.0),
            readouts: Readouts::default(),
            pulse_state: PulseState::Initializing,
            frames_applied: 0,
            frames_dropped: 0,
            last_update: None,
        }
    }
}

pub struct Dashboard {
    mode: TransportKind,
    link: LinkState,
    serial: SerialState,
    session: Session,
    /// Bumped by every reset
    session_id: u64,
    redraw_pending: bool,
    commands: Sender<ConnectionCommand>,
}

impl Dashboard {
    pub fn new(commands: Sender<ConnectionCommand>) -> Self {
        Self {
            mode: TransportKind::Socket,
            link: LinkState::Disconnected,
            serial: SerialState::Closed,
            session: Session::new(),
            session_id: 0,
            redraw_pending: false,
            commands,
        }
    }

    fn dispatch(&self, command: ConnectionCommand) {
        if let Err(e) = self.commands.send(command) {
            log::error!("Connection manager is gone, dropped {:?}", e.into_inner());
        }
    }

    pub fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Frame { source, payload } => {
                // Stale frames from the inactive transport never touch state
                if source != self.mode {
                    log::trace!("Ignoring {} frame while on {}", source.label(), self.mode.label());
                    return;
                }
                match decode_frame(&payload) {
                    Some(sample) => {
                        self.apply_sample(sample);
                        self.session.frames_applied += 1;
                    }
                    None => self.session.frames_dropped += 1,
                }
            }
            TransportEvent::Status { source: TransportKind::Socket, status } => {
                self.link = match status {
                    ChannelStatus::Connecting => LinkState::Connecting,
                    ChannelStatus::Connected => LinkState::Connected,
                    ChannelStatus::Disconnected => LinkState::Disconnected,
                    ChannelStatus::Failed(reason) => LinkState::Failed(reason),
                };
            }
            TransportEvent::Status { source: TransportKind::Serial, status } => {
                self.handle_serial_status(status);
            }
        }
    }

    fn handle_serial_status(&mut self, status: ChannelStatus) {
        match status {
            ChannelStatus::Connected => {
                // Only the open we asked for; a late one after reset is ignored
                if let SerialState::Opening(port) = &self.serial {
                    log::info!("Serial port {} open, socket frames suppressed", port);
                    self.serial = SerialState::Open(port.clone());
                    self.mode = TransportKind::Serial;
                }
            }
            ChannelStatus::Failed(reason) => {
                if matches!(self.serial, SerialState::Opening(_)) {
                    log::warn!("Serial unavailable, staying on WebSocket: {}", reason);
                    self.serial = SerialState::Failed(reason);
                }
            }
            ChannelStatus::Disconnected => {
                if matches!(self.serial, SerialState::Open(_)) {
                    log::info!("Serial stream ended");
                    self.serial = SerialState::Closed;
                }
            }
            ChannelStatus::Connecting => {}
        }
    }

    /// Apply one decoded sample. Each present field updates on its own.
    pub fn apply_sample(&mut self, sample: Sample) {
        let session = &mut self.session;
        let mut redraw = false;

        if let Some(points) = sample.waveform {
            for point in points {
                redraw |= session.waveform.push(point);
            }
        }
        if let Some(bpm) = sample.heart_rate {
            session.readouts.heart_rate = readout::heart_rate(bpm);
            if bpm > 0.0 {
                redraw |= session.heart_rate.push(bpm);
            }
        }
        if let Some(spo2) = sample.spo2 {
            session.readouts.spo2 = readout::spo2(spo2);
            if spo2 > 0.0 {
                redraw |= session.spo2.push(spo2);
            }
        }
        if let Some(hrv) = sample.hrv {
            session.readouts.hrv = readout::hrv(hrv);
        }
        if let Some(pi) = sample.perfusion_index {
            session.readouts.perfusion_index = readout::perfusion_index(pi);
        }
        if let Some(temp) = sample.temperature {
            session.readouts.temperature = readout::temperature(temp);
        }
        if let Some(status) = sample.status {
            session.pulse_state = PulseState::from_status(&status);
            session.readouts.status_text = status;
        }
        if let Some(rssi) = sample.signal_strength {
            session.readouts.signal_strength = Some(rssi);
        }
        if let Some(conf) = sample.confidence {
            session.readouts.confidence = readout::confidence(conf);
            session.readouts.confidence_level = Some(ConfidenceLevel::classify(conf));
        }

        session.last_update = Some(Local::now());
        self.redraw_pending |= redraw;
    }

    pub fn connect_socket(&self) {
        self.dispatch(ConnectionCommand::ConnectSocket);
    }

    /// Ask for `port`; the mode flips to serial once the port reports open
    pub fn select_serial(&mut self, port: String) {
        if matches!(self.serial, SerialState::Open(_) | SerialState::Opening(_)) {
            log::debug!("Serial already selected, reset first");
            return;
        }
        self.serial = SerialState::Opening(port.clone());
        self.dispatch(ConnectionCommand::OpenSerial(port));
    }

    /// Request a new emission rate. Returns false when the active transport
    /// has no command path.
    pub fn set_frequency(&self, hz: u8) -> bool {
        if self.mode == TransportKind::Serial {
            log::debug!("Frequency control unavailable over serial");
            return false;
        }
        self.dispatch(ConnectionCommand::Send(DeviceCommand::set_frequency(hz)));
        true
    }

    /// Close serial and start a fresh session on the socket
    pub fn reset(&mut self) {
        if !matches!(self.serial, SerialState::Closed | SerialState::Failed(_)) {
            self.dispatch(ConnectionCommand::CloseSerial);
        }
        self.serial = SerialState::Closed;
        self.mode = TransportKind::Socket;
        self.session = Session::new();
        self.session_id += 1;
        self.redraw_pending = true;
        log::info!("Dashboard reset, back on WebSocket");
    }

    /// Returns and clears the pending redraw signal
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.redraw_pending)
    }

    pub fn session(&self) -> u64 {
        self.session_id
    }

    pub fn mode(&self) -> TransportKind {
        self.mode
    }

    pub fn link(&self) -> &LinkState {
        &self.link
    }

    pub fn serial(&self) -> &SerialState {
        &self.serial
    }

    pub fn pulse_state(&self) -> PulseState {
        self.session.pulse_state
    }

    pub fn readouts(&self) -> &Readouts {
        &self.session.readouts
    }

    pub fn waveform(&self) -> &SeriesWindow {
        &self.session.waveform
    }

    pub fn heart_rate(&self) -> &SeriesWindow {
        &self.session.heart_rate
    }

    pub fn spo2(&self) -> &SeriesWindow {
        &self.session.spo2
    }

    pub fn frames_applied(&self) -> u64 {
        self.session.frames_applied
    }

    pub fn frames_dropped(&self) -> u64 {
        self.session.frames_dropped
    }

    pub fn last_update(&self) -> Option<DateTime<Local>> {
        self.session.last_update
    }
}
