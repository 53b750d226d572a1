//! # Sample Model Module
//!
//! Normalized sample for one telemetry tick and the outbound device command.
//!
//! ## Key Types
//! - `Sample`: field-sparse snapshot consumed by the dashboard
//! - `DeviceCommand`: outbound request sent back over the socket
//!
//! Every field is an `Option`: an absent key means "no update this tick",
//! never zero.

use serde::Serialize;

/// Below this raw amplitude the finger is off the sensor
pub const WAVEFORM_NOISE_FLOOR: f64 = 10_000.0;

/// Status text the firmware sends while locked onto a pulse
pub const STATUS_PULSE_ACQUIRED: &str = "Pulse Acquired";
/// Status text the firmware sends while searching
pub const STATUS_SEEKING_PULSE: &str = "Seeking Pulse";

/// One decoded telemetry update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sample {
    /// Raw pulse points in arrival order, unrounded
    pub waveform: Option<Vec<f64>>,
    pub heart_rate: Option<f64>,
    pub spo2: Option<f64>,
    pub hrv: Option<f64>,
    pub perfusion_index: Option<f64>,
    pub temperature: Option<f64>,
    pub confidence: Option<f64>,
    pub status: Option<String>,
    pub signal_strength: Option<i32>,
}

impl Sample {
    /// True when the frame carried none of the known keys
    pub fn is_empty(&self) -> bool {
        *self == Sample::default()
    }
}

/// Lowest and highest emission rate the firmware accepts
pub const MIN_FREQUENCY_HZ: u8 = 1;
pub const MAX_FREQUENCY_HZ: u8 = 100;

/// Requests sent from the dashboard to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DeviceCommand {
    SetFrequency {
        freq: u8,
    },
}

impl DeviceCommand {
    /// Frequency request, clamped to what the firmware accepts
    pub fn set_frequency(hz: u8) -> Self {
        DeviceCommand::SetFrequency {
            freq: hz.clamp(MIN_FREQUENCY_HZ, MAX_FREQUENCY_HZ),
        }
    }
}
