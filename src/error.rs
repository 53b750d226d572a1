//! # Error Types Module
//!
//! Centralized error handling for the pulse-scope application.
//! Provides custom error types for each module with proper context and error chaining.
//!
//! ## Error Types
//! - `TransportError`: Socket/serial channel and runtime failures
//! - `ConfigError`: Configuration file I/O and parsing errors
//! - `ScanError`: Serial port enumeration errors
//!
//! ## Usage Examples
//! ```rust
//! // Config module uses ConfigError
//! pub fn load() -> Result<Config, ConfigError> { ... }
//!
//! // Transport channels use TransportError
//! fn connect(&mut self, runtime: &Handle, sink: FrameSink) -> Result<(), TransportError> { ... }
//!
//! // Scanner module uses ScanError
//! pub async fn scan_ports() -> Result<Vec<SerialPortEntry>, ScanError> { ... }
//! ```
//!
//! Malformed frames are deliberately absent from this taxonomy: the decoder
//! drops them and returns `None`.

use std::fmt;

/// Errors that can occur while running a transport channel
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Failed to create Tokio runtime
    RuntimeCreation(String),
    /// Serial port could not be opened (missing, busy or permission denied)
    SerialUnavailable { port: String, reason: String },
    /// A single WebSocket connect attempt failed
    SocketConnect { endpoint: String, reason: String },
    /// The channel has no command path
    Unsupported,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::RuntimeCreation(msg) => {
                write!(f, "Failed to create async runtime: {}", msg)
            }
            TransportError::SerialUnavailable { port, reason } => {
                write!(f, "Serial port {} unavailable: {}", port, reason)
            }
            TransportError::SocketConnect { endpoint, reason } => {
                write!(f, "Failed to connect to {}: {}", endpoint, reason)
            }
            TransportError::Unsupported => {
                write!(f, "Commands are not supported on this transport")
            }
        }
    }
}

impl std::error::Error for TransportError {}

/// Errors that can occur during configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read config file
    ReadFailed(std::io::Error),
    /// Failed to write config file
    WriteFailed(std::io::Error),
    /// Failed to parse config file
    ParseFailed(toml::de::Error),
    /// Failed to serialize config
    SerializeFailed(toml::ser::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ReadFailed(e) => {
                write!(f, "Failed to read config file: {}", e)
            }
            ConfigError::WriteFailed(e) => {
                write!(f, "Failed to write config file: {}", e)
            }
            ConfigError::ParseFailed(e) => {
                write!(f, "Failed to parse config file: {}", e)
            }
            ConfigError::SerializeFailed(e) => {
                write!(f, "Failed to serialize config: {}", e)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadFailed(e) => Some(e),
            ConfigError::WriteFailed(e) => Some(e),
            ConfigError::ParseFailed(e) => Some(e),
            ConfigError::SerializeFailed(e) => Some(e),
        }
    }
}

/// Errors that can occur while listing serial ports
#[derive(Debug, Clone)]
pub enum ScanError {
    /// The platform refused to enumerate ports
    Enumerate(String),
    /// Enumeration worked but nothing is attached
    NoPorts,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::Enumerate(msg) => {
                write!(f, "Serial ports unavailable: {}", msg)
            }
            ScanError::NoPorts => {
                write!(f, "No serial ports found. Plug in the device over USB.")
            }
        }
    }
}

impl std::error::Error for ScanError {}
