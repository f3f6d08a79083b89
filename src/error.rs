//! # Error Types
//!
//! Custom error types for DualStick using `thiserror`.
//!
//! Only the collaborators (input device, serial port, config, telemetry files)
//! can fail. Calibration and command mapping degrade to neutral values instead.

use thiserror::Error;

/// Main error type for DualStick
#[derive(Debug, Error)]
pub enum DualStickError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Input device errors (open, read, disconnect)
    #[error("Controller error: {0}")]
    Controller(String),

    /// No supported gamepad was found
    #[error("No supported controller found")]
    ControllerNotFound,

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial ports could be opened
    #[error("Serial port not found (tried: {0})")]
    SerialPortNotFound(String),

    /// Telemetry log errors
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for DualStick
pub type Result<T> = std::result::Result<T, DualStickError>;
