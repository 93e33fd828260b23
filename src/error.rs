//! # Error Types
//!
//! Custom error types for Motionpad using `thiserror`.

use thiserror::Error;

/// Main error type for Motionpad
#[derive(Debug, Error)]
pub enum MotionPadError {
    /// Wire packet errors (malformed frames, out-of-range fields)
    #[error("Packet protocol error: {0}")]
    Protocol(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// Startup resource failures (missing peripheral, unusable channel)
    #[error("Initialization failed: {0}")]
    Init(String),

    /// Sensor read failures
    #[error("Sensor error: {0}")]
    Sensor(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Statistics serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Motionpad
pub type Result<T> = std::result::Result<T, MotionPadError>;
