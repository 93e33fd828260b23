//! # Serial Communication Module
//!
//! Handles the serial link from the controller to the host.
//!
//! This module handles:
//! - Opening the configured serial port (8N1, no flow control)
//! - Falling back to common USB serial device paths when no port is set
//! - Writing framed packets through the [`Transport`] trait

pub mod port_trait;

pub use port_trait::Transport;

use crate::config::SerialConfig;
use crate::error::{MotionPadError, Result};
use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

/// Default link baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Device paths tried when no port is configured (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB-to-serial adapters
    "/dev/ttyACM0", // USB CDC devices
];

/// Serial link to the host
pub struct ControllerSerial {
    port: tokio_serial::SerialStream,
    device_path: String,
}

impl std::fmt::Debug for ControllerSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl ControllerSerial {
    /// Open the link described by the `[serial]` config section
    ///
    /// An empty `port` auto-detects among the default device paths.
    ///
    /// # Errors
    ///
    /// Returns [`MotionPadError::SerialPortNotFound`] if no candidate path opens
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use motionpad::config::Config;
    /// use motionpad::serial::ControllerSerial;
    ///
    /// let config = Config::default();
    /// let serial = ControllerSerial::open(&config.serial)?;
    /// println!("Connected to: {}", serial.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.timeout_ms);
        if config.port.is_empty() {
            Self::open_with_paths(DEFAULT_DEVICE_PATHS, config.baud_rate, timeout)
        } else {
            Self::open_with_paths(&[config.port.as_str()], config.baud_rate, timeout)
        }
    }

    /// Open the first path in `paths` that succeeds
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyUSB0"])
    /// * `baud_rate` - Link speed
    /// * `timeout` - Per-operation port timeout
    pub fn open_with_paths(paths: &[&str], baud_rate: u32, timeout: Duration) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate, timeout) {
                Ok(port) => {
                    info!("Opened serial link at {} ({} baud)", path, baud_rate);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(MotionPadError::SerialPortNotFound(paths.join(", ")))
    }

    fn open_port(
        path: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<tokio_serial::SerialStream> {
        tokio_serial::new(path, baud_rate)
            .timeout(timeout)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| MotionPadError::Serial(format!("Failed to open {}: {}", path, e)))
    }

    /// Path of the device that was opened
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

#[async_trait]
impl Transport for ControllerSerial {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.port.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(100);

    #[test]
    fn test_constants() {
        assert_eq!(DEFAULT_BAUD_RATE, 115_200);
        assert_eq!(DEFAULT_DEVICE_PATHS.len(), 2);
        assert_eq!(DEFAULT_DEVICE_PATHS[0], "/dev/ttyUSB0");
        assert_eq!(DEFAULT_DEVICE_PATHS[1], "/dev/ttyACM0");
    }

    #[test]
    fn test_open_with_invalid_paths_returns_error() {
        let invalid_paths = &["/dev/nonexistent0", "/dev/nonexistent1"];
        let result = ControllerSerial::open_with_paths(invalid_paths, DEFAULT_BAUD_RATE, TIMEOUT);

        match result.unwrap_err() {
            MotionPadError::SerialPortNotFound(msg) => {
                assert!(msg.contains("/dev/nonexistent0"));
                assert!(msg.contains("/dev/nonexistent1"));
            }
            other => panic!("Expected SerialPortNotFound error, got: {:?}", other),
        }
    }

    #[test]
    fn test_open_with_empty_paths_returns_error() {
        let empty_paths: &[&str] = &[];
        match ControllerSerial::open_with_paths(empty_paths, DEFAULT_BAUD_RATE, TIMEOUT) {
            Err(MotionPadError::SerialPortNotFound(_)) => {}
            other => panic!("Expected SerialPortNotFound, got: {:?}", other),
        }
    }

    #[test]
    fn test_open_port_with_invalid_path_returns_error() {
        let result =
            ControllerSerial::open_port("/dev/nonexistent_serial_device_12345", DEFAULT_BAUD_RATE, TIMEOUT);

        match result.unwrap_err() {
            MotionPadError::Serial(msg) => {
                assert!(msg.contains("/dev/nonexistent_serial_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    #[test]
    fn test_open_uses_configured_port() {
        let config = SerialConfig {
            port: "/dev/nonexistent_configured".to_string(),
            ..SerialConfig::default()
        };

        match ControllerSerial::open(&config) {
            Err(MotionPadError::SerialPortNotFound(msg)) => {
                assert_eq!(msg, "/dev/nonexistent_configured");
            }
            other => panic!("Expected SerialPortNotFound, got: {:?}", other),
        }
    }

    // Requires a USB serial adapter
    #[tokio::test]
    #[ignore] // Run with: cargo test -- --ignored
    async fn test_send_packet_with_real_hardware() {
        let config = SerialConfig {
            port: String::new(),
            ..SerialConfig::default()
        };

        if let Ok(mut serial) = ControllerSerial::open(&config) {
            let send_result = serial.send_packet(&[0x02, 0x00, 0x00, 0xFF]).await;
            assert!(send_result.is_ok(), "Failed to send packet: {:?}", send_result);
        } else {
            println!("No serial hardware detected (skipping send test)");
        }
    }
}
