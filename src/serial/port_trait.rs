//! Transport abstraction between the packet aggregator and the serial link

use async_trait::async_trait;
use std::io;
use tracing::debug;

use crate::error::{MotionPadError, Result};

/// Byte-stream sink the aggregator writes packets to
#[async_trait]
pub trait Transport: Send {
    /// Write all data to the link
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush the output buffer
    async fn flush(&mut self) -> io::Result<()>;

    /// Write one complete packet and flush it
    ///
    /// # Errors
    ///
    /// Returns [`MotionPadError::Serial`] if the write or the flush fails
    async fn send_packet(&mut self, packet: &[u8]) -> Result<()> {
        self.write_all(packet)
            .await
            .map_err(|e| MotionPadError::Serial(format!("Failed to write packet: {}", e)))?;

        self.flush()
            .await
            .map_err(|e| MotionPadError::Serial(format!("Failed to flush serial port: {}", e)))?;

        debug!("Sent packet ({} bytes)", packet.len());
        Ok(())
    }
}
