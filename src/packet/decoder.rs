//! # Packet Decoder
//!
//! Host-side decoding of the controller byte stream.
//!
//! Packets carry no length or checksum, only a trailing 0xFF. The stream
//! decoder therefore validates every field range before accepting a frame and
//! slides forward one byte at a time until the stream lines up again.

use bytes::{Buf, BytesMut};
use tracing::trace;

use super::protocol::*;
use crate::error::{MotionPadError, Result};

/// Decode one complete packet
///
/// # Errors
///
/// Returns error if:
/// - The slice length does not match the shape
/// - The terminator is missing
/// - An id, action code or axis is out of range
pub fn decode_frame(shape: PacketShape, frame: &[u8]) -> Result<Frame> {
    if frame.len() != shape.packet_len() {
        return Err(MotionPadError::Protocol(format!(
            "Frame length mismatch: expected {} bytes, got {}",
            shape.packet_len(),
            frame.len()
        )));
    }

    if frame[frame.len() - 1] != PACKET_TERMINATOR {
        return Err(MotionPadError::Protocol(format!(
            "Invalid terminator: 0x{:02X}",
            frame[frame.len() - 1]
        )));
    }

    match shape {
        PacketShape::Simple => decode_simple(frame),
        PacketShape::Combined => decode_combined(frame),
    }
}

fn decode_simple(frame: &[u8]) -> Result<Frame> {
    let value = i16::from_le_bytes([frame[1], frame[2]]);

    if frame[0] == ACTION_PACKET_ID {
        let code = u8::try_from(value).map_err(|_| {
            MotionPadError::Protocol(format!("Action value out of range: {}", value))
        })?;
        return Ok(Frame::Action(ActionCode::try_from(code)?));
    }

    Ok(Frame::Movement {
        axis: Axis::try_from(frame[0])?,
        value,
    })
}

fn decode_combined(frame: &[u8]) -> Result<Frame> {
    Ok(Frame::Combined {
        aim_axis: OrientationAxis::try_from(frame[0])?,
        aim_value: i16::from_le_bytes([frame[1], frame[2]]),
        movement_axis: Axis::try_from(frame[3])?,
        movement_value: frame[4],
        action: ActionCode::try_from(frame[5])?,
    })
}

/// Streaming decoder for a serial byte stream.
///
/// # Examples
///
/// ```
/// use motionpad::packet::decoder::PacketDecoder;
/// use motionpad::packet::protocol::{Axis, Frame, PacketShape};
///
/// let mut decoder = PacketDecoder::new(PacketShape::Simple);
/// let frames = decoder.push(&[0x00, 0x2C, 0x01, 0xFF]);
/// assert_eq!(frames, vec![Frame::Movement { axis: Axis::X, value: 300 }]);
/// ```
#[derive(Debug)]
pub struct PacketDecoder {
    shape: PacketShape,
    buffer: BytesMut,
    skipped: u64,
}

impl PacketDecoder {
    pub fn new(shape: PacketShape) -> Self {
        Self {
            shape,
            buffer: BytesMut::with_capacity(shape.packet_len() * 8),
            skipped: 0,
        }
    }

    /// Feed received bytes, returning every frame completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(bytes);

        let len = self.shape.packet_len();
        let mut frames = Vec::new();

        while self.buffer.len() >= len {
            match decode_frame(self.shape, &self.buffer[..len]) {
                Ok(frame) => {
                    self.buffer.advance(len);
                    frames.push(frame);
                }
                Err(e) => {
                    trace!("Resyncing packet stream: {}", e);
                    self.buffer.advance(1);
                    self.skipped += 1;
                }
            }
        }

        frames
    }

    /// Bytes discarded while resynchronizing.
    pub fn skipped_bytes(&self) -> u64 {
        self.skipped
    }

    /// Bytes buffered waiting for the rest of a frame.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }
}
