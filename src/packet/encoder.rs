//! # Packet Encoder
//!
//! Serializes pipeline values into the fixed-size wire packets.
//!
//! ```text
//! Simple:   [id, value_lo, value_hi, 0xFF]
//! Combined: [aim_axis, aim_lo, aim_hi, move_axis, move_value, action, 0xFF]
//! ```
//!
//! 0xFF inside a payload field is not escaped.

use super::protocol::*;

/// Encode any packet into its wire bytes
///
/// # Examples
///
/// ```
/// use motionpad::packet::encoder::encode_packet;
/// use motionpad::packet::protocol::{Axis, AxisSample, AxisValue, Packet};
///
/// let packet = Packet::Movement(AxisSample { axis: Axis::X, value: AxisValue::Magnitude(300) });
/// assert_eq!(encode_packet(&packet), vec![0x00, 0x2C, 0x01, 0xFF]);
/// ```
pub fn encode_packet(packet: &Packet) -> Vec<u8> {
    match packet {
        Packet::Movement(sample) => encode_movement_packet(sample).to_vec(),
        Packet::Action(action) => encode_action_packet(*action).to_vec(),
        Packet::Combined {
            aim,
            movement,
            action,
        } => encode_combined_packet(aim, movement, *action).to_vec(),
    }
}

/// Encode a movement sample into a 4-byte simple packet
///
/// The value is the 16-bit signed quantity split into low and high bytes.
pub fn encode_movement_packet(sample: &AxisSample) -> [u8; SIMPLE_PACKET_LEN] {
    let [lo, hi] = sample.value.wide().to_le_bytes();
    [sample.axis as u8, lo, hi, PACKET_TERMINATOR]
}

/// Encode an action code into a 4-byte simple packet
pub fn encode_action_packet(action: ActionCode) -> [u8; SIMPLE_PACKET_LEN] {
    let [lo, hi] = (action as i16).to_le_bytes();
    [ACTION_PACKET_ID, lo, hi, PACKET_TERMINATOR]
}

/// Encode aim, movement and action into a 7-byte combined packet
pub fn encode_combined_packet(
    aim: &OrientationSample,
    movement: &AxisSample,
    action: ActionCode,
) -> [u8; COMBINED_PACKET_LEN] {
    let [aim_lo, aim_hi] = aim_wire_value(aim.angle_degrees).to_le_bytes();
    [
        aim.axis as u8,
        aim_lo,
        aim_hi,
        movement.axis as u8,
        movement.value.narrow(),
        action as u8,
        PACKET_TERMINATOR,
    ]
}

/// Convert an orientation angle to its on-wire aim value
///
/// The angle is negated for the receiving convention, truncated toward zero,
/// then truncated to 16 bits.
pub fn aim_wire_value(angle_degrees: f32) -> i16 {
    (-angle_degrees) as i32 as i16
}
