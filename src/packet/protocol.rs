//! # Packet Protocol Constants and Types
//!
//! Core definitions for the controller-to-host wire format and for the values
//! flowing through the pipeline channels.

use crate::error::{MotionPadError, Result};

/// Terminator byte closing every packet
pub const PACKET_TERMINATOR: u8 = 0xFF;

/// Simple packet size: id + value low + value high + terminator
pub const SIMPLE_PACKET_LEN: usize = 4;

/// Combined packet size: aim(3) + movement(2) + action(1) + terminator
pub const COMBINED_PACKET_LEN: usize = 7;

/// Id byte marking a simple packet that carries an action code
pub const ACTION_PACKET_ID: u8 = 0x02;

/// Which packet layout the stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketShape {
    /// 4-byte movement/action packets
    Simple,
    /// 7-byte aim + movement + action packets
    Combined,
}

impl PacketShape {
    /// Packet length for this shape
    pub fn packet_len(&self) -> usize {
        match self {
            PacketShape::Simple => SIMPLE_PACKET_LEN,
            PacketShape::Combined => COMBINED_PACKET_LEN,
        }
    }
}

/// One of the four physical buttons on the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonId {
    PrimaryFire,
    SecondaryFire,
    Interact,
    Jump,
}

impl ButtonId {
    /// All buttons, in wire-code order.
    pub const ALL: [ButtonId; 4] = [
        ButtonId::PrimaryFire,
        ButtonId::SecondaryFire,
        ButtonId::Interact,
        ButtonId::Jump,
    ];
}

/// Action code carried on the wire.
///
/// Derived 1:1 from [`ButtonId`]; [`ActionCode::None`] when no press is pending.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ActionCode {
    #[default]
    None = 0,
    PrimaryFire = 1,
    SecondaryFire = 2,
    Interact = 3,
    Jump = 4,
}

impl From<ButtonId> for ActionCode {
    fn from(button: ButtonId) -> Self {
        match button {
            ButtonId::PrimaryFire => ActionCode::PrimaryFire,
            ButtonId::SecondaryFire => ActionCode::SecondaryFire,
            ButtonId::Interact => ActionCode::Interact,
            ButtonId::Jump => ActionCode::Jump,
        }
    }
}

impl From<Option<ButtonId>> for ActionCode {
    fn from(button: Option<ButtonId>) -> Self {
        button.map_or(ActionCode::None, ActionCode::from)
    }
}

impl TryFrom<u8> for ActionCode {
    type Error = MotionPadError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(ActionCode::None),
            1 => Ok(ActionCode::PrimaryFire),
            2 => Ok(ActionCode::SecondaryFire),
            3 => Ok(ActionCode::Interact),
            4 => Ok(ActionCode::Jump),
            other => Err(MotionPadError::Protocol(format!(
                "Invalid action code: {}",
                other
            ))),
        }
    }
}

/// Joystick axis. Shares wire ids with [`OrientationAxis`] (0 = X/Pitch, 1 = Y/Roll).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X = 0,
    Y = 1,
}

impl TryFrom<u8> for Axis {
    type Error = MotionPadError;

    fn try_from(id: u8) -> Result<Self> {
        match id {
            0 => Ok(Axis::X),
            1 => Ok(Axis::Y),
            other => Err(MotionPadError::Protocol(format!(
                "Invalid axis id: {}",
                other
            ))),
        }
    }
}

/// Tri-state joystick classification.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    Centered = 0,
    Positive = 1,
    Negative = 2,
}

impl TryFrom<u8> for Direction {
    type Error = MotionPadError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Direction::Centered),
            1 => Ok(Direction::Positive),
            2 => Ok(Direction::Negative),
            other => Err(MotionPadError::Protocol(format!(
                "Invalid direction code: {}",
                other
            ))),
        }
    }
}

/// Value of one joystick sample, depending on the active filter policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisValue {
    /// Smoothed signed magnitude (moving-average policy)
    Magnitude(i16),
    /// Instantaneous classification (classification policy)
    Direction(Direction),
}

impl AxisValue {
    /// 16-bit value used by the simple packet shape.
    pub fn wide(&self) -> i16 {
        match *self {
            AxisValue::Magnitude(m) => m,
            AxisValue::Direction(d) => d as i16,
        }
    }

    /// Single-byte value used by the combined packet shape.
    ///
    /// Magnitudes are clamped to the `i8` range and sent as two's complement.
    pub fn narrow(&self) -> u8 {
        match *self {
            AxisValue::Magnitude(m) => m.clamp(i8::MIN as i16, i8::MAX as i16) as i8 as u8,
            AxisValue::Direction(d) => d as u8,
        }
    }
}

/// Joystick sample produced by an axis sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisSample {
    pub axis: Axis,
    pub value: AxisValue,
}

/// Orientation axis emitted by the orientation sampler. Yaw is never emitted.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrientationAxis {
    Pitch = 0,
    Roll = 1,
}

impl TryFrom<u8> for OrientationAxis {
    type Error = MotionPadError;

    fn try_from(id: u8) -> Result<Self> {
        match id {
            0 => Ok(OrientationAxis::Pitch),
            1 => Ok(OrientationAxis::Roll),
            other => Err(MotionPadError::Protocol(format!(
                "Invalid orientation axis id: {}",
                other
            ))),
        }
    }
}

/// One fused orientation angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationSample {
    pub axis: OrientationAxis,
    /// Angle in degrees
    pub angle_degrees: f32,
}

/// An outbound packet, before serialization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Packet {
    /// 4-byte movement packet (simple shape)
    Movement(AxisSample),
    /// 4-byte action packet (simple shape)
    Action(ActionCode),
    /// 7-byte aim + movement + action packet (combined shape)
    Combined {
        aim: OrientationSample,
        movement: AxisSample,
        action: ActionCode,
    },
}

impl Packet {
    /// Layout this packet is sent in
    pub fn shape(&self) -> PacketShape {
        match self {
            Packet::Movement(_) | Packet::Action(_) => PacketShape::Simple,
            Packet::Combined { .. } => PacketShape::Combined,
        }
    }

    /// Serialized length of this packet
    pub fn wire_len(&self) -> usize {
        self.shape().packet_len()
    }
}

/// A packet as seen by the host after decoding.
///
/// Unlike [`Packet`], the movement byte of a combined frame is kept raw since
/// the host cannot tell a classification from a clamped magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    Movement {
        axis: Axis,
        value: i16,
    },
    Action(ActionCode),
    Combined {
        aim_axis: OrientationAxis,
        aim_value: i16,
        movement_axis: Axis,
        movement_value: u8,
        action: ActionCode,
    },
}

impl Frame {
    /// Aim angle in the controller's convention (the wire value is negated).
    pub fn aim_degrees(&self) -> Option<i16> {
        match *self {
            Frame::Combined { aim_value, .. } => Some(aim_value.wrapping_neg()),
            _ => None,
        }
    }

    /// Movement byte of a combined frame read as a classification.
    pub fn movement_direction(&self) -> Option<Direction> {
        match *self {
            Frame::Combined { movement_value, .. } => Direction::try_from(movement_value).ok(),
            _ => None,
        }
    }

    /// Action carried by this frame, if any.
    pub fn action(&self) -> Option<ActionCode> {
        match *self {
            Frame::Action(action) | Frame::Combined { action, .. } => Some(action),
            Frame::Movement { .. } => None,
        }
    }
}
