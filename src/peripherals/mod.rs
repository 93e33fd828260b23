//! # Peripheral Interfaces
//!
//! Seams between the pipeline and the driver layer. Register-level access to
//! the ADC, GPIO and I2C lives behind these traits; [`sim`] provides host-side
//! stand-ins.

pub mod sim;

use crate::error::Result;

/// One 12-bit ADC input wired to a joystick axis.
#[cfg_attr(test, mockall::automock)]
pub trait AnalogInput: Send {
    /// Latest conversion, 0-4095.
    fn read(&mut self) -> u16;
}

/// Raw 6-axis sample in sensor counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawImuReading {
    /// Accelerometer X/Y/Z counts (16384 per g)
    pub accel: [i16; 3],
    /// Gyroscope X/Y/Z counts (131 per deg/s)
    pub gyro: [i16; 3],
}

/// 6-axis inertial sensor (accelerometer + gyroscope).
#[cfg_attr(test, mockall::automock)]
pub trait InertialSensor: Send {
    fn read_raw(&mut self) -> Result<RawImuReading>;
}

/// GPIO interrupt controller for the button lines.
#[cfg_attr(test, mockall::automock)]
pub trait ButtonInterrupts: Send {
    /// Arm falling-edge notification on `pin`.
    fn enable_falling_edge(&mut self, pin: u32) -> Result<()>;
}
