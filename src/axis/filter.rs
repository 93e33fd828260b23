//! # Axis Filtering
//!
//! Converts raw joystick ADC readings into signed, deadzoned values.
//!
//! ## Scaling
//!
//! The ADC is 12-bit (0-4095) with the stick resting near 2048. A reading is
//! recentered by subtracting 2048 and divided by 14 using integer division,
//! which truncates toward zero. Full deflection lands at roughly ±146.
//!
//! ## Deadzone
//!
//! Scaled values strictly inside ±30 count as no motion. The threshold is
//! inclusive: exactly 30 or −30 is motion.
//!
//! ## Usage
//!
//! ```
//! use motionpad::axis::filter::{classify, scale_reading, MovingAverage};
//! use motionpad::packet::protocol::Direction;
//!
//! assert_eq!(scale_reading(2048), 0);
//! assert_eq!(classify(scale_reading(4095)), Direction::Positive);
//!
//! let mut average = MovingAverage::new();
//! for v in [10, 20, 30, 40, 50] {
//!     average.push(v);
//! }
//! assert_eq!(average.value(), 30);
//! ```

use crate::packet::protocol::Direction;

/// Largest 12-bit ADC reading.
pub const ADC_MAX: u16 = 4095;

/// ADC reading at rest.
pub const ADC_CENTER: i32 = 2048;

/// Divisor mapping full deflection to roughly ±140.
pub const SCALE_DIVISOR: i32 = 14;

/// Deadzone half-width in scaled units.
pub const DEADZONE: i32 = 30;

/// Moving-average window length.
pub const AVERAGE_WINDOW: usize = 5;

/// Recenter and scale a raw reading. Readings above [`ADC_MAX`] are clamped.
#[inline]
pub fn scale_reading(raw: u16) -> i32 {
    (raw.min(ADC_MAX) as i32 - ADC_CENTER) / SCALE_DIVISOR
}

/// Whether a scaled value lies outside the deadzone.
#[inline]
pub fn outside_deadzone(scaled: i32) -> bool {
    scaled >= DEADZONE || scaled <= -DEADZONE
}

/// Tri-state classification of a scaled value.
pub fn classify(scaled: i32) -> Direction {
    if scaled >= DEADZONE {
        Direction::Positive
    } else if scaled <= -DEADZONE {
        Direction::Negative
    } else {
        Direction::Centered
    }
}

/// Ring of the last [`AVERAGE_WINDOW`] scaled readings.
///
/// Starts filled with zeros, so the first few averages are pulled toward center.
#[derive(Debug, Clone, Default)]
pub struct MovingAverage {
    window: [i32; AVERAGE_WINDOW],
    next: usize,
}

impl MovingAverage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reading and return the new average.
    pub fn push(&mut self, scaled: i32) -> i32 {
        self.window[self.next] = scaled;
        self.next = (self.next + 1) % AVERAGE_WINDOW;
        self.value()
    }

    /// Truncated integer average of the window.
    pub fn value(&self) -> i32 {
        self.window.iter().sum::<i32>() / AVERAGE_WINDOW as i32
    }
}
