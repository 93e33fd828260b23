//! # Simulated Peripherals
//!
//! Host-side stand-ins for the driver layer, so the whole pipeline can run on
//! a desktop against a real serial link.

use std::f32::consts::TAU;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info};

use super::{AnalogInput, ButtonInterrupts, InertialSensor, RawImuReading};
use crate::error::{MotionPadError, Result};
use crate::input::capture::{Edge, InputCapture};
use crate::orientation::sampler::{ACCEL_COUNTS_PER_G, GYRO_COUNTS_PER_DPS};

/// Joystick axis sweeping a sine wave around the ADC center.
///
/// Each read advances the phase by one step. Different ADC channels start at
/// different phases so X and Y do not move in lockstep.
#[derive(Debug, Clone)]
pub struct SimulatedJoystick {
    phase: f32,
    step: f32,
    amplitude: f32,
}

impl SimulatedJoystick {
    /// # Arguments
    ///
    /// * `channel` - ADC channel, used only to offset the starting phase
    /// * `reads_per_cycle` - Reads for one full sweep
    pub fn new(channel: u8, reads_per_cycle: u32) -> Self {
        Self {
            phase: f32::from(channel) * TAU / 4.0,
            step: TAU / reads_per_cycle.max(1) as f32,
            amplitude: 2000.0,
        }
    }
}

impl AnalogInput for SimulatedJoystick {
    fn read(&mut self) -> u16 {
        let value = 2048.0 + self.amplitude * self.phase.sin();
        self.phase = (self.phase + self.step) % TAU;
        value.round().clamp(0.0, 4095.0) as u16
    }
}

/// IMU rocking slowly in roll and, at half the rate, in pitch.
#[derive(Debug, Clone)]
pub struct SimulatedImu {
    t: f32,
    dt: f32,
    roll_amplitude: f32,
    frequency_hz: f32,
}

impl SimulatedImu {
    /// `period` must match the sampler period for the gyro rates to agree
    /// with the accelerometer.
    pub fn new(period: Duration) -> Self {
        Self {
            t: 0.0,
            dt: period.as_secs_f32(),
            roll_amplitude: 30.0,
            frequency_hz: 0.25,
        }
    }

    fn angles_at(&self, t: f32) -> (f32, f32) {
        let w = TAU * self.frequency_hz;
        let roll = self.roll_amplitude * (w * t).sin();
        let pitch = 0.5 * self.roll_amplitude * (0.5 * w * t).sin();
        (pitch, roll)
    }
}

impl InertialSensor for SimulatedImu {
    fn read_raw(&mut self) -> Result<RawImuReading> {
        let (pitch, roll) = self.angles_at(self.t);
        let (next_pitch, next_roll) = self.angles_at(self.t + self.dt);
        self.t += self.dt;

        let (p, r) = (pitch.to_radians(), roll.to_radians());
        let accel = [-p.sin(), r.sin() * p.cos(), r.cos() * p.cos()]
            .map(|g| (g * ACCEL_COUNTS_PER_G).round().clamp(-32768.0, 32767.0) as i16);

        let rate = |from: f32, to: f32| ((to - from) / self.dt * GYRO_COUNTS_PER_DPS) as i16;
        let gyro = [rate(roll, next_roll), rate(pitch, next_pitch), 0];

        Ok(RawImuReading { accel, gyro })
    }
}

/// Interrupt controller that records which pins were armed.
#[derive(Debug, Clone, Default)]
pub struct SimulatedButtons {
    armed: Arc<Mutex<Vec<u32>>>,
}

impl SimulatedButtons {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins armed so far, in arming order.
    pub fn armed_pins(&self) -> Vec<u32> {
        self.armed.lock().map(|pins| pins.clone()).unwrap_or_default()
    }
}

impl ButtonInterrupts for SimulatedButtons {
    fn enable_falling_edge(&mut self, pin: u32) -> Result<()> {
        let mut armed = self
            .armed
            .lock()
            .map_err(|_| MotionPadError::Init("button pin registry poisoned".to_string()))?;
        if !armed.contains(&pin) {
            armed.push(pin);
        }
        Ok(())
    }
}

/// Press each button in turn, one press per `every`, forever.
///
/// Each press is delivered as a falling edge followed by a rising edge, the
/// way a GPIO interrupt controller would report it.
pub fn spawn_button_script(capture: InputCapture, pins: Vec<u32>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        if pins.is_empty() {
            return;
        }
        info!("Scripted button presses every {:?}", every);

        let mut ticker = interval(every);
        ticker.tick().await;

        for pin in pins.iter().copied().cycle() {
            ticker.tick().await;
            let accepted = capture.on_edge(pin, Edge::Falling);
            capture.on_edge(pin, Edge::Rising);
            debug!("Scripted press on GPIO {} (accepted: {})", pin, accepted);
        }
    })
}
