//! # Orientation Sampler
//!
//! Periodic task reading the inertial sensor, running fusion, and pushing
//! pitch and roll onto the aim channel.
//!
//! The task period doubles as the fusion sample period. Both come from the
//! same value so the integrated estimate cannot drift out of step with the
//! real cadence.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace};

use lin_alg2::f32::Vec3;

use super::fusion::{EulerAngles, OrientationFusion};
use crate::packet::protocol::{OrientationAxis, OrientationSample};
use crate::peripherals::{InertialSensor, RawImuReading};
use crate::pipeline::channel::ChannelSender;
use crate::pipeline::task::PeriodicTask;

/// Gyroscope sensitivity at ±250 deg/s full scale.
pub const GYRO_COUNTS_PER_DPS: f32 = 131.0;

/// Accelerometer sensitivity at ±2 g full scale.
pub const ACCEL_COUNTS_PER_G: f32 = 16384.0;

/// Convert raw counts to (gyro deg/s, accel g).
pub fn convert_reading(reading: &RawImuReading) -> (Vec3, Vec3) {
    let [gx, gy, gz] = reading.gyro.map(|c| c as f32 / GYRO_COUNTS_PER_DPS);
    let [ax, ay, az] = reading.accel.map(|c| c as f32 / ACCEL_COUNTS_PER_G);
    (Vec3::new(gx, gy, gz), Vec3::new(ax, ay, az))
}

/// Pitch and roll samples worth sending. Zero angles and yaw are skipped.
pub fn orientation_samples(angles: &EulerAngles) -> impl Iterator<Item = OrientationSample> {
    [
        (OrientationAxis::Pitch, angles.pitch),
        (OrientationAxis::Roll, angles.roll),
    ]
    .into_iter()
    .filter(|(_, angle)| *angle != 0.0)
    .map(|(axis, angle_degrees)| OrientationSample {
        axis,
        angle_degrees,
    })
}

/// Periodic inertial sampler.
pub struct OrientationSampler {
    sensor: Box<dyn InertialSensor>,
    fusion: Box<dyn OrientationFusion>,
    aim: ChannelSender<OrientationSample>,
    period: Duration,
}

impl std::fmt::Debug for OrientationSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrientationSampler")
            .field("period", &self.period)
            .finish_non_exhaustive()
    }
}

impl OrientationSampler {
    pub fn new(
        sensor: Box<dyn InertialSensor>,
        fusion: Box<dyn OrientationFusion>,
        aim: ChannelSender<OrientationSample>,
        period: Duration,
    ) -> Self {
        Self {
            sensor,
            fusion,
            aim,
            period,
        }
    }

    /// Fuse one raw reading.
    pub fn process(&mut self, reading: &RawImuReading) -> EulerAngles {
        let (gyro, accel) = convert_reading(reading);
        self.fusion
            .update_no_magnetometer(gyro, accel, self.period.as_secs_f32())
    }

    /// Read, fuse and forward once.
    ///
    /// Returns how many samples were enqueued (0-2). A sensor read failure
    /// skips the cycle.
    pub fn sample_once(&mut self) -> usize {
        let reading = match self.sensor.read_raw() {
            Ok(reading) => reading,
            Err(e) => {
                debug!("Skipping orientation cycle: {}", e);
                return 0;
            }
        };

        let angles = self.process(&reading);
        trace!(
            "Orientation pitch {:.2} roll {:.2} yaw {:.2}",
            angles.pitch,
            angles.roll,
            angles.yaw
        );

        orientation_samples(&angles)
            .filter(|sample| self.aim.try_send(*sample))
            .count()
    }
}

#[async_trait]
impl PeriodicTask for OrientationSampler {
    fn name(&self) -> &'static str {
        "orientation sampler"
    }

    fn period(&self) -> Duration {
        self.period
    }

    async fn cycle(&mut self) {
        self.sample_once();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MotionPadError;
    use crate::orientation::fusion::MockOrientationFusion;
    use crate::peripherals::MockInertialSensor;
    use crate::pipeline::channel::{channel, ChannelReceiver};

    const PERIOD: Duration = Duration::from_millis(10);

    fn level_sensor() -> MockInertialSensor {
        let mut sensor = MockInertialSensor::new();
        sensor.expect_read_raw().returning(|| {
            Ok(RawImuReading {
                accel: [0, 0, 16384],
                gyro: [131, -262, 0],
            })
        });
        sensor
    }

    fn components(v: &Vec3) -> (f32, f32, f32) {
        (v.x, v.y, v.z)
    }

    fn fusion_returning(angles: EulerAngles) -> MockOrientationFusion {
        let mut fusion = MockOrientationFusion::new();
        fusion
            .expect_update_no_magnetometer()
            .returning(move |_, _, _| angles);
        fusion
    }

    fn sampler(
        sensor: MockInertialSensor,
        fusion: MockOrientationFusion,
    ) -> (OrientationSampler, ChannelReceiver<OrientationSample>) {
        let (tx, rx) = channel("aim");
        (
            OrientationSampler::new(Box::new(sensor), Box::new(fusion), tx, PERIOD),
            rx,
        )
    }

    #[test]
    fn test_convert_reading_units() {
        let (gyro, accel) = convert_reading(&RawImuReading {
            accel: [16384, -8192, 0],
            gyro: [131, -262, 0],
        });
        assert_eq!(components(&gyro), (1.0, -2.0, 0.0));
        assert_eq!(components(&accel), (1.0, -0.5, 0.0));
    }

    #[test]
    fn test_fusion_receives_converted_units_and_task_period() {
        let mut fusion = MockOrientationFusion::new();
        fusion
            .expect_update_no_magnetometer()
            .withf(|gyro, accel, dt| {
                components(gyro) == (1.0, -2.0, 0.0)
                    && components(accel) == (0.0, 0.0, 1.0)
                    && (*dt - 0.01).abs() < 1e-6
            })
            .times(1)
            .returning(|_, _, _| EulerAngles::default());

        let (mut sampler, _rx) = sampler(level_sensor(), fusion);
        sampler.sample_once();
    }

    #[test]
    fn test_only_nonzero_angles_are_sent() {
        let angles = EulerAngles {
            pitch: 0.0,
            roll: 45.0,
            yaw: 90.0,
        };
        let (mut sampler, mut rx) = sampler(level_sensor(), fusion_returning(angles));

        assert_eq!(sampler.sample_once(), 1);
        assert_eq!(
            rx.try_recv(),
            Some(OrientationSample {
                axis: OrientationAxis::Roll,
                angle_degrees: 45.0,
            })
        );
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn test_pitch_then_roll_order() {
        let angles = EulerAngles {
            pitch: -3.5,
            roll: 12.0,
            yaw: 0.0,
        };
        let (mut sampler, mut rx) = sampler(level_sensor(), fusion_returning(angles));

        assert_eq!(sampler.sample_once(), 2);
        assert_eq!(rx.try_recv().map(|s| s.axis), Some(OrientationAxis::Pitch));
        assert_eq!(rx.try_recv().map(|s| s.axis), Some(OrientationAxis::Roll));
    }

    #[test]
    fn test_level_orientation_sends_nothing() {
        let (mut sampler, mut rx) =
            sampler(level_sensor(), fusion_returning(EulerAngles::default()));
        assert_eq!(sampler.sample_once(), 0);
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn test_sensor_failure_skips_cycle() {
        let mut sensor = MockInertialSensor::new();
        sensor
            .expect_read_raw()
            .returning(|| Err(MotionPadError::Sensor("I2C NACK".to_string())));

        let mut fusion = MockOrientationFusion::new();
        fusion.expect_update_no_magnetometer().times(0);

        let (mut sampler, mut rx) = sampler(sensor, fusion);
        assert_eq!(sampler.sample_once(), 0);
        assert_eq!(rx.try_recv(), None);
    }
}
