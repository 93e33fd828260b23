//! # Orientation Fusion
//!
//! The fusion collaborator takes gyroscope and accelerometer vectors plus a
//! fixed sample period, keeps its attitude as a quaternion, and reports it as
//! Euler angles. Any AHRS can sit behind [`OrientationFusion`];
//! [`ComplementaryFilter`] is the built-in one.
//!
//! No magnetometer is used, so yaw drifts. Yaw is reported but the pipeline
//! never transmits it.

use lin_alg2::f32::{Quaternion, Vec3};

/// Orientation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerAngles {
    pub pitch: f32,
    pub roll: f32,
    pub yaw: f32,
}

/// 6-axis orientation estimator.
#[cfg_attr(test, mockall::automock)]
pub trait OrientationFusion: Send {
    /// Advance the estimate by one sample.
    ///
    /// # Arguments
    ///
    /// * `gyro_dps` - Body angular rate in degrees per second (x roll, y pitch, z yaw)
    /// * `accel_g` - Acceleration in g
    /// * `dt_s` - Sample period in seconds; must match the real sampling cadence
    fn update_no_magnetometer(&mut self, gyro_dps: Vec3, accel_g: Vec3, dt_s: f32) -> EulerAngles;
}

/// Quaternion for intrinsic Z-Y-X (yaw, pitch, roll) rotations, in radians.
pub fn quaternion_from_euler(roll: f32, pitch: f32, yaw: f32) -> Quaternion {
    let (sr, cr) = (roll * 0.5).sin_cos();
    let (sp, cp) = (pitch * 0.5).sin_cos();
    let (sy, cy) = (yaw * 0.5).sin_cos();

    Quaternion {
        w: cr * cp * cy + sr * sp * sy,
        x: sr * cp * cy - cr * sp * sy,
        y: cr * sp * cy + sr * cp * sy,
        z: cr * cp * sy - sr * sp * cy,
    }
}

/// Z-Y-X Euler angles of a unit quaternion, in degrees.
pub fn euler_from_quaternion(q: &Quaternion) -> EulerAngles {
    let roll = (2.0 * (q.w * q.x + q.y * q.z)).atan2(1.0 - 2.0 * (q.x * q.x + q.y * q.y));
    let pitch = (2.0 * (q.w * q.y - q.z * q.x)).clamp(-1.0, 1.0).asin();
    let yaw = (2.0 * (q.w * q.z + q.x * q.y)).atan2(1.0 - 2.0 * (q.y * q.y + q.z * q.z));

    EulerAngles {
        pitch: pitch.to_degrees(),
        roll: roll.to_degrees(),
        yaw: yaw.to_degrees(),
    }
}

/// Rotation by a body rate held for `dt_s` seconds.
fn rotation_increment(rate_rad: Vec3, dt_s: f32) -> Quaternion {
    let rate = (rate_rad.x * rate_rad.x + rate_rad.y * rate_rad.y + rate_rad.z * rate_rad.z).sqrt();
    if rate == 0.0 {
        return Quaternion::new_identity();
    }

    let (s, c) = (rate * dt_s * 0.5).sin_cos();
    Quaternion {
        w: c,
        x: rate_rad.x / rate * s,
        y: rate_rad.y / rate * s,
        z: rate_rad.z / rate * s,
    }
}

/// Complementary filter blending the gyro-propagated attitude with the
/// accelerometer gravity vector.
///
/// The attitude lives in a quaternion that the body rate rotates every
/// update. Pitch and roll are then pulled toward the gravity reference and
/// yaw is left to the gyro alone.
///
/// `gain` is the gyro weight: 1.0 trusts only the gyro, 0.0 only the
/// accelerometer. The first update seeds pitch and roll from gravity.
#[derive(Clone)]
pub struct ComplementaryFilter {
    gain: f32,
    attitude: Quaternion,
    initialized: bool,
}

impl std::fmt::Debug for ComplementaryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComplementaryFilter")
            .field("gain", &self.gain)
            .field("angles", &self.angles())
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl Default for ComplementaryFilter {
    fn default() -> Self {
        Self::new(0.98)
    }
}

impl ComplementaryFilter {
    #[must_use]
    pub fn new(gain: f32) -> Self {
        Self {
            gain: gain.clamp(0.0, 1.0),
            attitude: Quaternion::new_identity(),
            initialized: false,
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn attitude(&self) -> Quaternion {
        self.attitude
    }

    /// Current estimate in degrees.
    pub fn angles(&self) -> EulerAngles {
        euler_from_quaternion(&self.attitude)
    }

    /// Roll and pitch implied by gravity alone, in radians.
    fn gravity_angles(accel: Vec3) -> (f32, f32) {
        let roll = accel.y.atan2(accel.z);
        let pitch = (-accel.x).atan2((accel.y * accel.y + accel.z * accel.z).sqrt());
        (roll, pitch)
    }
}

impl OrientationFusion for ComplementaryFilter {
    fn update_no_magnetometer(&mut self, gyro_dps: Vec3, accel_g: Vec3, dt_s: f32) -> EulerAngles {
        let (accel_roll, accel_pitch) = Self::gravity_angles(accel_g);

        if !self.initialized {
            self.attitude = quaternion_from_euler(accel_roll, accel_pitch, 0.0);
            self.initialized = true;
            return self.angles();
        }

        let rate = Vec3::new(
            gyro_dps.x.to_radians(),
            gyro_dps.y.to_radians(),
            gyro_dps.z.to_radians(),
        );
        let propagated = (self.attitude * rotation_increment(rate, dt_s)).to_normalized();
        let gyro = euler_from_quaternion(&propagated);

        let gain = self.gain;
        let blend = |estimate: f32, reference: f32| gain * estimate + (1.0 - gain) * reference;

        self.attitude = quaternion_from_euler(
            blend(gyro.roll.to_radians(), accel_roll),
            blend(gyro.pitch.to_radians(), accel_pitch),
            gyro.yaw.to_radians(),
        );
        self.angles()
    }
}
