use crate::types::{Orientation, RawImuSample};
use crate::HeadTracker;
use ahrs::{Ahrs, Madgwick};
use glam::{Quat, Vec3};
use nalgebra::Vector3;

/// Tuning for [`SensorFusion`].
#[derive(Debug, Clone, Copy)]
pub struct FusionSettings {
    /// Madgwick filter gain.
    pub beta: f32,
    /// Stationary samples averaged into the gyro bias before output starts.
    pub calibration_samples: u32,
    /// Sensor sample rate in Hz.
    pub sample_rate_hz: f32,
    /// Prediction horizon in milliseconds. Zero disables prediction.
    pub prediction_ms: f32,
}

impl Default for FusionSettings {
    fn default() -> Self {
        Self {
            beta: 0.1,
            calibration_samples: 500,
            sample_rate_hz: 1000.0,
            prediction_ms: 40.0,
        }
    }
}

/// Sensor fusion using the Madgwick AHRS filter.
///
/// Converts raw gyro + accelerometer readings into a stable orientation
/// quaternion and extrapolates it along the latest angular velocity so the
/// renderer sees where the head will be when the frame reaches the panel.
pub struct SensorFusion {
    filter: Madgwick<f64>,
    settings: FusionSettings,
    /// Gyroscope bias (average of calibration samples).
    gyro_bias: Vec3,
    /// Calibration state.
    calibration: CalibrationState,
    /// Latest bias-corrected angular velocity (rad/s, sensor frame).
    angular_velocity: Vec3,
}

enum CalibrationState {
    Collecting { samples: Vec<Vec3>, target: usize },
    Calibrated,
}

impl SensorFusion {
    pub fn new(settings: FusionSettings) -> Self {
        Self {
            filter: new_filter(&settings),
            settings,
            gyro_bias: Vec3::ZERO,
            calibration: collecting(settings.calibration_samples),
            angular_velocity: Vec3::ZERO,
        }
    }

    /// Process a raw IMU sample and return the predicted orientation (if calibrated).
    pub fn update(&mut self, sample: &RawImuSample) -> Option<Orientation> {
        match &mut self.calibration {
            CalibrationState::Collecting { samples, target } => {
                samples.push(sample.gyro);
                if samples.len() >= *target {
                    let sum: Vec3 = samples.iter().copied().sum();
                    self.gyro_bias = sum / samples.len() as f32;
                    self.calibration = CalibrationState::Calibrated;
                    tracing::info!(
                        bias_x = self.gyro_bias.x,
                        bias_y = self.gyro_bias.y,
                        bias_z = self.gyro_bias.z,
                        "Gyro bias calibration complete"
                    );
                }
                None
            }
            CalibrationState::Calibrated => {
                let corrected_gyro = sample.gyro - self.gyro_bias;

                let gyro = Vector3::new(
                    corrected_gyro.x as f64,
                    corrected_gyro.y as f64,
                    corrected_gyro.z as f64,
                );
                let accel = Vector3::new(
                    sample.accel.x as f64,
                    sample.accel.y as f64,
                    sample.accel.z as f64,
                );

                if self.filter.update_imu(&gyro, &accel).is_err() {
                    return None;
                }
                self.angular_velocity = corrected_gyro;

                Some(Orientation {
                    quaternion: self.predicted(),
                })
            }
        }
    }

    /// Current filter orientation without prediction.
    pub fn orientation(&self) -> Quat {
        let q = self.filter.quat;
        Quat::from_xyzw(
            q.coords[0] as f32,
            q.coords[1] as f32,
            q.coords[2] as f32,
            q.coords[3] as f32, // w component
        )
        .normalize()
    }

    /// Orientation extrapolated `prediction_ms` ahead along the current angular velocity.
    pub fn predicted(&self) -> Quat {
        let horizon = self.settings.prediction_ms / 1000.0;
        let step = Quat::from_scaled_axis(self.angular_velocity * horizon);
        (self.orientation() * step).normalize()
    }

    /// Drop accumulated drift correction and restart from the identity pose.
    /// The gyro bias is kept.
    pub fn reset(&mut self) {
        self.filter = new_filter(&self.settings);
        self.angular_velocity = Vec3::ZERO;
        tracing::info!("Sensor fusion reset");
    }

    /// Whether calibration is complete.
    pub fn is_calibrated(&self) -> bool {
        matches!(self.calibration, CalibrationState::Calibrated)
    }

    pub fn gyro_bias(&self) -> Vec3 {
        self.gyro_bias
    }
}

impl HeadTracker for SensorFusion {
    fn predicted_orientation(&self) -> Quat {
        self.predicted()
    }

    fn reset(&mut self) {
        SensorFusion::reset(self);
    }
}

fn new_filter(settings: &FusionSettings) -> Madgwick<f64> {
    let sample_period = 1.0 / settings.sample_rate_hz.max(1.0) as f64;
    Madgwick::new(sample_period, settings.beta as f64)
}

fn collecting(target: u32) -> CalibrationState {
    CalibrationState::Collecting {
        samples: Vec::with_capacity(target as usize),
        target: target.max(1) as usize,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(gyro: Vec3) -> RawImuSample {
        RawImuSample {
            sequence: 0,
            gyro,
            accel: Vec3::new(0.0, 0.0, 9.81),
        }
    }

    fn calibrated(bias: Vec3, prediction_ms: f32) -> SensorFusion {
        let mut fusion = SensorFusion::new(FusionSettings {
            calibration_samples: 4,
            prediction_ms,
            ..Default::default()
        });
        for _ in 0..4 {
            assert!(fusion.update(&sample(bias)).is_none());
        }
        assert!(fusion.is_calibrated());
        fusion
    }

    #[test]
    fn bias_is_averaged_and_removed() {
        let bias = Vec3::new(0.01, -0.02, 0.005);
        let mut fusion = calibrated(bias, 0.0);
        assert!((fusion.gyro_bias() - bias).length() < 1e-6);

        // A stationary, level sensor stays at identity once the bias is removed.
        let out = fusion.update(&sample(bias)).unwrap();
        assert!(out.quaternion.angle_between(Quat::IDENTITY) < 1e-3);
    }

    #[test]
    fn prediction_extrapolates_along_gyro() {
        let mut fusion = calibrated(Vec3::ZERO, 100.0);
        let out = fusion.update(&sample(Vec3::new(0.0, 0.0, 1.0))).unwrap();
        let (yaw, _, _) = out.quaternion.to_euler(glam::EulerRot::ZYX);
        // 1 ms of integration plus 100 ms of prediction at 1 rad/s.
        assert!((yaw - 0.101).abs() < 2e-3, "yaw was {yaw}");
        assert!(fusion.orientation().angle_between(Quat::IDENTITY) < 2e-3);
    }

    #[test]
    fn reset_returns_to_identity() {
        let mut fusion = calibrated(Vec3::ZERO, 0.0);
        for _ in 0..50 {
            fusion.update(&sample(Vec3::new(2.0, 0.0, 0.0)));
        }
        assert!(fusion.predicted_orientation().angle_between(Quat::IDENTITY) > 0.05);

        HeadTracker::reset(&mut fusion);
        assert!(fusion.predicted_orientation().angle_between(Quat::IDENTITY) < 1e-6);
        assert!(fusion.is_calibrated());
    }
}
