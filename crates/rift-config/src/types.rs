use glam::Vec3;
use rift_math::HmdInfo;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Headset profile and window placement.
    pub hmd: HmdConfig,
    /// Head tracker connection and fusion tuning.
    pub tracker: TrackerConfig,
    /// Strabismus calibration tool settings.
    pub calibration: CalibrationConfig,
    /// Lens-corrected image display settings.
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HmdConfig {
    /// Explicit headset profile. `None` means use the DK1 factory values.
    pub profile: Option<HmdInfo>,
    /// Replacement distortion coefficients for a unit that reports bad K values.
    pub distortion_k_override: Option<[f32; 4]>,
    /// Open an exclusive fullscreen window on the headset display instead of
    /// an undecorated window positioned over it.
    pub fullscreen: bool,
}

impl HmdConfig {
    /// Resolve the headset profile, falling back to DK1 values when none is configured.
    pub fn resolve(&self) -> HmdInfo {
        let hmd = match self.profile {
            Some(profile) => profile,
            None => {
                tracing::warn!("No headset profile configured, using DK1 defaults");
                HmdInfo::dk1()
            }
        };
        match self.distortion_k_override {
            Some(k) => {
                tracing::info!(?k, "Applying distortion coefficient override");
                hmd.with_distortion_k(k)
            }
            None => hmd,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Sensor bridge address (`host:port`). `None` runs without head tracking.
    pub endpoint: Option<String>,
    /// Madgwick filter beta parameter (convergence speed). Higher = more responsive, less smooth.
    pub madgwick_beta: f32,
    /// Number of stationary samples for gyro bias calibration.
    pub calibration_samples: u32,
    /// Sensor sample rate in Hz.
    pub sample_rate_hz: f32,
    /// How far ahead to predict orientation, in milliseconds.
    pub prediction_ms: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            endpoint: Some("127.0.0.1:52998".to_string()),
            madgwick_beta: 0.1,
            calibration_samples: 500,
            sample_rate_hz: 1000.0,
            prediction_ms: 40.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Free-look player start position once calibration is done.
    #[serde(with = "vec3_serde")]
    pub camera_start: Vec3,
    /// Point the player looks at from the start position.
    #[serde(with = "vec3_serde")]
    pub camera_target: Vec3,
    /// Free-look movement speed in meters per second.
    pub move_speed: f32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            camera_start: Vec3::new(0.0, 1.0, 2.0),
            camera_target: Vec3::new(0.0, 0.5, 0.0),
            move_speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Image shown by the lens-corrected display. `None` shows a generated test card.
    pub image_path: Option<PathBuf>,
}

// Serde helper for glam types (which implement Serialize but we want
// a cleaner TOML representation as arrays).

mod vec3_serde {
    use glam::Vec3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &Vec3, s: S) -> Result<S::Ok, S::Error> {
        [v.x, v.y, v.z].serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec3, D::Error> {
        let [x, y, z] = <[f32; 3]>::deserialize(d)?;
        Ok(Vec3::new(x, y, z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_hmd_falls_back_to_dk1() {
        assert_eq!(HmdConfig::default().resolve(), HmdInfo::dk1());
    }

    #[test]
    fn distortion_override_applies_on_top_of_profile() {
        let mut profile = HmdInfo::dk1();
        profile.desktop_x = 1920;
        let config = HmdConfig {
            profile: Some(profile),
            distortion_k_override: Some([1.0, 0.5, 0.0, 0.0]),
            fullscreen: false,
        };
        let hmd = config.resolve();
        assert_eq!(hmd.desktop_x, 1920);
        assert_eq!(hmd.distortion_k, [1.0, 0.5, 0.0, 0.0]);
    }
}
