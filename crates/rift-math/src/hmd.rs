use serde::{Deserialize, Serialize};

/// Physical description of a headset: panel, optics and desktop placement.
///
/// Distances are in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HmdInfo {
    /// Full panel resolution across both eyes.
    pub h_resolution: u32,
    pub v_resolution: u32,
    pub h_screen_size: f32,
    pub v_screen_size: f32,
    pub v_screen_center: f32,
    pub eye_to_screen_distance: f32,
    pub lens_separation_distance: f32,
    pub interpupillary_distance: f32,
    /// Radial distortion polynomial coefficients K0..K3.
    pub distortion_k: [f32; 4],
    pub chroma_ab_correction: [f32; 4],
    /// Desktop position of the headset's display.
    pub desktop_x: i32,
    pub desktop_y: i32,
}

impl HmdInfo {
    /// Factory values for the DK1 headset, used when no device profile is available.
    pub fn dk1() -> Self {
        Self {
            h_resolution: 1280,
            v_resolution: 800,
            h_screen_size: 0.14976,
            v_screen_size: 0.09360,
            v_screen_center: 0.04680,
            eye_to_screen_distance: 0.04100,
            lens_separation_distance: 0.06350,
            interpupillary_distance: 0.06400,
            distortion_k: [1.0, 0.22, 0.24, 0.0],
            chroma_ab_correction: [0.99600, -0.00400, 1.01400, 0.0],
            desktop_x: 100,
            desktop_y: 100,
        }
    }

    /// Replace the distortion coefficients, for units that report wrong values.
    pub fn with_distortion_k(mut self, k: [f32; 4]) -> Self {
        self.distortion_k = k;
        self
    }

    /// Per-eye resolution (half the panel width).
    pub fn eye_resolution(&self) -> (u32, u32) {
        (self.h_resolution / 2, self.v_resolution)
    }

    /// Width over height of one eye's half of the panel.
    pub fn eye_aspect(&self) -> f32 {
        (self.h_resolution as f32 / 2.0) / self.v_resolution as f32
    }

    /// Horizontal shift, in eye viewport units (-1..1), from the viewport
    /// center to the lens center.
    pub fn lens_offset(&self) -> f32 {
        let lens_distance = self.lens_separation_distance / self.h_screen_size;
        1.0 - 2.0 * lens_distance
    }

    /// Evaluate the radial distortion polynomial at radius `r`.
    pub fn distortion_factor(&self, r: f32) -> f32 {
        let [k0, k1, k2, k3] = self.distortion_k;
        let r2 = r * r;
        k0 + r2 * (k1 + r2 * (k2 + r2 * k3))
    }

    /// Scale needed to make the distorted image reach the outer viewport edge.
    pub fn distortion_scale(&self) -> f32 {
        self.distortion_factor(1.0 + self.lens_offset())
    }

    /// Inverse of [`distortion_scale`](Self::distortion_scale), applied after
    /// distortion so the render target fills the viewport.
    pub fn post_distortion_scale(&self) -> f32 {
        1.0 / self.distortion_scale()
    }

    /// Vertical field of view in radians, accounting for the lens magnification.
    pub fn fov_y(&self) -> f32 {
        let half_screen = self.v_screen_size / 2.0 * self.distortion_scale();
        2.0 * (half_screen / self.eye_to_screen_distance).atan()
    }
}

impl Default for HmdInfo {
    fn default() -> Self {
        Self::dk1()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dk1_derived_optics() {
        let hmd = HmdInfo::dk1();
        assert!((hmd.eye_aspect() - 0.8).abs() < 1e-6);
        assert!((hmd.lens_offset() - 0.15198).abs() < 1e-4);
        assert_eq!(hmd.eye_resolution(), (640, 800));
    }

    #[test]
    fn distortion_scale_grows_fov() {
        let hmd = HmdInfo::dk1();
        assert!(hmd.distortion_scale() > 1.0);
        assert!((hmd.distortion_scale() * hmd.post_distortion_scale() - 1.0).abs() < 1e-6);

        let undistorted = hmd.with_distortion_k([1.0, 0.0, 0.0, 0.0]);
        assert!((undistorted.distortion_scale() - 1.0).abs() < 1e-6);
        assert!(hmd.fov_y() > undistorted.fov_y());
        // atan(0.0468 / 0.041) * 2
        assert!((undistorted.fov_y() - 1.7036).abs() < 1e-3);
    }

    #[test]
    fn distortion_override_replaces_k_only() {
        let hmd = HmdInfo::dk1().with_distortion_k([1.0, 0.18, 0.11, 0.0]);
        assert_eq!(hmd.distortion_k, [1.0, 0.18, 0.11, 0.0]);
        assert_eq!(hmd.h_resolution, 1280);
    }
}
