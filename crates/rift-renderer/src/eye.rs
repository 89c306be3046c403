use glam::{Mat4, UVec2, Vec3, Vec4};
use rift_math::{Eye, HmdInfo, ZFAR, ZNEAR};

/// A pixel rectangle within the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Everything that differs between the two eyes.
#[derive(Debug, Clone, Copy)]
pub struct PerEyeArgs {
    pub eye: Eye,
    /// Top-left corner of this eye's half of the window.
    pub viewport_position: UVec2,
    /// Shifts the projection center onto the lens axis.
    pub projection_offset: Mat4,
    /// Shifts the camera by half the interpupillary distance.
    pub modelview_offset: Mat4,
    /// Lens center offset uniform, in viewport units.
    pub lens_offset: f32,
}

impl PerEyeArgs {
    fn new(eye: Eye, hmd: &HmdInfo) -> Self {
        let sign = eye.polarity();
        let lens_offset = hmd.lens_offset() * sign;
        Self {
            eye,
            viewport_position: UVec2::ZERO,
            projection_offset: Mat4::from_translation(Vec3::new(lens_offset, 0.0, 0.0)),
            modelview_offset: Mat4::from_translation(Vec3::new(
                sign * hmd.interpupillary_distance / 2.0,
                0.0,
                0.0,
            )),
            lens_offset,
        }
    }

    /// Compose this eye's projection offset with the shared base projection.
    pub fn projection(&self, base: Mat4) -> Mat4 {
        self.projection_offset * base
    }

    /// Per-eye view matrix: IPD offset, then the strabismus correction,
    /// then the head/world view.
    pub fn view(&self, correction: Mat4, head_view: Mat4) -> Mat4 {
        self.modelview_offset * correction * head_view
    }
}

/// Stereo camera parameters derived from the headset profile.
///
/// Set once at startup (and on resize); all per-frame queries are pure.
#[derive(Debug, Clone)]
pub struct StereoRig {
    eye_size: UVec2,
    eye_aspect: f32,
    fov_y: f32,
    post_distortion_scale: f32,
    distortion_k: Vec4,
    eyes: [PerEyeArgs; 2],
}

impl StereoRig {
    pub fn new(hmd: &HmdInfo, window_size: (u32, u32)) -> Self {
        let mut rig = Self {
            eye_size: UVec2::ZERO,
            eye_aspect: hmd.eye_aspect(),
            fov_y: hmd.fov_y(),
            post_distortion_scale: hmd.post_distortion_scale(),
            distortion_k: Vec4::from_array(hmd.distortion_k),
            eyes: [PerEyeArgs::new(Eye::Left, hmd), PerEyeArgs::new(Eye::Right, hmd)],
        };
        rig.resize(window_size);

        tracing::info!(
            eye_aspect = rig.eye_aspect,
            fov_y_degrees = rig.fov_y.to_degrees(),
            lens_offset = rig.eyes[0].lens_offset,
            post_distortion_scale = rig.post_distortion_scale,
            "Stereo rig configured"
        );
        rig
    }

    /// Split a new window size into two side-by-side eye viewports.
    pub fn resize(&mut self, (width, height): (u32, u32)) {
        self.eye_size = UVec2::new((width / 2).max(1), height.max(1));
        self.eyes[Eye::Left.index()].viewport_position = UVec2::ZERO;
        self.eyes[Eye::Right.index()].viewport_position = UVec2::new(self.eye_size.x, 0);
    }

    pub fn eye(&self, eye: Eye) -> &PerEyeArgs {
        &self.eyes[eye.index()]
    }

    pub fn eyes(&self) -> &[PerEyeArgs; 2] {
        &self.eyes
    }

    pub fn eye_size(&self) -> UVec2 {
        self.eye_size
    }

    pub fn eye_aspect(&self) -> f32 {
        self.eye_aspect
    }

    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    pub fn post_distortion_scale(&self) -> f32 {
        self.post_distortion_scale
    }

    pub fn distortion_k(&self) -> Vec4 {
        self.distortion_k
    }

    /// Base perspective projection shared by both eyes.
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.eye_aspect, ZNEAR, ZFAR)
    }

    /// Full projection for one eye.
    pub fn eye_projection(&self, eye: Eye) -> Mat4 {
        self.eye(eye).projection(self.projection())
    }

    pub fn viewport(&self, eye: Eye) -> Viewport {
        let position = self.eye(eye).viewport_position;
        Viewport {
            x: position.x,
            y: position.y,
            width: self.eye_size.x,
            height: self.eye_size.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dk1_rig() -> StereoRig {
        StereoRig::new(&HmdInfo::dk1(), (1280, 800))
    }

    #[test]
    fn eyes_are_mirror_images() {
        let rig = dk1_rig();
        let left = rig.eye(Eye::Left);
        let right = rig.eye(Eye::Right);

        assert!(left.lens_offset > 0.0);
        assert_eq!(left.lens_offset, -right.lens_offset);
        assert_eq!(
            left.projection_offset.w_axis.x,
            -right.projection_offset.w_axis.x
        );
        assert!((left.modelview_offset.w_axis.x - 0.032).abs() < 1e-6);
        assert!((right.modelview_offset.w_axis.x + 0.032).abs() < 1e-6);
    }

    #[test]
    fn eye_projection_composes_offset_with_base() {
        let rig = dk1_rig();
        let expected = Mat4::from_translation(Vec3::new(rig.eye(Eye::Left).lens_offset, 0.0, 0.0))
            * rig.projection();
        assert!(rig.eye_projection(Eye::Left).abs_diff_eq(expected, 1e-6));
        // The offset only moves clip-space x, so both eyes share x-independent rows.
        let l = rig.eye_projection(Eye::Left);
        let r = rig.eye_projection(Eye::Right);
        assert_eq!(l.y_axis, r.y_axis);
    }

    #[test]
    fn viewports_split_window_in_half() {
        let mut rig = dk1_rig();
        assert_eq!(
            rig.viewport(Eye::Left),
            Viewport { x: 0, y: 0, width: 640, height: 800 }
        );
        assert_eq!(rig.viewport(Eye::Right).x, 640);

        rig.resize((1920, 1080));
        assert_eq!(rig.viewport(Eye::Right).x, 960);
        assert_eq!(rig.eye_size(), UVec2::new(960, 1080));
        // Aspect comes from the headset, not the window.
        assert!((rig.eye_aspect() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn view_applies_ipd_after_correction() {
        let rig = dk1_rig();
        let correction = Mat4::from_rotation_y(0.1);
        let view = rig.eye(Eye::Left).view(correction, Mat4::IDENTITY);
        let origin = view.transform_point3(Vec3::ZERO);
        assert!((origin.x - 0.032).abs() < 1e-6);
    }
}
