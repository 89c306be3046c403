pub mod euler;
pub mod hmd;

pub use euler::{euler_angles, format_vector, quat_from_euler};
pub use hmd::HmdInfo;

/// Offscreen eye targets are this many times larger than the eye viewport,
/// so the barrel distortion pass does not magnify texels.
pub const FRAMEBUFFER_OBJECT_SCALE: f32 = 2.0;
/// Near clipping plane (meters).
pub const ZNEAR: f32 = 0.01;
/// Far clipping plane (meters).
pub const ZFAR: f32 = 1000.0;

/// Which eye a per-eye computation is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    pub const BOTH: [Eye; 2] = [Eye::Left, Eye::Right];

    /// +1 for the left eye, -1 for the right eye.
    ///
    /// Lens and IPD offsets are mirrored between eyes; the left eye takes
    /// the positive sign.
    pub fn polarity(self) -> f32 {
        match self {
            Eye::Left => 1.0,
            Eye::Right => -1.0,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Eye::Left => 0,
            Eye::Right => 1,
        }
    }

    pub fn is_right(self) -> bool {
        self == Eye::Right
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eye_polarity_is_mirrored() {
        assert_eq!(Eye::Left.polarity(), -Eye::Right.polarity());
        assert_eq!(Eye::BOTH.map(Eye::index), [0, 1]);
    }
}
