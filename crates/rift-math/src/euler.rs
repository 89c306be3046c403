//! Conversions between quaternions and the (pitch, yaw, roll) Euler triple
//! used by the calibration tooling.
//!
//! The triple is stored as `Vec3 { x: pitch, y: yaw, z: roll }` and composes
//! as `Rz(roll) * Ry(yaw) * Rx(pitch)`, so pitch is applied first.

use glam::{EulerRot, Quat, Vec3};

/// Extract (pitch, yaw, roll) in radians from a rotation.
pub fn euler_angles(q: Quat) -> Vec3 {
    let (roll, yaw, pitch) = q.to_euler(EulerRot::ZYX);
    Vec3::new(pitch, yaw, roll)
}

/// Build a rotation from a (pitch, yaw, roll) triple in radians.
pub fn quat_from_euler(euler: Vec3) -> Quat {
    Quat::from_euler(EulerRot::ZYX, euler.z, euler.y, euler.x)
}

/// Format a vector as signed fixed-point triples, e.g. `+0.25 -1.00 +0.00`.
pub fn format_vector(v: Vec3) -> String {
    format!("{:+.2} {:+.2} {:+.2}", v.x, v.y, v.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_axis_rotations_land_on_their_component() {
        let pitch = euler_angles(Quat::from_rotation_x(0.3));
        assert!((pitch.x - 0.3).abs() < 1e-5);
        assert!(pitch.y.abs() < 1e-5 && pitch.z.abs() < 1e-5);

        let yaw = euler_angles(Quat::from_rotation_y(-0.4));
        assert!((yaw.y + 0.4).abs() < 1e-5);
        assert!(yaw.x.abs() < 1e-5 && yaw.z.abs() < 1e-5);
    }

    #[test]
    fn euler_triple_rebuilds_the_same_rotation() {
        let euler = Vec3::new(0.2, -0.5, 0.1);
        let q = quat_from_euler(euler);
        let back = euler_angles(q);
        assert!((back - euler).length() < 1e-5);
        assert!(quat_from_euler(back).abs_diff_eq(q, 1e-5));
    }

    #[test]
    fn vector_formatting_is_signed() {
        assert_eq!(format_vector(Vec3::new(0.25, -1.0, 0.0)), "+0.25 -1.00 +0.00");
    }
}
