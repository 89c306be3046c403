use glam::{Mat4, Quat, Vec3};
use rift_math::{euler_angles, format_vector, quat_from_euler, Eye};

/// Calibration progress. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    Intro,
    Pitch,
    Yaw,
    Done,
}

impl Step {
    /// The step a confirm moves to. `Done` is terminal.
    pub fn next(self) -> Self {
        match self {
            Step::Intro => Step::Pitch,
            Step::Pitch => Step::Yaw,
            Step::Yaw | Step::Done => Step::Done,
        }
    }

    /// Whether head motion currently feeds the offset.
    pub fn is_measuring(self) -> bool {
        matches!(self, Step::Pitch | Step::Yaw)
    }

    pub fn instructions(self) -> &'static str {
        match self {
            Step::Intro => {
                "This utility will allow you to calibrate your per-eye offset for \
                 correcting strabismus, potentially reducing double vision and/or \
                 the need for prismatic glasses in the Rift\n\n\
                 If you normally wear prismatic glasses you should remove them for \
                 this test.\n\n\
                 Press spacebar to continue"
            }
            Step::Pitch => "Look up and down until the lines are even\n\nPress spacebar to continue",
            Step::Yaw => {
                "Move your head horizontally left and right until the lines are even\n\n\
                 Press spacebar to continue"
            }
            Step::Done => "Calibration applied. Press R to recenter, Escape to quit",
        }
    }
}

/// Per-eye rotation that corrects a strabismus offset.
///
/// The left eye is rotated by the offset and the right eye by its inverse,
/// so the total divergence between the eyes is twice the offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrabismusCorrection {
    offset: Quat,
}

impl Default for StrabismusCorrection {
    fn default() -> Self {
        Self {
            offset: Quat::IDENTITY,
        }
    }
}

impl StrabismusCorrection {
    pub fn new(offset: Quat) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> Quat {
        self.offset
    }

    pub fn rotation_for(&self, eye: Eye) -> Quat {
        match eye {
            Eye::Left => self.offset,
            Eye::Right => self.offset.inverse(),
        }
    }

    pub fn for_eye(&self, eye: Eye) -> Mat4 {
        Mat4::from_quat(self.rotation_for(eye))
    }

    /// Full inter-eye correction in degrees, as (pitch, yaw, roll).
    pub fn euler_degrees(&self) -> Vec3 {
        let euler = euler_angles(self.offset) * 2.0;
        Vec3::new(
            euler.x.to_degrees(),
            euler.y.to_degrees(),
            euler.z.to_degrees(),
        )
    }
}

/// The INTRO → PITCH → YAW → DONE state machine.
///
/// Each measuring step compares the head pose against a reference captured
/// when the step began; half of that rotation becomes the per-eye offset for
/// the axis being measured.
#[derive(Debug, Clone)]
pub struct Calibration {
    step: Step,
    reference: Quat,
    euler: Vec3,
    offset: Quat,
}

impl Default for Calibration {
    fn default() -> Self {
        Self::new()
    }
}

impl Calibration {
    pub fn new() -> Self {
        Self {
            step: Step::Intro,
            reference: Quat::IDENTITY,
            euler: Vec3::ZERO,
            offset: Quat::IDENTITY,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn reference(&self) -> Quat {
        self.reference
    }

    pub fn offset(&self) -> Quat {
        self.offset
    }

    /// Accumulated (pitch, yaw, roll) in radians. Roll stays zero.
    pub fn euler(&self) -> Vec3 {
        self.euler
    }

    pub fn correction(&self) -> StrabismusCorrection {
        StrabismusCorrection::new(self.offset)
    }

    /// Advance one step. `current` is the head pose at the moment of confirming.
    ///
    /// Returns the finished correction when this confirm enters `Done`.
    pub fn confirm(&mut self, current: Quat) -> Option<StrabismusCorrection> {
        match self.step {
            Step::Intro | Step::Pitch => {
                self.step = self.step.next();
                self.reference = current;
                tracing::info!(step = ?self.step, "Calibration step started");
                None
            }
            Step::Yaw => {
                self.step = Step::Done;
                let correction = self.correction();
                tracing::info!(
                    correction = %format_vector(correction.euler_degrees()),
                    "Calibration complete"
                );
                Some(correction)
            }
            Step::Done => {
                let degrees = self.correction().euler_degrees();
                tracing::info!(
                    pitch = %format!("{:.2}", degrees.x),
                    yaw = %format!("{:.2}", degrees.y),
                    "Strabismus correction (degrees)"
                );
                None
            }
        }
    }

    /// Take `current` as the new reference pose. Step and offset are kept.
    pub fn recapture(&mut self, current: Quat) {
        self.reference = current;
    }

    /// Per-frame update with the latest head pose.
    pub fn update(&mut self, current: Quat) {
        if !self.step.is_measuring() {
            return;
        }

        let delta = current * self.reference.inverse();
        let half = Quat::IDENTITY.slerp(delta, 0.5);
        let raw = euler_angles(half);

        match self.step {
            Step::Pitch => self.euler.x = raw.x,
            Step::Yaw => self.euler.y = raw.y,
            Step::Intro | Step::Done => {}
        }
        self.offset = quat_from_euler(self.euler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn degrees(d: f32) -> f32 {
        d.to_radians()
    }

    #[test]
    fn steps_only_move_forward() {
        let mut calibration = Calibration::new();
        let mut seen = vec![calibration.step()];
        for _ in 0..5 {
            calibration.confirm(Quat::IDENTITY);
            seen.push(calibration.step());
        }
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(
            seen,
            vec![Step::Intro, Step::Pitch, Step::Yaw, Step::Done, Step::Done, Step::Done]
        );
    }

    #[test]
    fn entering_a_measuring_step_captures_reference() {
        let mut calibration = Calibration::new();
        let first = Quat::from_rotation_y(0.3);
        calibration.confirm(first);
        assert_eq!(calibration.reference(), first);

        let second = Quat::from_rotation_x(-0.2);
        calibration.confirm(second);
        assert_eq!(calibration.step(), Step::Yaw);
        assert_eq!(calibration.reference(), second);
    }

    #[test]
    fn pitch_measures_half_the_head_rotation() {
        let mut calibration = Calibration::new();
        calibration.confirm(Quat::IDENTITY);

        calibration.update(Quat::from_rotation_x(degrees(40.0)));
        assert!((calibration.euler().x - degrees(20.0)).abs() < EPS);
        assert!(calibration.euler().y.abs() < EPS);

        let expected = Quat::from_rotation_x(degrees(20.0));
        assert!(calibration.offset().angle_between(expected) < EPS);
    }

    #[test]
    fn pitch_is_relative_to_reference() {
        let mut calibration = Calibration::new();
        calibration.confirm(Quat::from_rotation_x(degrees(10.0)));
        calibration.update(Quat::from_rotation_x(degrees(30.0)));
        assert!((calibration.euler().x - degrees(10.0)).abs() < EPS);
    }

    #[test]
    fn pitch_is_frozen_during_yaw() {
        let mut calibration = Calibration::new();
        calibration.confirm(Quat::IDENTITY);
        calibration.update(Quat::from_rotation_x(degrees(40.0)));
        let pitch = calibration.euler().x;

        calibration.confirm(Quat::IDENTITY);
        calibration.update(Quat::from_rotation_x(degrees(-60.0)));
        assert!((calibration.euler().x - pitch).abs() < EPS);

        calibration.update(Quat::from_rotation_y(degrees(30.0)));
        assert!((calibration.euler().x - pitch).abs() < EPS);
        assert!((calibration.euler().y - degrees(15.0)).abs() < EPS);
        assert_eq!(calibration.euler().z, 0.0);
    }

    #[test]
    fn nothing_changes_after_done() {
        let mut calibration = Calibration::new();
        calibration.confirm(Quat::IDENTITY);
        calibration.update(Quat::from_rotation_x(degrees(8.0)));
        calibration.confirm(Quat::IDENTITY);
        calibration.update(Quat::from_rotation_y(degrees(6.0)));
        let correction = calibration.confirm(Quat::IDENTITY);
        assert_eq!(correction, Some(calibration.correction()));

        let offset = calibration.offset();
        calibration.update(Quat::from_rotation_z(1.0));
        calibration.update(Quat::from_rotation_x(1.0));
        assert_eq!(calibration.offset(), offset);
        assert_eq!(calibration.confirm(Quat::from_rotation_y(1.0)), None);
        assert_eq!(calibration.offset(), offset);
    }

    #[test]
    fn intro_ignores_motion() {
        let mut calibration = Calibration::new();
        calibration.update(Quat::from_rotation_x(1.0));
        assert_eq!(calibration.offset(), Quat::IDENTITY);
    }

    #[test]
    fn recapture_keeps_step_and_offset() {
        let mut calibration = Calibration::new();
        calibration.confirm(Quat::IDENTITY);
        calibration.update(Quat::from_rotation_x(degrees(20.0)));
        let offset = calibration.offset();

        let pose = Quat::from_rotation_y(0.5);
        calibration.recapture(pose);
        assert_eq!(calibration.reference(), pose);
        assert_eq!(calibration.step(), Step::Pitch);
        assert_eq!(calibration.offset(), offset);
    }

    #[test]
    fn right_eye_gets_the_inverse() {
        let correction = StrabismusCorrection::new(Quat::from_rotation_x(degrees(5.0)));
        let product = correction.for_eye(Eye::Left) * correction.for_eye(Eye::Right);
        assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-5));
        assert_eq!(
            correction.rotation_for(Eye::Right),
            correction.offset().inverse()
        );
    }

    #[test]
    fn reported_angles_are_doubled() {
        let correction = StrabismusCorrection::new(quat_from_euler(Vec3::new(
            degrees(2.0),
            degrees(-3.0),
            0.0,
        )));
        let reported = correction.euler_degrees();
        assert!((reported.x - 4.0).abs() < 1e-3);
        assert!((reported.y + 6.0).abs() < 1e-3);
    }

    #[test]
    fn instructions_follow_the_steps() {
        assert!(Step::Intro.instructions().starts_with("This utility"));
        assert!(Step::Pitch.instructions().contains("up and down"));
        assert!(Step::Yaw.instructions().contains("left and right"));
    }
}
