use crate::state::{Calibration, Step, StrabismusCorrection};
use glam::{Mat4, Quat};
use rift_math::Eye;
use rift_tracker::HeadTracker;

/// What the application should react to after a key press.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    /// A new measuring step began.
    StepStarted(Step),
    /// Calibration finished; the player pose should be reset.
    Completed(StrabismusCorrection),
    /// Confirm in `Done`; the correction was reported again.
    Reported(StrabismusCorrection),
    /// Tracking was re-centred; the player pose should be reset.
    Recentered,
}

/// Drives a [`Calibration`] from a head tracker.
pub struct CalibrationSession<T: HeadTracker> {
    tracker: T,
    calibration: Calibration,
    installed: Option<StrabismusCorrection>,
    head: Quat,
}

impl<T: HeadTracker> CalibrationSession<T> {
    pub fn new(tracker: T) -> Self {
        Self {
            tracker,
            calibration: Calibration::new(),
            installed: None,
            head: Quat::IDENTITY,
        }
    }

    pub fn step(&self) -> Step {
        self.calibration.step()
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Correction handed off when the session reached `Done`.
    pub fn installed(&self) -> Option<StrabismusCorrection> {
        self.installed
    }

    /// Head orientation sampled by the last [`frame`](Self::frame).
    pub fn head(&self) -> Quat {
        self.head
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    /// Sample the tracker and update the calibration. Call once per frame.
    pub fn frame(&mut self) -> Quat {
        self.head = self.tracker.predicted_orientation();
        self.calibration.update(self.head);
        self.head
    }

    pub fn confirm(&mut self) -> SessionEvent {
        let current = self.tracker.predicted_orientation();
        let was_done = self.calibration.step() == Step::Done;

        match self.calibration.confirm(current) {
            Some(correction) => {
                self.installed = Some(correction);
                self.tracker.reset();
                SessionEvent::Completed(correction)
            }
            None if was_done => SessionEvent::Reported(self.calibration.correction()),
            None => SessionEvent::StepStarted(self.calibration.step()),
        }
    }

    /// Re-capture the reference pose and reset tracker drift. Allowed in every step.
    pub fn reset(&mut self) -> SessionEvent {
        // The reference is taken before the tracker zeroes itself, so frames
        // after a reset measure against the pre-reset pose.
        let current = self.tracker.predicted_orientation();
        self.calibration.recapture(current);
        self.tracker.reset();
        tracing::info!(step = ?self.calibration.step(), "Tracking recentered");
        SessionEvent::Recentered
    }

    /// Rotation applied to `eye`: the live offset while measuring, the
    /// installed correction afterwards.
    pub fn correction_for(&self, eye: Eye) -> Mat4 {
        self.installed
            .unwrap_or_else(|| self.calibration.correction())
            .for_eye(eye)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedTracker {
        pose: Quat,
        resets: u32,
    }

    impl HeadTracker for ScriptedTracker {
        fn predicted_orientation(&self) -> Quat {
            self.pose
        }

        fn reset(&mut self) {
            self.resets += 1;
            self.pose = Quat::IDENTITY;
        }
    }

    fn session() -> CalibrationSession<ScriptedTracker> {
        CalibrationSession::new(ScriptedTracker {
            pose: Quat::IDENTITY,
            resets: 0,
        })
    }

    #[test]
    fn full_run_installs_correction_and_resets_tracker() {
        let mut session = session();
        assert_eq!(session.confirm(), SessionEvent::StepStarted(Step::Pitch));

        session.tracker.pose = Quat::from_rotation_x(40f32.to_radians());
        session.frame();
        assert_eq!(session.confirm(), SessionEvent::StepStarted(Step::Yaw));
        assert_eq!(session.calibration().reference(), session.tracker.pose);

        let event = session.confirm();
        let correction = match event {
            SessionEvent::Completed(c) => c,
            other => panic!("unexpected event {other:?}"),
        };
        assert_eq!(session.installed(), Some(correction));
        assert_eq!(session.tracker().resets, 1);
        assert!((correction.euler_degrees().x - 40.0).abs() < 1e-2);

        assert_eq!(session.confirm(), SessionEvent::Reported(correction));
        assert_eq!(session.step(), Step::Done);
    }

    #[test]
    fn reset_recaptures_without_moving_step() {
        let mut session = session();
        session.confirm();
        session.tracker.pose = Quat::from_rotation_x(0.4);
        session.frame();
        let offset = session.calibration().offset();

        session.tracker.pose = Quat::from_rotation_y(0.2);
        assert_eq!(session.reset(), SessionEvent::Recentered);
        assert_eq!(session.calibration().reference(), Quat::from_rotation_y(0.2));
        assert_eq!(session.step(), Step::Pitch);
        assert_eq!(session.calibration().offset(), offset);
        assert_eq!(session.tracker().resets, 1);
    }

    #[test]
    fn reset_measures_against_the_pre_reset_pose() {
        let mut session = session();
        session.confirm();
        session.tracker.pose = Quat::from_rotation_x(0.4);
        session.frame();
        assert!((session.calibration().euler().x - 0.2).abs() < 1e-4);

        session.reset();
        session.frame();
        assert_eq!(session.head(), Quat::IDENTITY);
        assert!((session.calibration().euler().x + 0.2).abs() < 1e-4);
    }

    #[test]
    fn reset_during_intro_stays_in_intro() {
        let mut session = session();
        session.tracker.pose = Quat::from_rotation_y(0.3);
        assert_eq!(session.reset(), SessionEvent::Recentered);
        assert_eq!(session.step(), Step::Intro);
        assert_eq!(session.installed(), None);
        assert_eq!(session.calibration().offset(), Quat::IDENTITY);
        assert_eq!(session.tracker().resets, 1);
    }

    #[test]
    fn reset_after_done_keeps_installed_correction() {
        let mut session = session();
        session.confirm();
        session.tracker.pose = Quat::from_rotation_x(0.2);
        session.frame();
        session.confirm();
        session.confirm();
        let installed = session.installed();
        assert!(installed.is_some());

        session.tracker.pose = Quat::from_rotation_y(0.5);
        assert_eq!(session.reset(), SessionEvent::Recentered);
        assert_eq!(session.step(), Step::Done);
        assert_eq!(session.installed(), installed);
        assert_eq!(session.tracker().resets, 2);
    }

    #[test]
    fn eyes_get_opposite_corrections() {
        let mut session = session();
        session.confirm();
        session.tracker.pose = Quat::from_rotation_x(0.3);
        session.frame();

        let left = session.correction_for(Eye::Left);
        let right = session.correction_for(Eye::Right);
        assert!((left * right).abs_diff_eq(Mat4::IDENTITY, 1e-5));
        assert!(!left.abs_diff_eq(Mat4::IDENTITY, 1e-3));
    }
}
