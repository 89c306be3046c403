pub mod session;
pub mod state;

pub use session::{CalibrationSession, SessionEvent};
pub use state::{Calibration, Step, StrabismusCorrection};
