pub mod free_look;

pub use free_look::{player_pose, FreeLook};

use winit::keyboard::{KeyCode, PhysicalKey};

/// What a key press means to the demo shells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Advance to the next step.
    Confirm,
    /// Re-capture the reference pose and reset tracking.
    Reset,
    /// Close the window.
    Quit,
    /// Not bound here; forwarded to the free-look controller.
    PassThrough(KeyCode),
}

impl KeyAction {
    pub fn from_key(key: KeyCode) -> Self {
        match key {
            KeyCode::Space => KeyAction::Confirm,
            KeyCode::KeyR => KeyAction::Reset,
            KeyCode::Escape => KeyAction::Quit,
            other => KeyAction::PassThrough(other),
        }
    }

    /// Map a physical key, ignoring keys winit could not identify.
    pub fn from_physical(key: PhysicalKey) -> Option<Self> {
        match key {
            PhysicalKey::Code(code) => Some(Self::from_key(code)),
            PhysicalKey::Unidentified(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_keys() {
        assert_eq!(KeyAction::from_key(KeyCode::Space), KeyAction::Confirm);
        assert_eq!(KeyAction::from_key(KeyCode::KeyR), KeyAction::Reset);
        assert_eq!(KeyAction::from_key(KeyCode::Escape), KeyAction::Quit);
    }

    #[test]
    fn other_keys_pass_through() {
        assert_eq!(
            KeyAction::from_key(KeyCode::KeyW),
            KeyAction::PassThrough(KeyCode::KeyW)
        );
        assert_eq!(
            KeyAction::from_physical(PhysicalKey::Code(KeyCode::ArrowLeft)),
            Some(KeyAction::PassThrough(KeyCode::ArrowLeft))
        );
    }
}
