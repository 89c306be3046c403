use glam::{Mat4, Vec3};
use winit::keyboard::KeyCode;

/// Keyboard-driven fly camera.
///
/// Tracks which movement keys are held; `apply` integrates them into the
/// player pose (a camera-to-world transform) once per frame.
#[derive(Debug, Clone)]
pub struct FreeLook {
    held: HeldKeys,
    /// Units per second.
    pub move_speed: f32,
    /// Radians per second.
    pub turn_speed: f32,
}

#[derive(Debug, Clone, Copy, Default)]
struct HeldKeys {
    forward: bool,
    back: bool,
    left: bool,
    right: bool,
    up: bool,
    down: bool,
    turn_left: bool,
    turn_right: bool,
    turn_up: bool,
    turn_down: bool,
}

impl FreeLook {
    pub fn new(move_speed: f32) -> Self {
        Self {
            held: HeldKeys::default(),
            move_speed,
            turn_speed: 90f32.to_radians(),
        }
    }

    /// Record a key transition. Returns `false` for keys it does not use.
    pub fn on_key(&mut self, key: KeyCode, pressed: bool) -> bool {
        let slot = match key {
            KeyCode::KeyW => &mut self.held.forward,
            KeyCode::KeyS => &mut self.held.back,
            KeyCode::KeyA => &mut self.held.left,
            KeyCode::KeyD => &mut self.held.right,
            KeyCode::KeyQ => &mut self.held.up,
            KeyCode::KeyE => &mut self.held.down,
            KeyCode::ArrowLeft => &mut self.held.turn_left,
            KeyCode::ArrowRight => &mut self.held.turn_right,
            KeyCode::ArrowUp => &mut self.held.turn_up,
            KeyCode::ArrowDown => &mut self.held.turn_down,
            _ => return false,
        };
        *slot = pressed;
        true
    }

    /// Drop all held keys, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        self.held = HeldKeys::default();
    }

    /// Advance `player` by `dt` seconds of held input.
    pub fn apply(&self, player: &mut Mat4, dt: f32) {
        let h = &self.held;
        let axis = |pos: bool, neg: bool| (pos as i32 - neg as i32) as f32;

        let translation = Vec3::new(
            axis(h.right, h.left),
            axis(h.up, h.down),
            axis(h.back, h.forward),
        );
        let yaw = axis(h.turn_left, h.turn_right) * self.turn_speed * dt;
        let pitch = axis(h.turn_up, h.turn_down) * self.turn_speed * dt;

        if translation != Vec3::ZERO {
            *player *= Mat4::from_translation(translation.normalize() * self.move_speed * dt);
        }
        if yaw != 0.0 {
            *player *= Mat4::from_rotation_y(yaw);
        }
        if pitch != 0.0 {
            *player *= Mat4::from_rotation_x(pitch);
        }
    }
}

/// Player pose standing at `position` and looking at `target`, +Y up.
pub fn player_pose(position: Vec3, target: Vec3) -> Mat4 {
    Mat4::look_at_rh(position, target, Vec3::Y).inverse()
}
