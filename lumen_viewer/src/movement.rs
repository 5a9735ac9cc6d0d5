//! Keyboard camera controller
//!
//! WASD moves in the horizontal plane, Q/E move down and up, arrow keys look
//! around. Y points down, matching Vulkan clip space.

use glfw::Key;
use lumen_engine::foundation::math::{constants, utils, Vec3};
use lumen_engine::render::vulkan::Window;
use lumen_engine::scene::Transform;

/// Largest pitch magnitude in radians, just short of looking straight up or down
pub const MAX_PITCH: f32 = 85.0 * constants::DEG_TO_RAD;

/// Source of key state
pub trait KeyInput {
    /// Whether `key` is held down
    fn is_pressed(&self, key: Key) -> bool;
}

impl KeyInput for Window {
    fn is_pressed(&self, key: Key) -> bool {
        self.key_pressed(key)
    }
}

/// Moves a viewer transform from keyboard state
#[derive(Debug, Clone, Copy)]
pub struct KeyboardMovementController {
    /// Units per second
    pub move_speed: f32,
    /// Radians per second
    pub look_speed: f32,
}

impl KeyboardMovementController {
    /// Create a controller with the given speeds
    pub const fn new(move_speed: f32, look_speed: f32) -> Self {
        Self { move_speed, look_speed }
    }

    /// Apply one frame of input to `viewer`
    pub fn move_in_plane_xz(&self, keys: &impl KeyInput, frame_time: f32, viewer: &mut Transform) {
        let axis = |positive: Key, negative: Key| {
            f32::from(u8::from(keys.is_pressed(positive))) - f32::from(u8::from(keys.is_pressed(negative)))
        };

        let rotate = Vec3::new(axis(Key::Up, Key::Down), axis(Key::Right, Key::Left), 0.0);
        if rotate.norm_squared() > f32::EPSILON {
            viewer.rotation += self.look_speed * frame_time * rotate.normalize();
        }
        viewer.rotation.x = viewer.rotation.x.clamp(-MAX_PITCH, MAX_PITCH);
        viewer.rotation.y = utils::wrap_angle(viewer.rotation.y);

        let yaw = viewer.rotation.y;
        let forward = Vec3::new(yaw.sin(), 0.0, yaw.cos());
        let right = Vec3::new(forward.z, 0.0, -forward.x);
        let up = Vec3::new(0.0, -1.0, 0.0);

        let direction = forward * axis(Key::W, Key::S) + right * axis(Key::D, Key::A) + up * axis(Key::E, Key::Q);
        if direction.norm_squared() > f32::EPSILON {
            viewer.translation += self.move_speed * frame_time * direction.normalize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::HashSet;

    struct HeldKeys(HashSet<Key>);

    impl KeyInput for HeldKeys {
        fn is_pressed(&self, key: Key) -> bool {
            self.0.contains(&key)
        }
    }

    fn held(keys: &[Key]) -> HeldKeys {
        HeldKeys(keys.iter().copied().collect())
    }

    #[test]
    fn test_no_input_leaves_viewer_in_place() {
        let controller = KeyboardMovementController::new(3.0, 1.5);
        let mut viewer = Transform::default();
        controller.move_in_plane_xz(&held(&[]), 0.5, &mut viewer);
        assert_eq!(viewer, Transform::default());
    }

    #[test]
    fn test_forward_follows_yaw() {
        let controller = KeyboardMovementController::new(2.0, 1.0);
        let mut viewer = Transform::default();
        controller.move_in_plane_xz(&held(&[Key::W]), 0.5, &mut viewer);
        assert_relative_eq!(viewer.translation, Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-6);

        let mut turned = Transform::default();
        turned.rotation.y = constants::PI / 2.0;
        controller.move_in_plane_xz(&held(&[Key::W]), 0.5, &mut turned);
        assert_relative_eq!(turned.translation, Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_diagonal_movement_is_normalized() {
        let controller = KeyboardMovementController::new(1.0, 1.0);
        let mut viewer = Transform::default();
        controller.move_in_plane_xz(&held(&[Key::W, Key::D]), 1.0, &mut viewer);
        assert_relative_eq!(viewer.translation.norm(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_up_is_negative_y() {
        let controller = KeyboardMovementController::new(1.0, 1.0);
        let mut viewer = Transform::default();
        controller.move_in_plane_xz(&held(&[Key::E]), 1.0, &mut viewer);
        assert_relative_eq!(viewer.translation.y, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_pitch_is_clamped_and_yaw_wrapped() {
        let controller = KeyboardMovementController::new(1.0, 10.0);
        let mut viewer = Transform::default();
        controller.move_in_plane_xz(&held(&[Key::Up]), 1.0, &mut viewer);
        assert_relative_eq!(viewer.rotation.x, MAX_PITCH);

        let mut spinning = Transform::default();
        spinning.rotation.y = constants::TAU - 0.1;
        controller.move_in_plane_xz(&held(&[Key::Right]), 0.05, &mut spinning);
        assert!(spinning.rotation.y >= 0.0 && spinning.rotation.y < constants::TAU);
        assert_relative_eq!(spinning.rotation.y, 0.4, epsilon = 1e-5);
    }
}
