//! Keyboard state table

use std::collections::HashSet;
use winit::event::ElementState;
use winit::keyboard::KeyCode;

/// Which keys are currently held, as reported by the platform layer.
///
/// The engine polls this during the variable update to turn held movement
/// keys into continuous camera motion.
#[derive(Debug, Default)]
pub struct Input {
    pressed_keys: HashSet<KeyCode>,
}

impl Input {
    /// Create an empty key table
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a keyboard event.
    ///
    /// Returns `true` when the event changes the key's state, so OS key
    /// repeats can be told apart from real presses.
    pub fn process_keyboard(&mut self, key_code: KeyCode, state: ElementState) -> bool {
        match state {
            ElementState::Pressed => self.pressed_keys.insert(key_code),
            ElementState::Released => self.pressed_keys.remove(&key_code),
        }
    }

    /// Check if a key is currently pressed
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    /// Check if any of the given keys is pressed
    pub fn any_pressed(&self, keys: &[KeyCode]) -> bool {
        keys.iter().any(|key| self.is_key_pressed(*key))
    }

    /// Forget every held key, e.g. after focus loss when release events
    /// will never arrive.
    pub fn release_all(&mut self) {
        self.pressed_keys.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_and_release() {
        let mut input = Input::new();

        assert!(input.process_keyboard(KeyCode::KeyW, ElementState::Pressed));
        assert!(input.is_key_pressed(KeyCode::KeyW));

        assert!(input.process_keyboard(KeyCode::KeyW, ElementState::Released));
        assert!(!input.is_key_pressed(KeyCode::KeyW));
    }

    #[test]
    fn test_repeat_is_not_a_change() {
        let mut input = Input::new();

        assert!(input.process_keyboard(KeyCode::KeyP, ElementState::Pressed));
        assert!(!input.process_keyboard(KeyCode::KeyP, ElementState::Pressed));
    }

    #[test]
    fn test_any_pressed_and_release_all() {
        let mut input = Input::new();
        input.process_keyboard(KeyCode::ShiftRight, ElementState::Pressed);

        assert!(input.any_pressed(&[KeyCode::ShiftLeft, KeyCode::ShiftRight]));

        input.release_all();
        assert!(!input.any_pressed(&[KeyCode::ShiftLeft, KeyCode::ShiftRight]));
    }
}
