use std::collections::HashSet;

use glam::Vec2;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Identifier for a physical keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
    Digit(u8),
    Function(u8),
}

impl KeyCode {
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(button) = parse_named_key(name) {
            return Some(button);
        }
        if name.len() == 1 {
            let ch = name.chars().next()?;
            if ch.is_ascii_alphabetic() {
                return Some(Self::Character(ch.to_ascii_uppercase()));
            }
            if ch.is_ascii_digit() {
                return Some(Self::Digit(ch as u8 - b'0'));
            }
        }
        if let Some(function) = name.strip_prefix('F').or_else(|| name.strip_prefix('f')) {
            if let Ok(index) = function.parse::<u8>() {
                if index >= 1 && index <= 25 {
                    return Some(Self::Function(index));
                }
            }
        }
        None
    }
}

fn parse_named_key(name: &str) -> Option<KeyCode> {
    use NamedKey::*;
    let key = match name {
        "Space" => Space,
        "Enter" | "Return" => Enter,
        "Tab" => Tab,
        "Left" => Left,
        "Right" => Right,
        "Up" => Up,
        "Down" => Down,
        "Escape" | "Esc" => Escape,
        "Backspace" => Backspace,
        "Home" => Home,
        "End" => End,
        "PageUp" => PageUp,
        "PageDown" => PageDown,
        "LeftShift" | "LShift" => LeftShift,
        "RightShift" | "RShift" => RightShift,
        "LeftCtrl" | "LControl" => LeftCtrl,
        "RightCtrl" | "RControl" => RightCtrl,
        "LeftAlt" | "LAlt" => LeftAlt,
        "RightAlt" | "RAlt" => RightAlt,
        _ => return None,
    };
    Some(KeyCode::Named(key))
}

/// Named keys the walk-through binds or accepts on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedKey {
    Space,
    Enter,
    Tab,
    Left,
    Right,
    Up,
    Down,
    Escape,
    Backspace,
    Home,
    End,
    PageUp,
    PageDown,
    LeftShift,
    RightShift,
    LeftCtrl,
    RightCtrl,
    LeftAlt,
    RightAlt,
}

/// Thread-safe store written by the window event handler and drained once
/// per frame by the session.
#[derive(Debug, Default)]
pub struct InputState {
    keys: RwLock<HashSet<KeyCode>>,
    pressed: RwLock<HashSet<KeyCode>>,
    pointer_delta: RwLock<Vec2>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` held; a key that was up also registers a press edge.
    pub fn set_key_down(&self, key: KeyCode) {
        if self.keys.write().insert(key) {
            self.pressed.write().insert(key);
        }
    }

    pub fn set_key_up(&self, key: KeyCode) {
        self.keys.write().remove(&key);
    }

    /// Accumulates relative pointer motion in pixels.
    pub fn add_pointer_delta(&self, delta: Vec2) {
        *self.pointer_delta.write() += delta;
    }

    /// Copies the held keys and drains press edges and pointer motion.
    pub fn snapshot(&self) -> InputSnapshot {
        InputSnapshot {
            held: self.keys.read().clone(),
            pressed: std::mem::take(&mut *self.pressed.write()),
            pointer_delta: std::mem::take(&mut *self.pointer_delta.write()),
        }
    }
}

/// Input seen by one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSnapshot {
    pub held: HashSet<KeyCode>,
    pub pressed: HashSet<KeyCode>,
    pub pointer_delta: Vec2,
}

impl InputSnapshot {
    pub fn is_held(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    pub fn was_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }

    /// Snapshot with `keys` held for the whole frame, used by headless runs.
    pub fn holding(keys: impl IntoIterator<Item = KeyCode>) -> Self {
        Self {
            held: keys.into_iter().collect(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_and_character_keys() {
        assert_eq!(
            KeyCode::from_name("Space"),
            Some(KeyCode::Named(NamedKey::Space))
        );
        assert_eq!(KeyCode::from_name("a"), Some(KeyCode::Character('A')));
        assert_eq!(KeyCode::from_name("F2"), Some(KeyCode::Function(2)));
        assert_eq!(KeyCode::from_name("F1"), Some(KeyCode::Function(1)));
        assert_eq!(KeyCode::from_name("Mouse1"), None);
    }

    #[test]
    fn input_state_tracks_keys() {
        let state = InputState::new();
        let space = KeyCode::Named(NamedKey::Space);
        state.set_key_down(space);
        assert!(state.snapshot().is_held(space));
        state.set_key_up(space);
        assert!(!state.snapshot().is_held(space));
    }

    #[test]
    fn snapshot_drains_edges_and_pointer() {
        let state = InputState::new();
        let w = KeyCode::Character('W');
        state.set_key_down(w);
        state.set_key_down(w);
        state.add_pointer_delta(Vec2::new(3.0, -1.0));
        state.add_pointer_delta(Vec2::new(1.0, 1.0));

        let first = state.snapshot();
        assert!(first.is_held(w));
        assert!(first.was_pressed(w));
        assert_eq!(first.pointer_delta, Vec2::new(4.0, 0.0));

        let second = state.snapshot();
        assert!(second.is_held(w));
        assert!(!second.was_pressed(w));
        assert_eq!(second.pointer_delta, Vec2::ZERO);
    }
}
