use std::collections::BTreeSet;

use glam::Vec2;

/// Keys the engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    W,
    A,
    S,
    D,
    Space,
    LeftShift,
    Escape,
}

/// Input polled by the window collaborator once per frame.
pub trait InputState {
    fn is_key_pressed(&self, key: Key) -> bool;

    /// Cursor movement since the previous poll, in pixels.
    fn cursor_delta(&self) -> Vec2;
}

/// Input source with nothing pressed and a still cursor.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInput;

impl InputState for NoInput {
    fn is_key_pressed(&self, _key: Key) -> bool {
        false
    }

    fn cursor_delta(&self) -> Vec2 {
        Vec2::ZERO
    }
}

/// Recorded input for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSnapshot {
    pub pressed: BTreeSet<Key>,
    pub cursor_delta: Vec2,
}

impl InputSnapshot {
    pub fn with_key(mut self, key: Key) -> Self {
        self.pressed.insert(key);
        self
    }

    pub fn with_cursor_delta(mut self, delta: Vec2) -> Self {
        self.cursor_delta = delta;
        self
    }
}

impl InputState for InputSnapshot {
    fn is_key_pressed(&self, key: Key) -> bool {
        self.pressed.contains(&key)
    }

    fn cursor_delta(&self) -> Vec2 {
        self.cursor_delta
    }
}
