use std::collections::VecDeque;

use glam::UVec2;
use lumen_common::{InputSnapshot, InputState};

/// Window and input collaborator.
///
/// The server only needs the framebuffer extent, an event pump, the current
/// input state, a close flag and a present call.
pub trait Window {
    fn framebuffer_size(&self) -> UVec2;

    /// Pump pending events and refresh [`input`](Self::input).
    fn poll_events(&mut self);

    fn input(&self) -> &dyn InputState;

    fn should_close(&self) -> bool;

    fn swap_buffers(&mut self);
}

/// Window without a display, fed by scripted input.
///
/// Each [`poll_events`](Window::poll_events) consumes the next queued input
/// snapshot; once the queue is empty the input is idle.
#[derive(Debug, Clone)]
pub struct HeadlessWindow {
    size: UVec2,
    queued_input: VecDeque<InputSnapshot>,
    current_input: InputSnapshot,
    close_requested: bool,
    frames_presented: u64,
}

impl HeadlessWindow {
    pub fn new(size: UVec2) -> Self {
        Self {
            size,
            queued_input: VecDeque::new(),
            current_input: InputSnapshot::default(),
            close_requested: false,
            frames_presented: 0,
        }
    }

    pub fn push_input(&mut self, input: InputSnapshot) {
        self.queued_input.push_back(input);
    }

    pub fn resize(&mut self, size: UVec2) {
        self.size = size;
    }

    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }
}

impl Window for HeadlessWindow {
    fn framebuffer_size(&self) -> UVec2 {
        self.size
    }

    fn poll_events(&mut self) {
        self.current_input = self.queued_input.pop_front().unwrap_or_default();
    }

    fn input(&self) -> &dyn InputState {
        &self.current_input
    }

    fn should_close(&self) -> bool {
        self.close_requested
    }

    fn swap_buffers(&mut self) {
        self.frames_presented += 1;
    }
}
