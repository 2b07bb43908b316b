use crate::platform::{PlatformEvent, TouchPoint};

use super::TouchState;

/// Tracks one touch gesture through start, move and end.
///
/// Only the first point of each touch list is considered; a move or end
/// without a preceding start leaves the state untouched.
#[derive(Debug, Clone, Default)]
pub struct GestureTracker {
    state: TouchState,
}

impl GestureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TouchState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active
    }

    pub fn touch_start(&mut self, points: &[TouchPoint]) {
        if let Some(first) = points.first() {
            self.state.begin(*first);
        }
    }

    pub fn touch_move(&mut self, points: &[TouchPoint]) {
        if !self.state.is_active {
            return;
        }
        if let Some(first) = points.first() {
            self.state.move_to(*first);
        }
    }

    pub fn touch_end(&mut self) {
        if self.state.is_active {
            self.state.release();
        }
    }

    /// Returns true when the event was a touch signal.
    pub fn handle_event(&mut self, event: &PlatformEvent) -> bool {
        match event {
            PlatformEvent::TouchStart { points } => self.touch_start(points),
            PlatformEvent::TouchMove { points } => self.touch_move(points),
            PlatformEvent::TouchEnd => self.touch_end(),
            _ => return false,
        }
        true
    }
}
