use serde::{Deserialize, Serialize};

use crate::platform::TouchPoint;

/// Single-point gesture state. Coordinates survive release until the next
/// touch-start overwrites them.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TouchState {
    pub is_active: bool,
    pub start_x: f64,
    pub start_y: f64,
    pub current_x: f64,
    pub current_y: f64,
    pub delta_x: f64,
    pub delta_y: f64,
}

impl TouchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, point: TouchPoint) {
        *self = Self {
            is_active: true,
            start_x: point.x,
            start_y: point.y,
            current_x: point.x,
            current_y: point.y,
            delta_x: 0.0,
            delta_y: 0.0,
        };
    }

    /// Deltas are measured from the start point, not from the previous move.
    pub fn move_to(&mut self, point: TouchPoint) {
        self.current_x = point.x;
        self.current_y = point.y;
        self.delta_x = self.current_x - self.start_x;
        self.delta_y = self.current_y - self.start_y;
    }

    pub fn release(&mut self) {
        self.is_active = false;
    }
}
