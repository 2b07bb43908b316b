pub mod state;
pub mod tracker;

pub use state::TouchState;
pub use tracker::GestureTracker;
