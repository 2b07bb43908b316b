pub mod classifier;
pub mod state;

pub use classifier::DeviceClassifier;
pub use state::{is_mobile_user_agent, DeviceState, Orientation};
