//! Viewport-triggered loading of deferred visual resources.

pub mod bridge;
pub mod loader;

pub use bridge::{DeferredElement, FiredLoad, ObserverBridge, ResourceStatus};
pub use loader::{ElementContainer, LazyLoader};
