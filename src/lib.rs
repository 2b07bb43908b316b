//! Client-side performance and resource monitoring.
//!
//! [`Monitor`] wires the pieces together: device classification, touch
//! gesture tracking, viewport-triggered lazy loading, periodic performance
//! and memory sampling, and the cleanup registry drained under memory
//! pressure. All host access goes through the [`platform::Platform`] trait.

pub mod cleanup;
pub mod device;
pub mod gesture;
pub mod lazy;
pub mod metrics;
pub mod monitor;
pub mod platform;
pub mod scheduler;
pub mod settings;
pub mod utils;

pub use cleanup::{CleanupRegistry, CleanupReport};
pub use device::{DeviceClassifier, DeviceState, Orientation};
pub use gesture::{GestureTracker, TouchState};
pub use lazy::{DeferredElement, ElementContainer, LazyLoader, ObserverBridge, ResourceStatus};
pub use metrics::{MetricsCollector, MetricsSnapshot, VitalEntry};
pub use monitor::Monitor;
pub use platform::{ElementId, EventBus, Platform, PlatformEvent, SystemPlatform};
pub use scheduler::{Scheduler, TaskHandle};
pub use settings::{MonitorSettings, SettingsStore};
