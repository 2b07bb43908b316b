//! Platform capabilities consumed by the monitoring subsystem.
//!
//! Everything the components would otherwise read from ambient globals goes
//! through [`Platform`]: production binds it to the host, tests bind it to a
//! deterministic fake.

pub mod events;
pub mod system;

#[cfg(test)]
pub(crate) mod fake;

pub use events::{EventBus, PlatformEvent, TouchPoint};
pub use system::SystemPlatform;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of a visual element that can be watched for intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(Uuid);

impl ElementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Result of the touch-capability probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TouchSupport {
    /// The host exposes touch-start events.
    pub touch_events: bool,
    pub max_touch_points: u32,
}

/// Raw memory introspection, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub used: u64,
    pub total: u64,
    pub limit: u64,
}

pub trait Platform: Send + Sync {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn viewport(&self) -> Viewport;

    fn user_agent(&self) -> String;

    fn touch_support(&self) -> TouchSupport;

    /// `None` when the host has no memory introspection.
    fn memory_usage(&self) -> Option<MemoryUsage> {
        None
    }

    /// Ask the host to give back unreferenced memory. Returns whether the hint
    /// exists on this platform; it carries no guarantee of any effect.
    fn release_unused_memory(&self) -> bool {
        false
    }

    /// Start delivering [`PlatformEvent::Intersection`] for `element`, with the
    /// viewport expanded by `root_margin` on every side.
    fn observe_intersection(&self, element: ElementId, root_margin: f64);

    fn unobserve_intersection(&self, element: ElementId);

    /// Add or remove a marker class on the document root.
    fn set_root_class(&self, class: &str, present: bool);
}
