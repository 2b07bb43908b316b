use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::platform::MemoryUsage;

/// Aggregated web-vitals timing signals. Durations in milliseconds, `cls` is a
/// unitless ratio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingMetrics {
    pub lcp: f64,
    pub fid: f64,
    pub cls: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetrics {
    pub used: u64,
    pub total: u64,
    /// `used / limit * 100`, clamped to [0, 100].
    pub percentage: f64,
}

impl MemoryMetrics {
    /// `None` when the platform reports no usable limit.
    pub fn from_usage(usage: MemoryUsage) -> Option<Self> {
        if usage.limit == 0 {
            return None;
        }
        let percentage = usage.used as f64 / usage.limit as f64 * 100.0;
        Some(Self {
            used: usage.used,
            total: usage.total,
            percentage: percentage.clamp(0.0, 100.0),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub timing: TimingMetrics,
    /// Absent entirely when the platform has no memory introspection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryMetrics>,
}

/// Duration of one measured resource load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadTiming {
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub succeeded: bool,
}
