use serde::{Deserialize, Serialize};

use super::TimingMetrics;

/// Raw performance entries as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VitalEntry {
    /// A new largest-contentful-paint candidate; the latest one wins.
    #[serde(rename_all = "camelCase")]
    LargestContentfulPaint { render_time_ms: f64 },
    /// Only the first input of a page counts.
    #[serde(rename_all = "camelCase")]
    FirstInput {
        start_time_ms: f64,
        processing_start_ms: f64,
    },
    /// Shifts right after user input are expected and not counted.
    #[serde(rename_all = "camelCase")]
    LayoutShift { value: f64, had_recent_input: bool },
}

/// Folds [`VitalEntry`]s into the aggregated [`TimingMetrics`].
#[derive(Debug, Clone, Default)]
pub struct VitalsAggregator {
    lcp: f64,
    fid: Option<f64>,
    cls: f64,
}

impl VitalsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: VitalEntry) {
        match entry {
            VitalEntry::LargestContentfulPaint { render_time_ms } => {
                self.lcp = non_negative(render_time_ms);
            }
            VitalEntry::FirstInput {
                start_time_ms,
                processing_start_ms,
            } => {
                if self.fid.is_none() {
                    self.fid = Some(non_negative(processing_start_ms - start_time_ms));
                }
            }
            VitalEntry::LayoutShift {
                value,
                had_recent_input,
            } => {
                if !had_recent_input {
                    self.cls += non_negative(value);
                }
            }
        }
    }

    pub fn timing(&self) -> TimingMetrics {
        TimingMetrics {
            lcp: self.lcp,
            fid: self.fid.unwrap_or(0.0),
            cls: self.cls,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// also maps NaN to zero
fn non_negative(value: f64) -> f64 {
    value.max(0.0)
}
