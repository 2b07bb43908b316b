use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock, time::Duration};

/// Thresholds and penalty used to derive the performance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreSettings {
    pub lcp_threshold_ms: f64,
    pub fid_threshold_ms: f64,
    pub cls_threshold: f64,
    pub memory_threshold_percent: f64,
    /// Points subtracted per violated threshold.
    pub penalty: u8,
}

impl Default for ScoreSettings {
    fn default() -> Self {
        Self {
            lcp_threshold_ms: 2500.0,
            fid_threshold_ms: 100.0,
            cls_threshold: 0.1,
            memory_threshold_percent: 80.0,
            penalty: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricsSettings {
    pub timing_interval_ms: u64,
    pub memory_interval_ms: u64,
    /// Memory percentage above which the cleanup registry is drained.
    pub memory_pressure_percent: f64,
    pub score: ScoreSettings,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            timing_interval_ms: 10_000,
            memory_interval_ms: 30_000,
            memory_pressure_percent: 80.0,
            score: ScoreSettings::default(),
        }
    }
}

impl MetricsSettings {
    pub fn timing_interval(&self) -> Duration {
        Duration::from_millis(self.timing_interval_ms.max(1))
    }

    pub fn memory_interval(&self) -> Duration {
        Duration::from_millis(self.memory_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LazyLoadSettings {
    /// Distance ahead of the viewport edge at which a deferred element counts as visible.
    pub root_margin: f64,
}

impl Default for LazyLoadSettings {
    fn default() -> Self {
        Self { root_margin: 50.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceSettings {
    pub mobile_breakpoint: u32,
    pub marker_class: String,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            mobile_breakpoint: 768,
            marker_class: "mobile-device".into(),
        }
    }
}

/// Parameters for the native platform binding used by the binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemSettings {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: String,
    /// Memory budget the process is measured against; total system memory when unset.
    pub memory_limit_bytes: Option<u64>,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            viewport_width: 1280,
            viewport_height: 800,
            user_agent: concat!("perfwatch/", env!("CARGO_PKG_VERSION")).into(),
            memory_limit_bytes: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitorSettings {
    pub metrics: MetricsSettings,
    pub lazy_load: LazyLoadSettings,
    pub device: DeviceSettings,
    pub system: SystemSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<MonitorSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Ignoring malformed settings in {}: {err}; using defaults",
                    path.display()
                );
                MonitorSettings::default()
            })
        } else {
            MonitorSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn settings(&self) -> MonitorSettings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update(&self, settings: MonitorSettings) -> Result<()> {
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = settings;
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: MonitorSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Malformed settings in {}", self.path.display()))?;
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = data;
        Ok(())
    }

    fn persist(&self, data: &MonitorSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
