use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use log::{info, warn};
use perfwatch_lib::{utils::init_logging, Monitor, SettingsStore, SystemPlatform};

const DEFAULT_SETTINGS_FILE: &str = "perfwatch.json";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_logging();

    let settings_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("PERFWATCH_CONFIG").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));

    let store = SettingsStore::new(settings_path.clone())?;
    let settings = store.settings();
    info!("perfwatch starting up (settings: {})", settings_path.display());

    let platform = Arc::new(SystemPlatform::new(&settings.system));
    let monitor = Monitor::new(platform, &settings);
    monitor.start()?;

    let device = monitor.device_state();
    info!(
        "device: mobile={} orientation={:?} touch={}",
        device.is_mobile, device.orientation, device.is_touch
    );

    let mut scores = monitor.subscribe_score();
    loop {
        tokio::select! {
            changed = scores.changed() => {
                if changed.is_err() {
                    break;
                }
                let score = *scores.borrow_and_update();
                match (score, monitor.latest_memory()) {
                    (Some(score), Some(memory)) => info!(
                        "performance score {score}, memory {:.1}% ({} bytes resident)",
                        memory.percentage, memory.used
                    ),
                    (Some(score), None) => info!("performance score {score}, memory unavailable"),
                    (None, _) => warn!("score channel published no value"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
        }
    }

    monitor.shutdown().await
}
