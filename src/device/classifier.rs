use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    platform::{Platform, PlatformEvent},
    settings::DeviceSettings,
};

use super::DeviceState;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Recomputes [`DeviceState`] from the platform and publishes it to subscribers.
#[derive(Clone)]
pub struct DeviceClassifier {
    platform: Arc<dyn Platform>,
    settings: DeviceSettings,
    state_tx: Arc<watch::Sender<DeviceState>>,
}

impl DeviceClassifier {
    pub fn new(platform: Arc<dyn Platform>, settings: DeviceSettings) -> Self {
        let (state_tx, _) = watch::channel(DeviceState::default());
        Self {
            platform,
            settings,
            state_tx: Arc::new(state_tx),
        }
    }

    /// Reclassify the device, sync the root marker class, and publish the
    /// new state if it changed.
    pub fn refresh(&self) -> DeviceState {
        let state = DeviceState::classify(
            self.platform.viewport(),
            &self.platform.user_agent(),
            self.platform.touch_support(),
            self.settings.mobile_breakpoint,
        );

        self.platform
            .set_root_class(&self.settings.marker_class, state.is_mobile);

        let changed = self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
        if changed {
            log_info!(
                "device reclassified: mobile={} orientation={:?} touch={}",
                state.is_mobile,
                state.orientation,
                state.is_touch
            );
        }

        state
    }

    /// Returns true when the event was a geometry signal and triggered a refresh.
    pub fn handle_event(&self, event: &PlatformEvent) -> bool {
        match event {
            PlatformEvent::Resize | PlatformEvent::OrientationChange => {
                self.refresh();
                true
            }
            _ => false,
        }
    }

    pub fn state(&self) -> DeviceState {
        *self.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<DeviceState> {
        self.state_tx.subscribe()
    }

    pub fn marker_class(&self) -> &str {
        &self.settings.marker_class
    }
}
