use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    platform::{ElementId, Platform, PlatformEvent},
    settings::LazyLoadSettings,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// A visual element whose real resource is assigned only once it nears the viewport.
pub trait DeferredElement: Send + Sync {
    fn id(&self) -> ElementId;

    /// The locator to load once visible; `None` when the element is not
    /// flagged for deferred loading.
    fn deferred_source(&self) -> Option<String>;

    /// Hand the real locator to the element, which starts loading it. The host
    /// reports the outcome through [`PlatformEvent::ResourceLoaded`] or
    /// [`PlatformEvent::ResourceFailed`].
    fn assign_source(&self, source: &str);
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStatus {
    pub is_in_view: bool,
    pub is_loading: bool,
    pub is_loaded: bool,
    /// Set when the load failed; the element stays in view but not loaded.
    pub failure: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchState {
    Unbound,
    Armed,
    Fired,
}

/// One-shot binding between an element and the intersection watcher.
pub struct ObserverBridge {
    platform: Arc<dyn Platform>,
    root_margin: f64,
    element: Option<Arc<dyn DeferredElement>>,
    watch: WatchState,
    status: ResourceStatus,
}

impl ObserverBridge {
    pub fn new(platform: Arc<dyn Platform>, settings: &LazyLoadSettings) -> Self {
        Self {
            platform,
            root_margin: settings.root_margin,
            element: None,
            watch: WatchState::Unbound,
            status: ResourceStatus::default(),
        }
    }

    /// Attach to `element` and arm the watcher. With no element the bridge
    /// stays inert until bound again. Any previous binding is released first.
    pub fn bind(&mut self, element: Option<Arc<dyn DeferredElement>>) {
        self.release();
        self.status = ResourceStatus::default();

        let Some(element) = element else {
            return;
        };

        self.platform
            .observe_intersection(element.id(), self.root_margin);
        self.element = Some(element);
        self.watch = WatchState::Armed;
    }

    pub fn element_id(&self) -> Option<ElementId> {
        self.element.as_ref().map(|element| element.id())
    }

    pub fn is_armed(&self) -> bool {
        self.watch == WatchState::Armed
    }

    pub fn has_fired(&self) -> bool {
        self.watch == WatchState::Fired
    }

    pub fn status(&self) -> ResourceStatus {
        self.status.clone()
    }

    /// Returns true only for the single transition into view.
    pub fn handle_intersection(&mut self, intersecting: bool) -> bool {
        match self.fire(intersecting) {
            Some(fired) => {
                fired.run();
                true
            }
            None => false,
        }
    }

    /// State half of [`ObserverBridge::handle_intersection`]: moves an armed
    /// bridge to fired and updates its status, leaving the host calls to the
    /// returned [`FiredLoad`].
    pub fn fire(&mut self, intersecting: bool) -> Option<FiredLoad> {
        if !intersecting || self.watch != WatchState::Armed {
            return None;
        }
        let element = self.element.clone()?;

        self.watch = WatchState::Fired;
        self.status.is_in_view = true;

        let source = match element.deferred_source() {
            Some(source) if !source.is_empty() => {
                log_debug!("element {} in view, loading {}", element.id(), source);
                self.status.is_loading = true;
                Some(source)
            }
            _ => {
                log_warn!("element {} entered view without a deferred source", element.id());
                self.status.failure = Some("no deferred source".into());
                None
            }
        };

        Some(FiredLoad {
            platform: Arc::clone(&self.platform),
            element,
            source,
        })
    }

    pub fn handle_load_complete(&mut self) {
        if !self.status.is_loading {
            return;
        }
        self.status.is_loading = false;
        self.status.is_loaded = true;
    }

    pub fn handle_load_failed(&mut self, reason: &str) {
        if !self.status.is_loading {
            return;
        }
        if let Some(id) = self.element_id() {
            log_warn!("deferred resource for element {id} failed: {reason}");
        }
        self.status.is_loading = false;
        self.status.failure = Some(reason.to_string());
    }

    /// Returns true when the event concerned this bridge's element.
    pub fn handle_event(&mut self, event: &PlatformEvent) -> bool {
        let Some(id) = self.element_id() else {
            return false;
        };

        match event {
            PlatformEvent::Intersection {
                element,
                intersecting,
            } if *element == id => {
                self.handle_intersection(*intersecting);
                true
            }
            PlatformEvent::ResourceLoaded { element } if *element == id => {
                self.handle_load_complete();
                true
            }
            PlatformEvent::ResourceFailed { element, reason } if *element == id => {
                self.handle_load_failed(reason);
                true
            }
            _ => false,
        }
    }

    /// Unsubscribe a watcher that never fired. Load state is kept.
    pub fn release(&mut self) {
        if self.watch == WatchState::Armed {
            if let Some(id) = self.element_id() {
                self.platform.unobserve_intersection(id);
            }
        }
        self.watch = WatchState::Unbound;
    }
}

/// Host calls owed by a bridge that just fired: detach the watcher, then
/// hand the locator to the element.
///
/// The host may report the load synchronously from inside
/// [`DeferredElement::assign_source`], so run this with no loader lock held.
#[must_use = "a fired load does nothing until run"]
pub struct FiredLoad {
    platform: Arc<dyn Platform>,
    element: Arc<dyn DeferredElement>,
    source: Option<String>,
}

impl FiredLoad {
    pub fn element_id(&self) -> ElementId {
        self.element.id()
    }

    pub fn run(self) {
        self.platform.unobserve_intersection(self.element.id());
        if let Some(source) = &self.source {
            self.element.assign_source(source);
        }
    }
}

impl Drop for ObserverBridge {
    fn drop(&mut self) {
        self.release();
    }
}
