use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{
    platform::{ElementId, Platform, PlatformEvent},
    settings::LazyLoadSettings,
};

use super::{DeferredElement, ObserverBridge, ResourceStatus};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Anything that can enumerate its visual elements, e.g. a rendered page section.
pub trait ElementContainer {
    fn elements(&self) -> Vec<Arc<dyn DeferredElement>>;
}

impl ElementContainer for Vec<Arc<dyn DeferredElement>> {
    fn elements(&self) -> Vec<Arc<dyn DeferredElement>> {
        self.clone()
    }
}

/// The set of live [`ObserverBridge`]s, keyed by element.
pub struct LazyLoader {
    platform: Arc<dyn Platform>,
    settings: LazyLoadSettings,
    bridges: Mutex<HashMap<ElementId, ObserverBridge>>,
}

impl LazyLoader {
    pub fn new(platform: Arc<dyn Platform>, settings: LazyLoadSettings) -> Self {
        Self {
            platform,
            settings,
            bridges: Mutex::new(HashMap::new()),
        }
    }

    /// Bind a bridge to `element`, replacing any existing bridge for it.
    pub fn bind(&self, element: Arc<dyn DeferredElement>) -> ElementId {
        let id = element.id();
        // the old bridge must drop (and unobserve) before the new one observes
        drop(self.lock().remove(&id));

        let mut bridge = ObserverBridge::new(Arc::clone(&self.platform), &self.settings);
        bridge.bind(Some(element));
        let replaced = self.lock().insert(id, bridge);
        drop(replaced);
        id
    }

    /// Bind every element of `container` flagged for deferred loading, i.e.
    /// carrying a non-empty deferred locator.
    pub fn bind_container(&self, container: &dyn ElementContainer) -> Vec<ElementId> {
        let ids: Vec<ElementId> = container
            .elements()
            .into_iter()
            .filter(|element| {
                element
                    .deferred_source()
                    .is_some_and(|source| !source.is_empty())
            })
            .map(|element| self.bind(element))
            .collect();

        log_info!("bound {} deferred elements for lazy loading", ids.len());
        ids
    }

    pub fn status(&self, element: ElementId) -> Option<ResourceStatus> {
        self.lock().get(&element).map(ObserverBridge::status)
    }

    pub fn statuses(&self) -> HashMap<ElementId, ResourceStatus> {
        self.lock()
            .iter()
            .map(|(id, bridge)| (*id, bridge.status()))
            .collect()
    }

    /// Count of bridges still waiting for their element to enter view.
    pub fn pending(&self) -> usize {
        self.lock().values().filter(|bridge| bridge.is_armed()).count()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns true when some bridge consumed the event.
    ///
    /// Host calls triggered by a bridge firing run after the lock is released,
    /// so the host may call back into the loader from them.
    pub fn handle_event(&self, event: &PlatformEvent) -> bool {
        let target = match event {
            PlatformEvent::Intersection { element, .. }
            | PlatformEvent::ResourceLoaded { element }
            | PlatformEvent::ResourceFailed { element, .. } => *element,
            _ => return false,
        };

        let fired = {
            let mut bridges = self.lock();
            let Some(bridge) = bridges.get_mut(&target) else {
                return false;
            };
            match event {
                PlatformEvent::Intersection { intersecting, .. } => bridge.fire(*intersecting),
                _ => {
                    bridge.handle_event(event);
                    None
                }
            }
        };

        if let Some(fired) = fired {
            fired.run();
        }
        true
    }

    pub fn release(&self, element: ElementId) -> bool {
        let removed = self.lock().remove(&element);
        removed.is_some()
    }

    pub fn release_all(&self) -> usize {
        let bridges = std::mem::take(&mut *self.lock());
        bridges.len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ElementId, ObserverBridge>> {
        match self.bridges.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
