use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use super::{ElementId, MemoryUsage, Platform, TouchSupport, Viewport};

/// Deterministic platform for unit tests; every capability is settable.
pub(crate) struct FakePlatform {
    viewport: Mutex<Viewport>,
    user_agent: Mutex<String>,
    touch: Mutex<TouchSupport>,
    memory: Mutex<Option<MemoryUsage>>,
    release_hint: bool,
    release_calls: AtomicUsize,
    watched: Mutex<HashMap<ElementId, f64>>,
    root_classes: Mutex<HashSet<String>>,
}

impl FakePlatform {
    pub(crate) fn new() -> Self {
        Self {
            viewport: Mutex::new(Viewport {
                width: 1024,
                height: 768,
            }),
            user_agent: Mutex::new("Mozilla/5.0 (X11; Linux x86_64)".into()),
            touch: Mutex::new(TouchSupport::default()),
            memory: Mutex::new(None),
            release_hint: false,
            release_calls: AtomicUsize::new(0),
            watched: Mutex::new(HashMap::new()),
            root_classes: Mutex::new(HashSet::new()),
        }
    }

    pub(crate) fn with_release_hint(mut self) -> Self {
        self.release_hint = true;
        self
    }

    pub(crate) fn set_viewport(&self, width: u32, height: u32) {
        *self.viewport.lock().unwrap() = Viewport { width, height };
    }

    pub(crate) fn set_user_agent(&self, user_agent: &str) {
        *self.user_agent.lock().unwrap() = user_agent.to_string();
    }

    pub(crate) fn set_touch(&self, touch: TouchSupport) {
        *self.touch.lock().unwrap() = touch;
    }

    pub(crate) fn set_memory(&self, used: u64, limit: u64) {
        *self.memory.lock().unwrap() = Some(MemoryUsage {
            used,
            total: used,
            limit,
        });
    }

    pub(crate) fn release_calls(&self) -> usize {
        self.release_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn is_watched(&self, element: ElementId) -> bool {
        self.watched.lock().unwrap().contains_key(&element)
    }

    pub(crate) fn margin_for(&self, element: ElementId) -> Option<f64> {
        self.watched.lock().unwrap().get(&element).copied()
    }

    pub(crate) fn has_root_class(&self, class: &str) -> bool {
        self.root_classes.lock().unwrap().contains(class)
    }
}

impl Platform for FakePlatform {
    fn viewport(&self) -> Viewport {
        *self.viewport.lock().unwrap()
    }

    fn user_agent(&self) -> String {
        self.user_agent.lock().unwrap().clone()
    }

    fn touch_support(&self) -> TouchSupport {
        *self.touch.lock().unwrap()
    }

    fn memory_usage(&self) -> Option<MemoryUsage> {
        *self.memory.lock().unwrap()
    }

    fn release_unused_memory(&self) -> bool {
        if self.release_hint {
            self.release_calls.fetch_add(1, Ordering::SeqCst);
        }
        self.release_hint
    }

    fn observe_intersection(&self, element: ElementId, root_margin: f64) {
        self.watched.lock().unwrap().insert(element, root_margin);
    }

    fn unobserve_intersection(&self, element: ElementId) {
        self.watched.lock().unwrap().remove(&element);
    }

    fn set_root_class(&self, class: &str, present: bool) {
        let mut classes = self.root_classes.lock().unwrap();
        if present {
            classes.insert(class.to_string());
        } else {
            classes.remove(class);
        }
    }
}
