use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, MutexGuard},
};

use log::debug;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::settings::SystemSettings;

use super::{ElementId, MemoryUsage, Platform, TouchSupport, Viewport};

/// Native binding for headless hosts.
///
/// Memory introspection reads the current process through `sysinfo`. There is
/// no document or real viewport: geometry and user agent come from settings
/// and can be changed by the host, intersection watches and root classes are
/// recorded so the host can drive them.
pub struct SystemPlatform {
    inner: Mutex<SystemState>,
}

struct SystemState {
    system: System,
    pid: Pid,
    memory_limit: Option<u64>,
    viewport: Viewport,
    user_agent: String,
    watched: HashMap<ElementId, f64>,
    root_classes: HashSet<String>,
}

impl SystemPlatform {
    pub fn new(settings: &SystemSettings) -> Self {
        let mut system = System::new();
        let pid = Pid::from_u32(std::process::id());
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        Self {
            inner: Mutex::new(SystemState {
                system,
                pid,
                memory_limit: settings.memory_limit_bytes,
                viewport: Viewport {
                    width: settings.viewport_width,
                    height: settings.viewport_height,
                },
                user_agent: settings.user_agent.clone(),
                watched: HashMap::new(),
                root_classes: HashSet::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SystemState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Update the geometry reported to the device classifier. The host should
    /// publish a resize event afterwards.
    pub fn set_viewport(&self, width: u32, height: u32) {
        self.state().viewport = Viewport { width, height };
    }

    /// Elements currently watched, with their pre-trigger margin.
    pub fn watched_elements(&self) -> Vec<(ElementId, f64)> {
        self.state()
            .watched
            .iter()
            .map(|(id, margin)| (*id, *margin))
            .collect()
    }

    pub fn has_root_class(&self, class: &str) -> bool {
        self.state().root_classes.contains(class)
    }
}

impl Platform for SystemPlatform {
    fn viewport(&self) -> Viewport {
        self.state().viewport
    }

    fn user_agent(&self) -> String {
        self.state().user_agent.clone()
    }

    fn touch_support(&self) -> TouchSupport {
        TouchSupport::default()
    }

    fn memory_usage(&self) -> Option<MemoryUsage> {
        let mut state = self.state();
        let pid = state.pid;
        state.system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        let (used, total) = {
            let process = state.system.process(pid)?;
            (process.memory(), process.virtual_memory())
        };

        let limit = match state.memory_limit {
            Some(limit) => limit,
            None => {
                state.system.refresh_memory();
                state.system.total_memory()
            }
        };

        if limit == 0 {
            return None;
        }

        Some(MemoryUsage { used, total, limit })
    }

    fn observe_intersection(&self, element: ElementId, root_margin: f64) {
        debug!("observing {element} with margin {root_margin}");
        self.state().watched.insert(element, root_margin);
    }

    fn unobserve_intersection(&self, element: ElementId) {
        debug!("unobserving {element}");
        self.state().watched.remove(&element);
    }

    fn set_root_class(&self, class: &str, present: bool) {
        let mut state = self.state();
        if present {
            state.root_classes.insert(class.to_string());
        } else {
            state.root_classes.remove(class);
        }
    }
}
