//! Deferred cleanup actions drained under memory pressure or on request.

use std::{
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::Result;
use log::{error, info};
use serde::Serialize;

use crate::platform::Platform;

pub type CleanupCallback = Arc<dyn Fn() -> Result<()> + Send + Sync>;

/// Outcome of one drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub invoked: usize,
    pub failed: usize,
    /// Whether the host accepted a release-unused-memory hint afterwards.
    pub memory_hint: bool,
}

/// Ordered list of cleanup callbacks. Cloning yields another handle to the
/// same list.
#[derive(Clone)]
pub struct CleanupRegistry {
    callbacks: Arc<Mutex<Vec<CleanupCallback>>>,
    platform: Option<Arc<dyn Platform>>,
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self {
            callbacks: Arc::new(Mutex::new(Vec::new())),
            platform: None,
        }
    }

    /// Registry whose drains end with the platform's release-memory hint.
    pub fn with_platform(platform: Arc<dyn Platform>) -> Self {
        Self {
            callbacks: Arc::new(Mutex::new(Vec::new())),
            platform: Some(platform),
        }
    }

    /// Append a callback. The same callback registered twice runs twice.
    pub fn register<F>(&self, callback: F)
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.register_shared(Arc::new(callback));
    }

    pub fn register_shared(&self, callback: CleanupCallback) {
        self.lock().push(callback);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Run every registered callback once, in registration order.
    ///
    /// The stored list is emptied before the first callback runs, so callbacks
    /// registered from inside a callback wait for the next drain. A callback
    /// that errors or panics is logged and the rest still run.
    pub fn drain(&self) -> CleanupReport {
        let batch = std::mem::take(&mut *self.lock());

        let mut report = CleanupReport {
            invoked: batch.len(),
            ..CleanupReport::default()
        };

        for (index, callback) in batch.into_iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| callback())) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    report.failed += 1;
                    error!("cleanup callback #{index} failed: {err:#}");
                }
                Err(_) => {
                    report.failed += 1;
                    error!("cleanup callback #{index} panicked");
                }
            }
        }

        if let Some(platform) = &self.platform {
            report.memory_hint = platform.release_unused_memory();
        }

        info!(
            "cleanup drained: {} invoked, {} failed, memory hint {}",
            report.invoked,
            report.failed,
            if report.memory_hint { "sent" } else { "unavailable" }
        );

        report
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CleanupCallback>> {
        match self.callbacks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for CleanupRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fake::FakePlatform;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn drain_runs_each_callback_once_in_order() {
        let registry = CleanupRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = Arc::clone(&order);
            registry.register(move || {
                order.lock().unwrap().push(i);
                Ok(())
            });
        }
        assert_eq!(registry.len(), 3);

        let report = registry.drain();
        assert_eq!(report.invoked, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
        assert!(registry.is_empty());

        assert_eq!(registry.drain().invoked, 0);
        assert_eq!(order.lock().unwrap().len(), 3);
    }

    #[test]
    fn same_callback_registered_twice_runs_twice() {
        let registry = CleanupRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let callback = {
            let count = Arc::clone(&count);
            move || {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        };

        registry.register(callback.clone());
        registry.register(callback);
        registry.drain();

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn callbacks_registered_during_drain_wait_for_next_drain() {
        let registry = CleanupRegistry::new();
        let late_runs = Arc::new(AtomicUsize::new(0));

        {
            let inner_registry = registry.clone();
            let late_runs = Arc::clone(&late_runs);
            registry.register(move || {
                let late_runs = Arc::clone(&late_runs);
                inner_registry.register(move || {
                    late_runs.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                });
                Ok(())
            });
        }

        let first = registry.drain();
        assert_eq!(first.invoked, 1);
        assert_eq!(late_runs.load(Ordering::SeqCst), 0);
        assert_eq!(registry.len(), 1);

        let second = registry.drain();
        assert_eq!(second.invoked, 1);
        assert_eq!(late_runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_callbacks_do_not_stop_the_batch() {
        let registry = CleanupRegistry::new();
        let ran_last = Arc::new(AtomicUsize::new(0));

        registry.register(|| Err(anyhow!("cache already gone")));
        registry.register(|| panic!("boom"));
        {
            let ran_last = Arc::clone(&ran_last);
            registry.register(move || {
                ran_last.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        let report = registry.drain();
        assert_eq!(report.invoked, 3);
        assert_eq!(report.failed, 2);
        assert_eq!(ran_last.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn drain_sends_memory_hint_when_available() {
        let platform = Arc::new(FakePlatform::new().with_release_hint());
        let registry = CleanupRegistry::with_platform(platform.clone());

        let report = registry.drain();
        assert!(report.memory_hint);
        assert_eq!(platform.release_calls(), 1);

        let without = CleanupRegistry::with_platform(Arc::new(FakePlatform::new()));
        assert!(!without.drain().memory_hint);
    }
}
