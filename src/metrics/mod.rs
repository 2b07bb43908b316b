mod score;
mod types;
mod vitals;

pub use score::compute_score;
pub use types::{LoadTiming, MemoryMetrics, MetricsSnapshot, TimingMetrics};
pub use vitals::{VitalEntry, VitalsAggregator};

use std::{
    collections::VecDeque,
    future::Future,
    sync::{Arc, Mutex, MutexGuard, Weak},
};

use anyhow::{bail, Result};
use tokio::{sync::watch, time::Instant};

use crate::{
    cleanup::CleanupRegistry,
    lazy::{ElementContainer, LazyLoader},
    platform::{ElementId, Platform},
    scheduler::{Scheduler, TaskHandle},
    settings::{LazyLoadSettings, MetricsSettings},
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

const MAX_RECENT_LOADS: usize = 20;

/// Samples timing and memory signals on two independent periodic timers.
pub struct MetricsCollector {
    inner: Arc<CollectorState>,
}

struct CollectorState {
    platform: Arc<dyn Platform>,
    registry: CleanupRegistry,
    settings: MetricsSettings,
    lazy: Arc<LazyLoader>,
    vitals: Mutex<VitalsAggregator>,
    score_tx: watch::Sender<Option<u8>>,
    latest_memory: Mutex<Option<MemoryMetrics>>,
    recent_loads: Mutex<VecDeque<LoadTiming>>,
    scheduler: Scheduler,
    samplers: Mutex<Option<Samplers>>,
}

struct Samplers {
    timing: TaskHandle,
    memory: TaskHandle,
}

impl MetricsCollector {
    pub fn new(
        platform: Arc<dyn Platform>,
        registry: CleanupRegistry,
        settings: MetricsSettings,
        lazy_settings: LazyLoadSettings,
    ) -> Self {
        let (score_tx, _) = watch::channel(None);
        let lazy = Arc::new(LazyLoader::new(Arc::clone(&platform), lazy_settings));

        Self {
            inner: Arc::new(CollectorState {
                platform,
                registry,
                settings,
                lazy,
                vitals: Mutex::new(VitalsAggregator::new()),
                score_tx,
                latest_memory: Mutex::new(None),
                recent_loads: Mutex::new(VecDeque::with_capacity(MAX_RECENT_LOADS)),
                scheduler: Scheduler::new(),
                samplers: Mutex::new(None),
            }),
        }
    }

    /// Run both samplers once right away, then on their periods.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<()> {
        if self.is_running() {
            bail!("metrics collection already active");
        }

        self.inner.sample_timing();
        self.inner.sample_memory();

        let timing_state = Arc::downgrade(&self.inner);
        let timing = self.inner.scheduler.every(
            "timing-sampler",
            self.inner.settings.timing_interval(),
            move || {
                with_state(&timing_state, |state| {
                    state.sample_timing();
                })
            },
        );

        let memory_state = Arc::downgrade(&self.inner);
        let memory = self.inner.scheduler.every(
            "memory-sampler",
            self.inner.settings.memory_interval(),
            move || {
                with_state(&memory_state, |state| {
                    state.sample_memory();
                })
            },
        );

        log_info!(
            "metrics collection started (timing every {:?}, memory every {:?})",
            self.inner.settings.timing_interval(),
            self.inner.settings.memory_interval()
        );

        *lock(&self.inner.samplers) = Some(Samplers { timing, memory });
        Ok(())
    }

    /// Stop both samplers and wait for them to exit. Stopping an idle
    /// collector is a no-op.
    pub async fn stop(&self) {
        let samplers = lock(&self.inner.samplers).take();
        let Some(samplers) = samplers else {
            return;
        };

        samplers.timing.cancel();
        samplers.memory.cancel();
        self.inner.scheduler.shutdown().await;
        log_info!("metrics collection stopped");
    }

    pub fn is_running(&self) -> bool {
        lock(&self.inner.samplers).is_some()
    }

    /// Take one timing sample now and publish the resulting score.
    pub fn sample_timing(&self) -> u8 {
        self.inner.sample_timing()
    }

    /// Take one memory sample now, draining cleanup under pressure.
    pub fn sample_memory(&self) -> Option<MemoryMetrics> {
        self.inner.sample_memory()
    }

    /// Latest performance score; `None` until the first timing sample.
    pub fn score(&self) -> Option<u8> {
        *self.inner.score_tx.borrow()
    }

    pub fn subscribe_score(&self) -> watch::Receiver<Option<u8>> {
        self.inner.score_tx.subscribe()
    }

    /// A fresh snapshot of the aggregated timing signals and current memory.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.snapshot()
    }

    pub fn latest_memory(&self) -> Option<MemoryMetrics> {
        *lock(&self.inner.latest_memory)
    }

    pub fn record_vital(&self, entry: VitalEntry) {
        lock(&self.inner.vitals).record(entry);
    }

    pub fn recent_loads(&self) -> Vec<LoadTiming> {
        lock(&self.inner.recent_loads).iter().cloned().collect()
    }

    /// Time `load` and record its duration under `name`. The load's own
    /// result is returned unchanged; failures are recorded, not retried.
    pub async fn measure_load<F, T>(&self, name: &str, load: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let started_at = self.inner.platform.now();
        let start = Instant::now();

        let result = load.await;

        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => log_info!("{name} loaded in {duration_ms}ms"),
            Err(err) => log_warn!("{name} failed after {duration_ms}ms: {err:#}"),
        }

        let mut loads = lock(&self.inner.recent_loads);
        loads.push_back(LoadTiming {
            name: name.to_string(),
            started_at,
            duration_ms,
            succeeded: result.is_ok(),
        });
        if loads.len() > MAX_RECENT_LOADS {
            loads.pop_front();
        }
        drop(loads);

        result
    }

    /// Bind every element in `container` flagged for deferred loading to its
    /// own observer bridge.
    pub fn optimize_images(&self, container: &dyn ElementContainer) -> Vec<ElementId> {
        self.inner.lazy.bind_container(container)
    }

    pub fn lazy_loader(&self) -> Arc<LazyLoader> {
        Arc::clone(&self.inner.lazy)
    }

    pub fn cleanup_registry(&self) -> &CleanupRegistry {
        &self.inner.registry
    }
}

impl Clone for MetricsCollector {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl CollectorState {
    fn snapshot(&self) -> MetricsSnapshot {
        let timing = lock(&self.vitals).timing();
        MetricsSnapshot {
            timestamp: self.platform.now(),
            timing,
            memory: self
                .platform
                .memory_usage()
                .and_then(MemoryMetrics::from_usage),
        }
    }

    fn sample_timing(&self) -> u8 {
        let snapshot = self.snapshot();
        let score = compute_score(&snapshot, &self.settings.score);
        log_debug!(
            "timing sample: lcp={:.0}ms fid={:.0}ms cls={:.3} memory={:?} -> score {score}",
            snapshot.timing.lcp,
            snapshot.timing.fid,
            snapshot.timing.cls,
            snapshot.memory.map(|memory| memory.percentage)
        );
        self.score_tx.send_replace(Some(score));
        score
    }

    fn sample_memory(&self) -> Option<MemoryMetrics> {
        let memory = self
            .platform
            .memory_usage()
            .and_then(MemoryMetrics::from_usage);
        *lock(&self.latest_memory) = memory;

        let memory = memory?;
        if memory.percentage > self.settings.memory_pressure_percent {
            log_warn!(
                "memory pressure at {:.1}% (threshold {:.1}%), running cleanup",
                memory.percentage,
                self.settings.memory_pressure_percent
            );
            let report = self.registry.drain();
            if report.failed > 0 {
                log_warn!(
                    "{} of {} cleanup callbacks failed under memory pressure",
                    report.failed,
                    report.invoked
                );
            }
        }

        Some(memory)
    }
}

fn with_state(state: &Weak<CollectorState>, f: impl FnOnce(&CollectorState)) {
    if let Some(state) = state.upgrade() {
        f(&state);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
