use std::{
    future::Future,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::{bail, Result};
use tokio::{
    sync::{broadcast::error::RecvError, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    cleanup::{CleanupRegistry, CleanupReport},
    device::{DeviceClassifier, DeviceState},
    gesture::{GestureTracker, TouchState},
    lazy::{ElementContainer, LazyLoader, ResourceStatus},
    metrics::{MemoryMetrics, MetricsCollector, MetricsSnapshot, VitalEntry},
    platform::{ElementId, EventBus, Platform, PlatformEvent},
    settings::MonitorSettings,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Routes platform events to the component that owns them.
#[derive(Clone)]
struct EventRouter {
    device: DeviceClassifier,
    gestures: Arc<Mutex<GestureTracker>>,
    lazy: Arc<LazyLoader>,
}

impl EventRouter {
    /// A panicking handler drops only the event that triggered it.
    fn dispatch(&self, event: &PlatformEvent) {
        match panic::catch_unwind(AssertUnwindSafe(|| self.route(event))) {
            Ok(true) => {}
            Ok(false) => {
                log_debug!("no component consumed {event:?}");
            }
            Err(_) => {
                log::error!("handler panicked while processing {event:?}");
            }
        }
    }

    fn route(&self, event: &PlatformEvent) -> bool {
        match event {
            PlatformEvent::Resize | PlatformEvent::OrientationChange => {
                self.device.handle_event(event)
            }
            PlatformEvent::TouchStart { .. }
            | PlatformEvent::TouchMove { .. }
            | PlatformEvent::TouchEnd => lock(&self.gestures).handle_event(event),
            PlatformEvent::Intersection { .. }
            | PlatformEvent::ResourceLoaded { .. }
            | PlatformEvent::ResourceFailed { .. } => self.lazy.handle_event(event),
        }
    }
}

struct Listener {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owning scope of the monitoring subsystem.
///
/// [`Monitor::start`] acquires every timer and event subscription;
/// [`Monitor::shutdown`] releases all of them. Dropping a started monitor
/// cancels the same resources without waiting for them.
pub struct Monitor {
    events: EventBus,
    registry: CleanupRegistry,
    router: EventRouter,
    metrics: MetricsCollector,
    listener: Mutex<Option<Listener>>,
}

impl Monitor {
    pub fn new(platform: Arc<dyn Platform>, settings: &MonitorSettings) -> Self {
        let registry = CleanupRegistry::with_platform(Arc::clone(&platform));
        let device = DeviceClassifier::new(Arc::clone(&platform), settings.device.clone());
        let metrics = MetricsCollector::new(
            platform,
            registry.clone(),
            settings.metrics.clone(),
            settings.lazy_load.clone(),
        );

        let router = EventRouter {
            device,
            gestures: Arc::new(Mutex::new(GestureTracker::new())),
            lazy: metrics.lazy_loader(),
        };

        Self {
            events: EventBus::new(),
            registry,
            router,
            metrics,
            listener: Mutex::new(None),
        }
    }

    /// Handle for the host to publish platform events into.
    pub fn events(&self) -> EventBus {
        self.events.clone()
    }

    /// Classify the device, start both samplers and begin consuming events.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<()> {
        if self.is_running() {
            bail!("monitor already running");
        }

        self.router.device.refresh();
        self.metrics.start()?;

        let token = CancellationToken::new();
        let receiver = self.events.subscribe();
        let handle = tokio::spawn(event_loop(
            self.router.clone(),
            receiver,
            token.clone(),
        ));

        *lock(&self.listener) = Some(Listener { token, handle });
        log_info!("monitor started");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        lock(&self.listener).is_some()
    }

    /// Single teardown path: stop event consumption, stop both samplers and
    /// release every lazy-load watcher that never fired.
    ///
    /// Everything is released even when the listener task failed; the join
    /// error is reported afterwards.
    pub async fn shutdown(&self) -> Result<()> {
        let listener = lock(&self.listener).take();

        let joined = match listener {
            Some(listener) => {
                listener.token.cancel();
                listener.handle.await
            }
            None => Ok(()),
        };

        self.metrics.stop().await;
        let released = self.router.lazy.release_all();
        log_info!("monitor shut down ({released} lazy-load bindings released)");

        match joined {
            Err(err) if !err.is_cancelled() => bail!("event listener task failed to join: {err}"),
            _ => Ok(()),
        }
    }

    /// Route one event synchronously, bypassing the bus. Safe to call from
    /// inside host callbacks such as [`crate::DeferredElement::assign_source`].
    pub fn dispatch(&self, event: &PlatformEvent) {
        self.router.dispatch(event);
    }

    pub fn device_state(&self) -> DeviceState {
        self.router.device.state()
    }

    pub fn subscribe_device(&self) -> watch::Receiver<DeviceState> {
        self.router.device.subscribe()
    }

    pub fn touch_state(&self) -> TouchState {
        lock(&self.router.gestures).state()
    }

    pub fn score(&self) -> Option<u8> {
        self.metrics.score()
    }

    pub fn subscribe_score(&self) -> watch::Receiver<Option<u8>> {
        self.metrics.subscribe_score()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn latest_memory(&self) -> Option<MemoryMetrics> {
        self.metrics.latest_memory()
    }

    pub fn record_vital(&self, entry: VitalEntry) {
        self.metrics.record_vital(entry);
    }

    pub async fn measure_load<F, T>(&self, name: &str, load: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.metrics.measure_load(name, load).await
    }

    pub fn optimize_images(&self, container: &dyn ElementContainer) -> Vec<ElementId> {
        self.metrics.optimize_images(container)
    }

    pub fn resource_status(&self, element: ElementId) -> Option<ResourceStatus> {
        self.router.lazy.status(element)
    }

    pub fn register_cleanup<F>(&self, callback: F)
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.registry.register(callback);
    }

    pub fn run_cleanup(&self) -> CleanupReport {
        self.registry.drain()
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        if let Some(listener) = lock(&self.listener).take() {
            listener.token.cancel();
        }
    }
}

async fn event_loop(
    router: EventRouter,
    mut receiver: tokio::sync::broadcast::Receiver<PlatformEvent>,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            received = receiver.recv() => match received {
                Ok(event) => router.dispatch(&event),
                // dropped intersections leave their bridges armed until the host
                // reports the element again
                Err(RecvError::Lagged(skipped)) => {
                    log_warn!("event listener lagged, {skipped} platform events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            _ = token.cancelled() => {
                log_debug!("event listener shutting down");
                break;
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
