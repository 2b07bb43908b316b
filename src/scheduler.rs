use std::sync::{Mutex, MutexGuard};

use tokio::{
    task::JoinHandle,
    time::{self, Duration, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Handle to one periodic task. Cancelling it stops only that task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    name: &'static str,
    token: CancellationToken,
}

impl TaskHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Owner of a group of periodic tasks, torn down together by [`Scheduler::shutdown`].
///
/// Every task shares a child of the scheduler's root token, so cancelling the
/// root (explicitly or on drop) reaches all of them.
pub struct Scheduler {
    root: Mutex<CancellationToken>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            root: Mutex::new(CancellationToken::new()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Run `task` every `period`, first after one full period has elapsed.
    /// Callers that need an immediate run invoke the task themselves first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn every<F>(&self, name: &'static str, period: Duration, mut task: F) -> TaskHandle
    where
        F: FnMut() + Send + 'static,
    {
        let token = lock(&self.root).child_token();
        let loop_token = token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => task(),
                    _ = loop_token.cancelled() => {
                        log_debug!("periodic task '{name}' shutting down");
                        break;
                    }
                }
            }
        });

        let mut tasks = lock(&self.tasks);
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);

        TaskHandle { name, token }
    }

    pub fn active_tasks(&self) -> usize {
        lock(&self.tasks)
            .iter()
            .filter(|task| !task.is_finished())
            .count()
    }

    /// Cancel every task and wait for their loops to exit. The scheduler can
    /// be reused afterwards.
    pub async fn shutdown(&self) {
        let root = std::mem::replace(&mut *lock(&self.root), CancellationToken::new());
        root.cancel();

        let tasks = std::mem::take(&mut *lock(&self.tasks));

        for task in tasks {
            if let Err(err) = task.await {
                if !err.is_cancelled() {
                    log::error!("periodic task panicked: {err}");
                }
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        lock(&self.root).cancel();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    fn counter() -> (Arc<AtomicUsize>, impl FnMut() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_per_period() {
        let scheduler = Scheduler::new();
        let (count, task) = counter();
        scheduler.every("count", Duration::from_secs(10), task);

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_secs(31)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_one_handle_leaves_others_running() {
        let scheduler = Scheduler::new();
        let (fast_count, fast) = counter();
        let (slow_count, slow) = counter();
        let fast_handle = scheduler.every("fast", Duration::from_secs(1), fast);
        scheduler.every("slow", Duration::from_secs(2), slow);

        time::sleep(Duration::from_millis(2500)).await;
        fast_handle.cancel();
        assert!(fast_handle.is_cancelled());
        assert_eq!(fast_handle.name(), "fast");
        let fast_seen = fast_count.load(Ordering::SeqCst);

        time::sleep(Duration::from_secs(4)).await;
        assert_eq!(fast_count.load(Ordering::SeqCst), fast_seen);
        assert_eq!(slow_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_every_task() {
        let scheduler = Scheduler::new();
        let (count, task) = counter();
        let handle = scheduler.every("count", Duration::from_secs(1), task);
        assert_eq!(scheduler.active_tasks(), 1);

        time::sleep(Duration::from_millis(1500)).await;
        scheduler.shutdown().await;
        assert!(handle.is_cancelled());
        assert_eq!(scheduler.active_tasks(), 0);

        let seen = count.load(Ordering::SeqCst);
        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), seen);
    }
}
