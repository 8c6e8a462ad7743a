//! Background task lifecycle.

use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Lifecycle state of a background task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskState {
    /// Built but not yet scheduled.
    Created,
    /// Scheduling confirmed; cycles are running.
    Running,
    /// Shut down; no further cycle can run.
    Stopped,
}

type CycleFn = Box<dyn FnMut() -> BoxFuture<'static, ()> + Send>;

/// A periodic background task with a two-phase lifecycle.
///
/// [`start`](Self::start) runs the first cycle immediately and returns only
/// once the task loop is confirmed running. [`stop`](Self::stop) returns
/// only once the loop has exited, waiting out any in-flight cycle, so
/// nothing fires after it resolves. Both are idempotent. Cycle failures are
/// the cycle's own business; the loop itself never exits on error.
pub(crate) struct PeriodicTask {
    name: &'static str,
    period: Duration,
    cycle: Option<CycleFn>,
    shutdown: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
    state: TaskState,
}

impl PeriodicTask {
    pub(crate) fn new<F>(name: &'static str, period: Duration, cycle: F) -> Self
    where
        F: FnMut() -> BoxFuture<'static, ()> + Send + 'static,
    {
        Self {
            name,
            period,
            cycle: Some(Box::new(cycle)),
            shutdown: None,
            handle: None,
            state: TaskState::Created,
        }
    }

    pub(crate) fn state(&self) -> TaskState {
        self.state
    }

    /// Schedule the task and wait until it is confirmed running.
    pub(crate) async fn start(&mut self) {
        if self.state != TaskState::Created {
            warn!(task = self.name, state = ?self.state, "start ignored");
            return;
        }
        let Some(mut cycle) = self.cycle.take() else {
            return;
        };

        let name = self.name;
        let period = self.period;
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let (ready_tx, ready_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let _ = ready_tx.send(());
            loop {
                tokio::select! {
                    _ = ticker.tick() => cycle().await,
                    _ = shutdown_rx.changed() => break,
                }
            }
            debug!(task = name, "periodic task exited");
        });

        let _ = ready_rx.await;
        self.shutdown = Some(shutdown_tx);
        self.handle = Some(handle);
        self.state = TaskState::Running;
        debug!(task = self.name, period = ?self.period, "periodic task running");
    }

    /// Cancel future cycles and wait for any in-flight cycle to finish.
    pub(crate) async fn stop(&mut self) {
        if self.state != TaskState::Running {
            return;
        }
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        self.state = TaskState::Stopped;
        debug!(task = self.name, "periodic task stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_task(period: Duration, counter: Arc<AtomicUsize>) -> PeriodicTask {
        PeriodicTask::new("test-task", period, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        })
    }

    #[tokio::test]
    async fn start_runs_the_first_cycle_immediately() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut task = counting_task(Duration::from_secs(60), Arc::clone(&counter));

        assert_eq!(task.state(), TaskState::Created);
        task.start().await;
        assert_eq!(task.state(), TaskState::Running);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        task.stop().await;
    }

    #[tokio::test]
    async fn no_cycle_fires_after_stop_returns() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut task = counting_task(Duration::from_millis(10), Arc::clone(&counter));

        task.start().await;
        tokio::time::sleep(Duration::from_millis(35)).await;
        task.stop().await;
        assert_eq!(task.state(), TaskState::Stopped);

        let after_stop = counter.load(Ordering::SeqCst);
        assert!(after_stop >= 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn immediate_stop_after_start_is_clean() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut task = counting_task(Duration::from_millis(5), Arc::clone(&counter));

        task.start().await;
        task.stop().await;

        let after_stop = counter.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(counter.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut task = counting_task(Duration::from_millis(10), Arc::clone(&counter));

        task.start().await;
        task.stop().await;
        task.stop().await;
        assert_eq!(task.state(), TaskState::Stopped);
    }
}
