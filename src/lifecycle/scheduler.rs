//! Delayed completions: the schedule-once primitive behind every settle delay.
//!
//! The controller never sleeps itself. It hands a completion future to a
//! `Scheduler` and keeps the returned handle so the completion can be
//! cancelled if the instance goes away first. Swapping `TokioScheduler` for
//! one that awaits a real backend changes nothing in the state machine.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::task::AbortHandle;

/// Work to run once the delay has elapsed.
pub type Completion = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Runs a completion once, after a delay.
pub trait Scheduler: Send + Sync + fmt::Debug {
    fn schedule(&self, delay: Duration, completion: Completion) -> ScheduledHandle;
}

/// Cancellable handle to a scheduled completion.
///
/// Dropping the handle does not cancel; only `cancel()` does.
#[derive(Debug)]
pub struct ScheduledHandle {
    abort: AbortHandle,
}

impl ScheduledHandle {
    pub fn new(abort: AbortHandle) -> Self {
        Self { abort }
    }

    /// Cancel the completion if it has not run yet.
    pub fn cancel(&self) {
        self.abort.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

/// Default scheduler: one tokio task per completion.
///
/// Must be used from inside a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, completion: Completion) -> ScheduledHandle {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            completion.await;
        });
        ScheduledHandle::new(task.abort_handle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn completion_runs_after_delay() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let handle = TokioScheduler.schedule(
            Duration::from_millis(100),
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_completion_never_runs() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let handle = TokioScheduler.schedule(
            Duration::from_millis(100),
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        handle.cancel();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
