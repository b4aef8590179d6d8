use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use crate::{
    ActionOutcome, ThrottleOptions, ThrottledError,
    runtime::{self, TaskCompletion},
    state::{PendingTaskSet, lock},
    throttle_core::ThrottleCore,
};

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// A throttled function backed by async runtime tasks.
///
/// Same admission and window rules as [`ThrottledFn`](crate::ThrottledFn), but each admitted
/// call becomes a detached task on the configured runtime and waits with the runtime's timer
/// instead of parking an OS thread.
///
/// The wrapped action is still a synchronous closure. It runs on a runtime worker while the
/// window lock is held, so it should be short.
///
/// With the `tokio` feature, [`call`](AsyncThrottledFn::call) must be made from within a Tokio
/// runtime; otherwise it returns [`ThrottledError::Spawn`].
#[derive(Clone)]
pub struct AsyncThrottledFn {
    core: Arc<ThrottleCore>,
    pending: Arc<Mutex<PendingTaskSet<TaskCompletion>>>,
}

impl AsyncThrottledFn {
    /// Wrap `action` with the given options.
    pub fn new<F, R>(action: F, options: ThrottleOptions) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: ActionOutcome,
    {
        Self {
            core: Arc::new(ThrottleCore::new(action, &options)),
            pending: Arc::new(Mutex::new(PendingTaskSet::new(options.max_concurrent_tasks))),
        }
    } // end constructor

    /// Schedule one execution of the wrapped action and return immediately.
    ///
    /// # Errors
    ///
    /// - [`ThrottledError::PoolExhausted`] if the task pool is full. The call is dropped.
    /// - [`ThrottledError::Spawn`] if no runtime is available to run the retry task.
    pub fn call(&self) -> Result<(), ThrottledError> {
        let mut pending = lock(&self.pending);

        pending.admit(|| runtime::spawn_task(run_until_executed(Arc::clone(&self.core))))?;

        tracing::trace!(
            throttle = self.core.name(),
            pending = pending.len(),
            "call admitted"
        );

        Ok(())
    } // end method call

    /// Number of retry tasks that have not finished yet.
    pub fn pending(&self) -> usize {
        let mut pending = lock(&self.pending);
        pending.prune();
        pending.len()
    }

    /// When the action last finished executing, if it ever did.
    pub fn last_execution(&self) -> Option<Instant> {
        self.core.last_execution()
    }

    /// Minimum time between two executions.
    pub fn period(&self) -> Duration {
        self.core.period()
    }

    /// Wait until every admitted call has executed.
    pub async fn wait_idle(&self) {
        while self.pending() > 0 {
            runtime::sleep(IDLE_POLL_INTERVAL).await;
        }
    }
} // end impl AsyncThrottledFn

async fn run_until_executed(core: Arc<ThrottleCore>) {
    while let Some(wait) = core.try_execute() {
        runtime::sleep(wait).await;
    }
}
