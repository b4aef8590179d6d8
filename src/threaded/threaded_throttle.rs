use std::{
    sync::{Arc, Mutex},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crate::{
    ActionOutcome, ThrottleOptions, ThrottledError,
    state::{PendingTaskSet, lock},
    throttle_core::ThrottleCore,
};

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// A throttled function backed by OS threads.
///
/// Every [`call`](ThrottledFn::call) spawns one retry thread. The thread waits until the
/// current window has elapsed, runs the wrapped action once, records the execution time and
/// exits. No call is dropped unless the task pool is full.
///
/// # Algorithm
///
/// 1. **Admission:** under the pending-set lock, prune finished threads and reject the call with
///    [`ThrottledError::PoolExhausted`] if `max_concurrent_tasks` threads are still pending
/// 2. **Gate:** the retry thread locks the window state and checks
///    `last_execution.is_none() || now - last_execution >= period`
/// 3. **Execute:** if the gate is open, the action runs with the lock held and the execution
///    time is recorded even if the action failed or panicked
/// 4. **Wait:** otherwise the lock is released and the thread sleeps for the rest of the window
///
/// # Semantics & Limitations
///
/// - At most one execution starts per `period`
/// - Pending calls are not ordered: whichever thread next takes the lock after the window
///   reopens executes
/// - A slow action delays every pending call, since the lock is held while it runs
/// - Admitted calls cannot be cancelled
/// - Action failures never reach the caller; see [`ThrottleOptions::on_error`]
///
/// # Examples
///
/// ```no_run
/// use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
///
/// let counter = Arc::new(AtomicU64::new(0));
/// let throttled = {
///     let counter = Arc::clone(&counter);
///     throttled::throttle(move || { counter.fetch_add(1, Ordering::SeqCst); }, 500)
/// };
///
/// for _ in 0..3 {
///     throttled.call().unwrap();
/// }
///
/// // Executions happen at t=0, t=500ms and t=1000ms.
/// throttled.wait_idle();
/// assert_eq!(counter.load(Ordering::SeqCst), 3);
/// ```
#[derive(Clone)]
pub struct ThrottledFn {
    core: Arc<ThrottleCore>,
    pending: Arc<Mutex<PendingTaskSet<JoinHandle<()>>>>,
}

impl ThrottledFn {
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
    /// - [`ThrottledError::Spawn`] if the retry thread could not be created.
    pub fn call(&self) -> Result<(), ThrottledError> {
        let mut pending = lock(&self.pending);

        pending.admit(|| {
            let core = Arc::clone(&self.core);
            let handle = thread::Builder::new()
                .name(format!("{}-retry", core.name()))
                .spawn(move || run_until_executed(&core))?;

            Ok(handle)
        })?;

        tracing::trace!(
            throttle = self.core.name(),
            pending = pending.len(),
            "call admitted"
        );

        Ok(())
    } // end method call

    /// Number of retry threads that have not finished yet.
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

    /// Block until every admitted call has executed.
    ///
    /// Calls admitted while waiting are waited for too.
    pub fn wait_idle(&self) {
        while self.pending() > 0 {
            thread::sleep(IDLE_POLL_INTERVAL);
        }
    }
} // end impl ThrottledFn

fn run_until_executed(core: &ThrottleCore) {
    while let Some(wait) = core.try_execute() {
        thread::sleep(wait);
    }
}
