//! Shared state behind a throttled function.
//!
//! [`ThrottleState`] holds the timestamp of the last execution and decides whether a retry task
//! may run. [`PendingTaskSet`] tracks the tasks that are still waiting for their window.

use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use crate::{MaxConcurrentTasks, ThrottledError, common::Gate};

/// Last execution time of the wrapped action.
///
/// Monotonically non-decreasing once set; only written right after an execution, while the
/// owning mutex is held.
#[derive(Debug, Default)]
pub(crate) struct ThrottleState {
    last_execution: Option<Instant>,
}

impl ThrottleState {
    pub(crate) fn last_execution(&self) -> Option<Instant> {
        self.last_execution
    }

    /// Evaluate the gate at `now`.
    ///
    /// The remaining wait saturates at zero, so a task that was scheduled late never computes a
    /// negative sleep.
    pub(crate) fn gate(&self, now: Instant, period: Duration) -> Gate {
        let Some(last_execution) = self.last_execution else {
            return Gate::Open;
        };

        let elapsed = now.saturating_duration_since(last_execution);

        if elapsed >= period {
            Gate::Open
        } else {
            Gate::Closed(period - elapsed)
        }
    } // end method gate

    pub(crate) fn record_execution(&mut self, at: Instant) {
        self.last_execution = Some(match self.last_execution {
            Some(previous) if previous > at => previous,
            _ => at,
        });
    }
} // end impl ThrottleState

/// A handle to a spawned retry task.
pub(crate) trait TaskHandle {
    fn is_finished(&self) -> bool;
}

impl TaskHandle for std::thread::JoinHandle<()> {
    fn is_finished(&self) -> bool {
        std::thread::JoinHandle::is_finished(self)
    }
}

/// Bounded registry of in-flight retry tasks.
#[derive(Debug)]
pub(crate) struct PendingTaskSet<H> {
    capacity: MaxConcurrentTasks,
    handles: Vec<H>,
}

impl<H: TaskHandle> PendingTaskSet<H> {
    pub(crate) fn new(capacity: MaxConcurrentTasks) -> Self {
        Self {
            capacity,
            handles: Vec::new(),
        }
    }

    pub(crate) fn prune(&mut self) {
        self.handles.retain(|handle| !handle.is_finished());
    }

    pub(crate) fn len(&self) -> usize {
        self.handles.len()
    }

    /// Prune finished tasks, then register a new one created by `spawn`.
    ///
    /// `spawn` runs only when a slot is free, so the capacity check and the registration happen
    /// under the same lock.
    pub(crate) fn admit<F>(&mut self, spawn: F) -> Result<(), ThrottledError>
    where
        F: FnOnce() -> Result<H, ThrottledError>,
    {
        self.prune();

        if self.handles.len() >= *self.capacity {
            return Err(ThrottledError::PoolExhausted {
                capacity: *self.capacity,
            });
        }

        self.handles.push(spawn()?);

        Ok(())
    } // end method admit
} // end impl PendingTaskSet

/// Lock `mutex`, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
