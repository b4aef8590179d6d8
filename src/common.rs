use std::{
    fmt,
    ops::Deref,
    sync::Arc,
    time::Duration,
};

use crate::ThrottledError;

/// Minimum time between two executions of a throttled action, in milliseconds.
///
/// A period of `0` is accepted and disables the delay, though executions stay serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeriodMs(u64);

impl PeriodMs {
    /// The period as a [`Duration`], keeping sub-second precision.
    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.0)
    }
}

impl Default for PeriodMs {
    /// Returns a period of 5000 ms.
    fn default() -> Self {
        Self(5000)
    }
}

impl Deref for PeriodMs {
    type Target = u64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<u64> for PeriodMs {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Upper bound on the retry tasks a single throttled function keeps in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MaxConcurrentTasks(usize);

impl Default for MaxConcurrentTasks {
    /// Returns a capacity of 50 tasks.
    fn default() -> Self {
        Self(50)
    }
}

impl Deref for MaxConcurrentTasks {
    type Target = usize;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<usize> for MaxConcurrentTasks {
    type Error = ThrottledError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        if value == 0 {
            Err(ThrottledError::InvalidMaxConcurrentTasks(
                "Max concurrent tasks must be greater than 0".to_string(),
            ))
        } else {
            Ok(Self(value))
        }
    }
}

/// Callback receiving failures of the wrapped action.
///
/// Runs on the retry task that executed the action, after the window has been recorded.
pub type ErrorObserver = Arc<dyn Fn(&ThrottledError) + Send + Sync>;

/// Configuration for a throttled function.
#[derive(Clone, Default)]
pub struct ThrottleOptions {
    /// Minimum time between two executions.
    pub period_ms: PeriodMs,
    /// Capacity of the pending task set.
    pub max_concurrent_tasks: MaxConcurrentTasks,
    /// Optional observer for action failures. Failures are otherwise only logged.
    pub on_error: Option<ErrorObserver>,
    /// Label attached to log records.
    pub name: Option<String>,
}

impl ThrottleOptions {
    /// Options with the given period and defaults for everything else.
    pub fn with_period_ms(period_ms: u64) -> Self {
        Self {
            period_ms: PeriodMs::from(period_ms),
            ..Self::default()
        }
    }
}

impl fmt::Debug for ThrottleOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrottleOptions")
            .field("period_ms", &self.period_ms)
            .field("max_concurrent_tasks", &self.max_concurrent_tasks)
            .field("on_error", &self.on_error.is_some())
            .field("name", &self.name)
            .finish()
    }
}

/// Outcome of one run of a wrapped action.
///
/// Implemented for `()` (an action that cannot fail) and for `Result<T, E>`, where `Err`
/// counts as a failure. The success value is discarded.
pub trait ActionOutcome {
    /// The failure message, if the action failed.
    fn failure(self) -> Option<String>;
}

impl ActionOutcome for () {
    fn failure(self) -> Option<String> {
        None
    }
}

impl<T, E: fmt::Display> ActionOutcome for Result<T, E> {
    fn failure(self) -> Option<String> {
        self.err().map(|err| err.to_string())
    }
}

/// Result of evaluating the gate for the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Gate {
    /// The caller owns the window and must execute now.
    Open,
    /// The window is still cooling off for this long.
    Closed(Duration),
}
