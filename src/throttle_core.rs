use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Mutex,
    time::{Duration, Instant},
};

use crate::{
    ActionOutcome, ErrorObserver, ThrottleOptions, ThrottledError,
    common::Gate,
    state::{ThrottleState, lock},
};

type BoxedAction = Box<dyn Fn() -> Option<String> + Send + Sync>;

/// Action, period and window state shared by every retry task of one throttled function.
pub(crate) struct ThrottleCore {
    action: BoxedAction,
    period: Duration,
    on_error: Option<ErrorObserver>,
    name: Option<String>,
    state: Mutex<ThrottleState>,
    // Copy of the last execution time for readers; never held across the action.
    published: Mutex<Option<Instant>>,
}

impl ThrottleCore {
    pub(crate) fn new<F, R>(action: F, options: &ThrottleOptions) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: ActionOutcome,
    {
        Self {
            action: Box::new(move || action().failure()),
            period: options.period_ms.as_duration(),
            on_error: options.on_error.clone(),
            name: options.name.clone(),
            state: Mutex::new(ThrottleState::default()),
            published: Mutex::new(None),
        }
    } // end constructor

    pub(crate) fn period(&self) -> Duration {
        self.period
    }

    pub(crate) fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("throttled")
    }

    pub(crate) fn last_execution(&self) -> Option<Instant> {
        *lock(&self.published)
    }

    /// One iteration of the retry loop.
    ///
    /// Returns `None` once the action has been executed by this caller, or the time left in the
    /// current window otherwise. The state lock is released before returning, so callers sleep
    /// without holding it.
    pub(crate) fn try_execute(&self) -> Option<Duration> {
        let failure = {
            let mut state = lock(&self.state);
            let now = Instant::now();

            if let Gate::Closed(wait) = state.gate(now, self.period) {
                tracing::trace!(throttle = self.name(), wait = ?wait, "gate closed");
                return Some(wait);
            }

            let failure = self.run_action();

            // The window advances even when the action failed.
            state.record_execution(Instant::now());
            *lock(&self.published) = state.last_execution();

            failure
        };

        match failure {
            None => tracing::debug!(throttle = self.name(), "action executed"),
            Some(err) => {
                tracing::warn!(throttle = self.name(), error = ?err, "action failed");

                if let Some(on_error) = &self.on_error {
                    on_error(&err);
                }
            }
        }

        None
    } // end method try_execute

    fn run_action(&self) -> Option<ThrottledError> {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.action)())) {
            Ok(failure) => failure.map(ThrottledError::ActionFailed),
            Err(payload) => Some(ThrottledError::ActionPanicked(panic_message(payload.as_ref()))),
        }
    }
} // end impl ThrottleCore

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
