//! Top-level entrypoints that wrap an action into a throttled function.
//!
//! [`throttle`] builds the thread-backed [`ThrottledFn`]. With the `tokio` or `smol` feature,
//! [`throttle_async`] builds the runtime-backed equivalent. Both take the period in
//! milliseconds and use the default task pool capacity; use the type's `new` with
//! [`ThrottleOptions`] for anything else.

use crate::{ActionOutcome, ThrottleOptions, ThrottledFn};

#[cfg(any(feature = "tokio", feature = "smol"))]
#[cfg_attr(docsrs, doc(cfg(any(feature = "tokio", feature = "smol"))))]
use crate::AsyncThrottledFn;

/// Wrap `action` so that it executes at most once every `period_ms` milliseconds.
///
/// Calls made while the window is cooling off are delayed, not dropped.
pub fn throttle<F, R>(action: F, period_ms: u64) -> ThrottledFn
where
    F: Fn() -> R + Send + Sync + 'static,
    R: ActionOutcome,
{
    ThrottledFn::new(action, ThrottleOptions::with_period_ms(period_ms))
}

/// Wrap `action` so that it executes at most once every `period_ms` milliseconds, waiting on
/// the async runtime instead of OS threads.
#[cfg(any(feature = "tokio", feature = "smol"))]
#[cfg_attr(docsrs, doc(cfg(any(feature = "tokio", feature = "smol"))))]
pub fn throttle_async<F, R>(action: F, period_ms: u64) -> AsyncThrottledFn
where
    F: Fn() -> R + Send + Sync + 'static,
    R: ActionOutcome,
{
    AsyncThrottledFn::new(action, ThrottleOptions::with_period_ms(period_ms))
}
