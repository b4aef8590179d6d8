//! Thread-backed throttled functions.
//!
//! Each admitted call gets its own OS thread, which sleeps while the window is cooling off.
//! This needs no async runtime and works from any context, at the cost of one thread per
//! pending call (bounded by [`MaxConcurrentTasks`](crate::MaxConcurrentTasks)).
//!
//! # Examples
//!
//! ```no_run
//! use throttled::{ThrottleOptions, ThrottledFn, MaxConcurrentTasks};
//!
//! let options = ThrottleOptions {
//!     max_concurrent_tasks: MaxConcurrentTasks::try_from(10).unwrap(),
//!     ..ThrottleOptions::with_period_ms(250)
//! };
//!
//! let flush = ThrottledFn::new(|| -> Result<(), std::io::Error> { Ok(()) }, options);
//!
//! match flush.call() {
//!     Ok(()) => {}
//!     Err(err) => eprintln!("flush dropped: {err}"),
//! }
//! ```

mod threaded_throttle;
pub use threaded_throttle::*;
