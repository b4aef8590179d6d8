#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod throttler;
pub use throttler::*;

mod threaded;
pub use threaded::*;

#[cfg(any(feature = "tokio", feature = "smol"))]
mod async_task;
#[cfg(any(feature = "tokio", feature = "smol"))]
pub use async_task::*;

#[cfg(any(feature = "tokio", feature = "smol"))]
mod runtime;

mod error;
pub use error::*;

mod common;
pub use common::{ActionOutcome, ErrorObserver, MaxConcurrentTasks, PeriodMs, ThrottleOptions};

mod state;
mod throttle_core;

#[cfg(test)]
mod tests;
