//! Runtime-backed throttled functions.
//!
//! Available with the `tokio` or `smol` feature. When both are enabled, Tokio is used.
//!
//! # Examples
//!
//! ```no_run
//! # #[cfg(feature = "tokio")]
//! # async fn demo() {
//! let refresh = throttled::throttle_async(|| println!("refreshing"), 1_000);
//!
//! for _ in 0..3 {
//!     refresh.call().unwrap();
//! }
//!
//! refresh.wait_idle().await;
//! # }
//! ```

mod async_throttle;
pub use async_throttle::*;
