/// Error type for this crate.
#[derive(Debug, thiserror::Error)]
pub enum ThrottledError {
    /// Every task slot is taken by a pending invocation.
    ///
    /// The call that produced this error is dropped: it is not queued and it is never retried.
    #[error("task pool is full ({capacity} pending invocations), call dropped")]
    PoolExhausted {
        /// Capacity of the pending task set.
        capacity: usize,
    },

    /// The wrapped action returned an error.
    #[error("action failed: {0}")]
    ActionFailed(String),

    /// The wrapped action panicked.
    #[error("action panicked: {0}")]
    ActionPanicked(String),

    /// Invalid maximum number of concurrent tasks.
    #[error("invalid max concurrent tasks: {0}")]
    InvalidMaxConcurrentTasks(String),

    /// A retry task could not be created.
    #[error("failed to spawn retry task: {0}")]
    Spawn(#[from] std::io::Error),
}
