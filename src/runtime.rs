use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use crate::{ThrottledError, state::TaskHandle};

/// Completion flag of a detached runtime task.
///
/// Set when the task's future is dropped, whether it finished or panicked.
#[derive(Debug, Clone, Default)]
pub(crate) struct TaskCompletion(Arc<AtomicBool>);

impl TaskHandle for TaskCompletion {
    fn is_finished(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

struct CompleteOnDrop(Arc<AtomicBool>);

impl Drop for CompleteOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

fn track<F>(fut: F) -> (TaskCompletion, impl Future<Output = ()> + Send + 'static)
where
    F: Future<Output = ()> + Send + 'static,
{
    let completion = TaskCompletion::default();
    let guard = CompleteOnDrop(Arc::clone(&completion.0));

    let tracked = async move {
        let _guard = guard;
        fut.await;
    };

    (completion, tracked)
}

#[cfg(feature = "tokio")]
pub(crate) fn spawn_task<F>(fut: F) -> Result<TaskCompletion, ThrottledError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::runtime::Handle::try_current().map_err(std::io::Error::other)?;
    let (completion, tracked) = track(fut);

    handle.spawn(tracked);

    Ok(completion)
}

#[cfg(all(feature = "smol", not(feature = "tokio")))]
pub(crate) fn spawn_task<F>(fut: F) -> Result<TaskCompletion, ThrottledError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (completion, tracked) = track(fut);

    smol::spawn(tracked).detach();

    Ok(completion)
}

#[cfg(feature = "tokio")]
pub(crate) async fn sleep(d: Duration) {
    tokio::time::sleep(d).await;
}

#[cfg(all(feature = "smol", not(feature = "tokio")))]
pub(crate) async fn sleep(d: Duration) {
    smol::Timer::after(d).await;
}
