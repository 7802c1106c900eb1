//! Task spawning abstraction for single-threaded runtimes.

use std::future::Future;

/// Provider for spawning local tasks.
///
/// Everything in this crate is `!Send` (`Rc`, `RefCell`), so tasks run on
/// the current thread.
pub trait TaskProvider: Clone + 'static {
    /// Spawn a named task that runs on the current thread.
    ///
    /// Must be called from within a `tokio::task::LocalSet` (or a local
    /// runtime).
    fn spawn_task<F>(&self, name: &str, future: F) -> tokio::task::JoinHandle<()>
    where
        F: Future<Output = ()> + 'static;
}

/// Tokio-based task provider using `spawn_local`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioTaskProvider;

impl TaskProvider for TokioTaskProvider {
    fn spawn_task<F>(&self, name: &str, future: F) -> tokio::task::JoinHandle<()>
    where
        F: Future<Output = ()> + 'static,
    {
        let task_name = name.to_string();
        tokio::task::spawn_local(async move {
            tracing::trace!(task = %task_name, "task starting");
            future.await;
            tracing::trace!(task = %task_name, "task completed");
        })
    }
}
