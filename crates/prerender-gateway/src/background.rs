//! Work deferred until after the response is sent.

use std::future::Future;

use futures::future::{join_all, FutureExt, LocalBoxFuture};

/// Tasks the host runs after the response has been delivered.
///
/// Each task handles its own failures; running them never fails.
#[derive(Default)]
pub struct BackgroundTasks {
    tasks: Vec<LocalBoxFuture<'static, ()>>,
}

impl BackgroundTasks {
    /// Create an empty task list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defer a task.
    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + 'static,
    {
        self.tasks.push(task.boxed_local());
    }

    /// Number of deferred tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Check if nothing was deferred.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run every deferred task to completion.
    pub async fn run(self) {
        join_all(self.tasks).await;
    }
}

impl std::fmt::Debug for BackgroundTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundTasks")
            .field("len", &self.tasks.len())
            .finish()
    }
}
