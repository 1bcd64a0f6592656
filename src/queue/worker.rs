//! Worker thread loop

use crate::queue::{QueueTask, TaskQueue};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Processes tasks pulled from a [`TaskQueue`]
///
/// Each registered handler is owned by exactly one worker thread, so it may
/// keep mutable per-thread state.
pub trait TaskHandler<T: QueueTask>: Send {
    /// Handles one dequeued task
    ///
    /// The queue is passed in so the handler can schedule follow-up work or
    /// defer the task. Completion is reported by the worker loop whatever the
    /// outcome, errors are only logged.
    fn handle(&mut self, task: T, queue: &TaskQueue<T>) -> anyhow::Result<()>;
}

impl<T, F> TaskHandler<T> for F
where
    T: QueueTask,
    F: FnMut(T, &TaskQueue<T>) -> anyhow::Result<()> + Send,
{
    fn handle(&mut self, task: T, queue: &TaskQueue<T>) -> anyhow::Result<()> {
        self(task, queue)
    }
}

/// Decrements the live worker count however the loop exits
struct ExitGuard<'a, T: QueueTask> {
    queue: &'a TaskQueue<T>,
}

impl<T: QueueTask> Drop for ExitGuard<'_, T> {
    fn drop(&mut self) {
        self.queue.worker_exited();
    }
}

pub(crate) fn run_worker<T: QueueTask>(
    queue: Arc<TaskQueue<T>>,
    mut handler: Box<dyn TaskHandler<T>>,
    name: String,
) {
    let _exit = ExitGuard { queue: &queue };
    let poll_interval = queue.options().poll_interval;
    tracing::debug!("Worker {} started", name);

    while queue.is_started() {
        let Some(task) = queue.dequeue() else {
            queue.wait_for_work(poll_interval);
            continue;
        };

        let sequence_key = task.sequence_key().map(str::to_owned);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(task, &queue)));
        queue.finish_processing(sequence_key.as_deref());

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("Worker {} failed to process task: {:#}", name, e),
            Err(payload) => tracing::error!(
                "Worker {} panicked while processing task: {}",
                name,
                panic_message(payload.as_ref())
            ),
        }
    }

    tracing::debug!("Worker {} stopped", name);
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}
