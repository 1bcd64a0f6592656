//! Task queue engine
//!
//! This module contains the machinery that feeds work to the crawl workers:
//! - [`HybridQueue`]: a bounded in-memory FIFO that spills to an overflow store
//! - [`DeferredTasks`]: tasks waiting for a retry time
//! - [`TaskQueue`]: the shared engine with per-sequence concurrency limits and
//!   worker thread lifecycle
//! - [`TaskHandler`]: what a worker thread runs for each dequeued task

mod deferred;
mod engine;
mod hybrid;
mod worker;

pub use deferred::DeferredTasks;
pub use engine::{TaskQueue, TaskQueueOptions, MAX_DEQUEUE_ATTEMPTS};
pub use hybrid::HybridQueue;
pub use worker::TaskHandler;

use thiserror::Error;

/// A unit of work managed by the task queue
pub trait QueueTask: Send + 'static {
    /// Key used to limit how many tasks of one group run at once
    ///
    /// `None` means the task is never limited.
    fn sequence_key(&self) -> Option<&str>;
}

/// Lifecycle misuse of the task queue
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Task queue is already started")]
    AlreadyStarted,

    #[error("Workers cannot be added after the task queue has started")]
    WorkerAfterStart,

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
