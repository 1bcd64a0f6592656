//! Shared task queue with per-sequence concurrency limits
//!
//! All workers pull from one [`TaskQueue`]. A single lock guards the hybrid
//! queue, the deferred tasks and the in-flight accounting, so every operation
//! is atomic with respect to the others.

use crate::queue::deferred::DeferredTasks;
use crate::queue::hybrid::HybridQueue;
use crate::queue::worker::{run_worker, TaskHandler};
use crate::queue::{QueueError, QueueTask};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Upper bound on tasks examined by one [`TaskQueue::dequeue`] call
///
/// If every examined task belongs to a saturated sequence, `dequeue` returns
/// `None` even when an admissible task sits deeper in the queue. The next call
/// resumes from where the rotation left off.
pub const MAX_DEQUEUE_ATTEMPTS: usize = 1000;

/// Tuning of a [`TaskQueue`]
#[derive(Debug, Clone)]
pub struct TaskQueueOptions {
    /// Maximum in-flight tasks per sequence key (0 = unlimited)
    pub max_parallel_sequences: usize,
    /// Longest idle wait of a worker between two dequeue attempts
    pub poll_interval: Duration,
    /// Grace period granted to workers by [`TaskQueue::stop`]
    pub stop_timeout: Duration,
    /// Worker threads are named `{prefix}-{index}`
    pub thread_name_prefix: String,
}

impl Default for TaskQueueOptions {
    fn default() -> Self {
        Self {
            max_parallel_sequences: 0,
            poll_interval: Duration::from_millis(10),
            stop_timeout: Duration::from_secs(10),
            thread_name_prefix: "crawl-worker".to_string(),
        }
    }
}

struct QueueState<T> {
    queue: HybridQueue<T>,
    deferred: DeferredTasks<T>,
    /// Sequence key -> tasks dequeued and not yet processed
    in_flight: HashMap<String, usize>,
    /// All tasks dequeued and not yet processed
    processing: usize,
}

impl<T: QueueTask> QueueState<T> {
    /// Admits `task` unless its sequence is already at `limit`
    fn start_processing(&mut self, task: &T, limit: usize) -> bool {
        if let (Some(key), true) = (task.sequence_key(), limit > 0) {
            let running = self.in_flight.get(key).copied().unwrap_or(0);
            if running >= limit {
                return false;
            }
            self.in_flight.insert(key.to_string(), running + 1);
        }
        self.processing += 1;
        true
    }

    fn finish_processing(&mut self, key: Option<&str>, limit: usize) {
        self.processing = self.processing.saturating_sub(1);

        if let (Some(key), true) = (key, limit > 0) {
            if let Some(running) = self.in_flight.get_mut(key) {
                *running -= 1;
                if *running == 0 {
                    self.in_flight.remove(key);
                }
            }
        }
    }
}

/// Task queue engine shared by all worker threads
///
/// Workers are registered with [`TaskQueue::add_worker`] before
/// [`TaskQueue::start`], which spawns one OS thread per worker. Each thread
/// loops on [`TaskQueue::dequeue`], runs its handler and reports completion,
/// until [`TaskQueue::stop`] is called.
pub struct TaskQueue<T: QueueTask> {
    state: Mutex<QueueState<T>>,
    work_available: Condvar,
    started: AtomicBool,
    pending_workers: Mutex<Vec<Box<dyn TaskHandler<T>>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    live_workers: Mutex<usize>,
    workers_exited: Condvar,
    options: TaskQueueOptions,
}

impl<T: QueueTask> TaskQueue<T> {
    /// Creates a stopped queue over `queue`
    pub fn new(queue: HybridQueue<T>, options: TaskQueueOptions) -> Self {
        Self {
            state: Mutex::new(QueueState {
                queue,
                deferred: DeferredTasks::new(),
                in_flight: HashMap::new(),
                processing: 0,
            }),
            work_available: Condvar::new(),
            started: AtomicBool::new(false),
            pending_workers: Mutex::new(Vec::new()),
            handles: Mutex::new(Vec::new()),
            live_workers: Mutex::new(0),
            workers_exited: Condvar::new(),
            options,
        }
    }

    pub fn options(&self) -> &TaskQueueOptions {
        &self.options
    }

    /// Registers a worker to be spawned by [`TaskQueue::start`]
    ///
    /// # Errors
    ///
    /// [`QueueError::WorkerAfterStart`] if the queue is running.
    pub fn add_worker(&self, handler: Box<dyn TaskHandler<T>>) -> Result<(), QueueError> {
        let mut pending = self.pending_workers.lock();
        if self.is_started() {
            tracing::error!("Rejected worker registration on a running task queue");
            return Err(QueueError::WorkerAfterStart);
        }
        pending.push(handler);
        Ok(())
    }

    /// Spawns one thread per registered worker
    ///
    /// # Errors
    ///
    /// * [`QueueError::AlreadyStarted`] if the queue is running
    /// * [`QueueError::Spawn`] if a thread could not be created; workers
    ///   spawned so far are stopped again
    pub fn start(self: &Arc<Self>) -> Result<(), QueueError> {
        let handlers: Vec<_> = {
            let mut pending = self.pending_workers.lock();
            if self.started.swap(true, Ordering::SeqCst) {
                tracing::error!("Task queue is already started");
                return Err(QueueError::AlreadyStarted);
            }
            pending.drain(..).collect()
        };

        tracing::info!("Starting task queue with {} workers", handlers.len());

        let mut handles = self.handles.lock();
        for (index, handler) in handlers.into_iter().enumerate() {
            let name = format!("{}-{}", self.options.thread_name_prefix, index);
            let queue = Arc::clone(self);
            let thread_name = name.clone();

            *self.live_workers.lock() += 1;
            let spawned = thread::Builder::new()
                .name(name.clone())
                .spawn(move || run_worker(queue, handler, thread_name));

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    self.worker_exited();
                    drop(handles);
                    tracing::error!("Failed to spawn worker {}: {}", name, e);
                    self.stop();
                    return Err(QueueError::Spawn(e));
                }
            }
        }

        Ok(())
    }

    /// Signals all workers to exit and waits for them
    ///
    /// Workers finish the task they are running. Threads still busy after the
    /// grace period are detached. Must not be called from a worker thread.
    ///
    /// # Returns
    ///
    /// `true` if every worker exited within the grace period
    pub fn stop(&self) -> bool {
        if !self.started.swap(false, Ordering::SeqCst) {
            tracing::debug!("Stop requested on a task queue that is not running");
        }

        {
            let _state = self.state.lock();
            self.work_available.notify_all();
        }

        let stopped = self.join(Some(self.options.stop_timeout));
        let handles = std::mem::take(&mut *self.handles.lock());

        if stopped {
            for handle in handles {
                if handle.join().is_err() {
                    tracing::warn!("A worker thread terminated by panic");
                }
            }
            tracing::info!("Task queue stopped");
        } else {
            tracing::warn!(
                "{} workers still busy after {:?}, detaching them",
                self.live_workers(),
                self.options.stop_timeout
            );
        }

        stopped
    }

    /// Waits until all worker threads have exited
    ///
    /// # Arguments
    ///
    /// * `timeout` - Longest wait, or `None` to wait indefinitely
    ///
    /// # Returns
    ///
    /// `true` if no worker is running any more
    pub fn join(&self, timeout: Option<Duration>) -> bool {
        let mut live = self.live_workers.lock();

        match timeout {
            None => {
                while *live > 0 {
                    self.workers_exited.wait(&mut live);
                }
                true
            }
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                while *live > 0 {
                    if self.workers_exited.wait_until(&mut live, deadline).timed_out() {
                        return *live == 0;
                    }
                }
                true
            }
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Worker threads currently running
    pub fn live_workers(&self) -> usize {
        *self.live_workers.lock()
    }

    /// Appends a task to the queue
    pub fn enqueue(&self, task: T) {
        self.state.lock().queue.enqueue(task);
        self.work_available.notify_one();
    }

    /// Appends a low-priority task (spills to the overflow store first)
    pub fn enqueue_deferred(&self, task: T) {
        self.state.lock().queue.defer_insert(task);
        self.work_available.notify_one();
    }

    /// Holds `task` back for `delay`; never blocks
    pub fn defer(&self, task: T, delay: Duration) {
        self.state.lock().deferred.push(task, delay, Instant::now());
        self.work_available.notify_one();
    }

    /// Returns the next admissible task without blocking
    ///
    /// A deferred task whose delay has elapsed is served first. Otherwise
    /// tasks are popped from the queue; a task whose sequence is at the
    /// concurrency limit goes back to the tail and the next one is tried, up
    /// to [`MAX_DEQUEUE_ATTEMPTS`] times.
    ///
    /// Every returned task must be reported with [`TaskQueue::task_processed`].
    pub fn dequeue(&self) -> Option<T> {
        let limit = self.options.max_parallel_sequences;
        let mut state = self.state.lock();

        if let Some(task) = state.deferred.pop_ready(Instant::now()) {
            if state.start_processing(&task, limit) {
                return Some(task);
            }
            // Sequence is saturated; the task waits in line like any other
            state.queue.enqueue(task);
        }

        // The queue cannot change under the lock, one full rotation is enough
        let attempts = MAX_DEQUEUE_ATTEMPTS.min(state.queue.len());
        for _ in 0..attempts {
            let task = state.queue.dequeue()?;
            if state.start_processing(&task, limit) {
                return Some(task);
            }
            state.queue.enqueue(task);
        }

        None
    }

    /// Reports that a dequeued task is finished
    pub fn task_processed(&self, task: &T) {
        self.finish_processing(task.sequence_key());
    }

    pub(crate) fn finish_processing(&self, key: Option<&str>) {
        self.state
            .lock()
            .finish_processing(key, self.options.max_parallel_sequences);
        self.work_available.notify_one();
    }

    /// Blocks for at most `max_wait` or until new work may be available
    ///
    /// Returns early when a deferred task becomes ready or the queue is
    /// stopped.
    pub fn wait_for_work(&self, max_wait: Duration) {
        let mut state = self.state.lock();
        if !self.is_started() {
            return;
        }

        let mut wait = max_wait;
        if let Some(ready_at) = state.deferred.next_ready_at() {
            match ready_at.checked_duration_since(Instant::now()) {
                Some(remaining) if !remaining.is_zero() => wait = wait.min(remaining),
                _ => return,
            }
        }

        self.work_available.wait_for(&mut state, wait);
    }

    /// Queued + deferred + in-flight tasks
    pub fn size(&self) -> usize {
        let state = self.state.lock();
        state.queue.len() + state.deferred.len() + state.processing
    }

    /// Tasks in the hybrid queue (memory and overflow store)
    pub fn queued_len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn deferred_len(&self) -> usize {
        self.state.lock().deferred.len()
    }

    /// Tasks dequeued and not yet reported as processed
    pub fn processing_count(&self) -> usize {
        self.state.lock().processing
    }

    /// In-flight tasks of one sequence (always 0 when sequences are unlimited)
    pub fn in_flight(&self, sequence_key: &str) -> usize {
        self.state
            .lock()
            .in_flight
            .get(sequence_key)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn worker_exited(&self) {
        let mut live = self.live_workers.lock();
        *live = live.saturating_sub(1);
        self.workers_exited.notify_all();
    }
}
