//! Task queue behavior with file-backed overflow storage

use parking_lot::Mutex;
use ripple_frontier::queue::{HybridQueue, TaskQueue, TaskQueueOptions};
use ripple_frontier::storage::SqliteOverflowStore;
use ripple_frontier::CrawlTask;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn task(i: u32) -> CrawlTask {
    CrawlTask::new(&format!("https://queue.test/{}", i), 0).unwrap()
}

fn disk_queue(dir: &std::path::Path, capacity: usize) -> HybridQueue<CrawlTask> {
    let store = SqliteOverflowStore::<CrawlTask>::open(dir).unwrap();
    HybridQueue::with_overflow(capacity, Box::new(store))
}

#[test]
fn test_hysteresis_with_disk_overflow() {
    let dir = tempfile::tempdir().unwrap();
    let mut queue = disk_queue(&dir.path().join("queue"), 10);

    for i in 1..=15 {
        queue.enqueue(task(i));
    }
    assert_eq!(queue.memory_len(), 10);
    assert_eq!(queue.overflow_len(), 5);
    assert!(queue.is_overflow_mode());

    // Items 1-10 come from memory; overflow mode holds until memory < 5
    let mut drained = Vec::new();
    for _ in 0..5 {
        drained.push(queue.dequeue().unwrap());
        assert!(queue.is_overflow_mode());
    }
    drained.push(queue.dequeue().unwrap());
    assert!(!queue.is_overflow_mode());
    assert_eq!(queue.overflow_len(), 5);

    // Items 11-15 are refilled from the store once memory is down to 1
    while let Some(task) = queue.dequeue() {
        drained.push(task);
    }

    let urls: Vec<String> = drained.into_iter().map(|t| t.url).collect();
    let expected: Vec<String> = (1..=15).map(|i| task(i).url).collect();
    assert_eq!(urls, expected);
    assert_eq!(queue.len(), 0);
}

#[test]
fn test_overflow_keeps_task_fields() {
    let dir = tempfile::tempdir().unwrap();
    let mut queue = disk_queue(&dir.path().join("queue"), 1);

    let original = task(2)
        .with_custom_data(serde_json::json!({ "campaign": 7 }))
        .unthrottled();
    queue.enqueue(task(1));
    queue.enqueue(original.clone());
    assert_eq!(queue.overflow_len(), 1);

    queue.dequeue().unwrap();
    assert_eq!(queue.dequeue(), Some(original));
}

#[test]
fn test_reopening_store_discards_previous_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queue");

    {
        let mut queue = disk_queue(&path, 1);
        for i in 1..=5 {
            queue.enqueue(task(i));
        }
        assert_eq!(queue.overflow_len(), 4);
    }

    let mut queue = disk_queue(&path, 1);
    assert!(queue.is_empty());
    assert_eq!(queue.dequeue(), None);
}

#[test]
fn test_workers_respect_sequence_limit() {
    let dir = tempfile::tempdir().unwrap();
    let options = TaskQueueOptions {
        max_parallel_sequences: 1,
        poll_interval: Duration::from_millis(2),
        stop_timeout: Duration::from_secs(2),
        ..TaskQueueOptions::default()
    };
    let queue = Arc::new(TaskQueue::new(
        disk_queue(&dir.path().join("queue"), 4),
        options,
    ));

    // Sequence key -> (running, max running)
    let running: Arc<Mutex<HashMap<String, (usize, usize)>>> = Arc::default();
    for _ in 0..4 {
        let running = Arc::clone(&running);
        queue
            .add_worker(Box::new(
                move |task: CrawlTask, _queue: &TaskQueue<CrawlTask>| -> anyhow::Result<()> {
                    let key = task.domain.clone();
                    {
                        let mut running = running.lock();
                        let entry = running.entry(key.clone()).or_insert((0, 0));
                        entry.0 += 1;
                        entry.1 = entry.1.max(entry.0);
                    }
                    thread::sleep(Duration::from_millis(5));
                    if let Some(entry) = running.lock().get_mut(&key) {
                        entry.0 -= 1;
                    }
                    Ok(())
                },
            ))
            .unwrap();
    }

    for i in 0..10 {
        queue.enqueue(CrawlTask::new(&format!("https://one.test/{}", i), 0).unwrap());
        queue.enqueue(CrawlTask::new(&format!("https://two.test/{}", i), 0).unwrap());
    }
    queue.start().unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    while queue.size() > 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(queue.size(), 0);
    assert!(queue.stop());

    let running = running.lock();
    assert_eq!(running["one.test"].1, 1);
    assert_eq!(running["two.test"].1, 1);
}
