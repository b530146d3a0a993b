//! A fixed-size pool of workers draining a bounded task queue.
//!
//! ```text
//!   submit ──▶ [ bounded task queue ] ──▶ worker 1..N  (each: take, run, repeat)
//! ```
//!
//! The queue capacity is independent of the worker count, so bursts are
//! absorbed without spawning more workers. When the queue is full,
//! [`WorkerPool::submit`] waits, which pushes back on the submitter.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use parking_lot::Mutex;
use switchboard_framework::processor::panic_message;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// A unit of work.
pub type Task = BoxFuture<'static, ()>;

const STOPPED: &str = "task submitted to a stopped worker pool";

/// Runs submitted tasks on `size` long-lived tokio tasks.
pub struct WorkerPool {
    size: usize,
    sender: Mutex<Option<mpsc::Sender<Task>>>,
    receiver: Mutex<Option<mpsc::Receiver<Task>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Creates a pool of `size` workers over a queue of `queue_capacity`.
    ///
    /// # Panics
    ///
    /// Panics if `size` or `queue_capacity` is zero.
    pub fn new(size: usize, queue_capacity: usize) -> Self {
        assert!(size > 0, "worker pool size must be positive");
        let (tx, rx) = mpsc::channel(queue_capacity);
        Self {
            size,
            sender: Mutex::new(Some(tx)),
            receiver: Mutex::new(Some(rx)),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns `true` once [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Spawns the workers. Calling it again has no effect.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let Some(rx) = self.receiver.lock().take() else {
            warn!("Worker pool already started");
            return;
        };
        let rx = Arc::new(AsyncMutex::new(rx));

        let mut workers = self.workers.lock();
        for id in 0..self.size {
            workers.push(tokio::spawn(worker_loop(id, Arc::clone(&rx))));
        }
        debug!(workers = self.size, "Worker pool started");
    }

    /// Enqueues `task`, waiting while the queue is full.
    ///
    /// Tasks submitted before [`start`](Self::start) wait in the queue.
    ///
    /// # Panics
    ///
    /// Panics if the pool has been stopped.
    pub async fn submit<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.reserve().await.submit(task);
    }

    /// Waits for a free queue slot and holds it.
    ///
    /// Cancel-safe, so it can sit in a `select!` next to other sources
    /// without losing work. A held permit keeps the queue open: drop it
    /// before calling [`stop`](Self::stop).
    ///
    /// # Panics
    ///
    /// Panics if the pool has been stopped.
    pub async fn reserve(&self) -> TaskPermit {
        let sender = self.sender.lock().clone().expect(STOPPED);
        match sender.reserve_owned().await {
            Ok(permit) => TaskPermit { permit },
            Err(_) => panic!("{STOPPED}"),
        }
    }

    /// Closes the queue and waits until every submitted task has run.
    ///
    /// Submitters already waiting for queue space still get their tasks in.
    /// If the pool was never started, the queue is drained on the caller.
    pub async fn stop(&self) {
        drop(self.sender.lock().take());

        let unstarted = self.receiver.lock().take();
        if let Some(mut rx) = unstarted {
            rx.close();
            while let Some(task) = rx.recv().await {
                run_task(usize::MAX, task).await;
            }
        }

        let workers = std::mem::take(&mut *self.workers.lock());
        for result in join_all(workers).await {
            if let Err(err) = result {
                error!(error = %err, "Worker terminated abnormally");
            }
        }
        debug!("Worker pool stopped");
    }
}

/// A reserved slot in a [`WorkerPool`] queue.
#[derive(Debug)]
pub struct TaskPermit {
    permit: mpsc::OwnedPermit<Task>,
}

impl TaskPermit {
    /// Enqueues `task` into the reserved slot. Never waits.
    pub fn submit<F>(self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.permit.send(Box::pin(task));
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.size)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

async fn worker_loop(id: usize, rx: Arc<AsyncMutex<mpsc::Receiver<Task>>>) {
    loop {
        // The guard is released before the task runs.
        let next = rx.lock().await.recv().await;
        let Some(task) = next else {
            break;
        };
        run_task(id, task).await;
    }
}

async fn run_task(worker: usize, task: Task) {
    if let Err(panic) = AssertUnwindSafe(task).catch_unwind().await {
        error!(worker, panic = %panic_message(&*panic), "Task panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    async fn explode() {
        panic!("task failure");
    }

    async fn drain(size: usize, tasks: usize) -> usize {
        let pool = WorkerPool::new(size, 4);
        let done = Arc::new(AtomicUsize::new(0));
        pool.start();

        for i in 0..tasks {
            let done = Arc::clone(&done);
            pool.submit(async move {
                tokio::time::sleep(Duration::from_millis((i % 3) as u64)).await;
                done.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        }
        pool.stop().await;
        done.load(Ordering::SeqCst)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stop_drains_every_task() {
        for size in [1, 3, 8] {
            for tasks in [0, 1, 25] {
                let completed = tokio::time::timeout(Duration::from_secs(10), drain(size, tasks))
                    .await
                    .unwrap();
                assert_eq!(completed, tasks, "size {size}, tasks {tasks}");
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded_by_size() {
        let pool = WorkerPool::new(2, 16);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        pool.start();

        for _ in 0..10 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            pool.submit(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            })
            .await;
        }
        pool.stop().await;

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_panicking_task_does_not_kill_worker() {
        let pool = WorkerPool::new(1, 4);
        let done = Arc::new(AtomicUsize::new(0));
        pool.start();

        pool.submit(explode()).await;
        let counter = Arc::clone(&done);
        pool.submit(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await;
        pool.stop().await;

        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_without_start_runs_queued_tasks() {
        let pool = WorkerPool::new(2, 4);
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let done = Arc::clone(&done);
            pool.submit(async move {
                done.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        }

        pool.stop().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert!(pool.is_stopped());
    }

    #[tokio::test]
    async fn test_reserved_slot_survives_select() {
        let pool = WorkerPool::new(1, 1);
        let done = Arc::new(AtomicUsize::new(0));

        let permit = tokio::select! {
            permit = pool.reserve() => permit,
            _ = tokio::time::sleep(Duration::from_secs(5)) => unreachable!(),
        };
        let counter = Arc::clone(&done);
        permit.submit(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        // The only slot is taken until a worker picks the task up.
        let blocked = tokio::time::timeout(Duration::from_millis(20), pool.reserve()).await;
        assert!(blocked.is_err());

        pool.start();
        pool.stop().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    #[should_panic(expected = "stopped worker pool")]
    async fn test_submit_after_stop_panics() {
        let pool = WorkerPool::new(1, 1);
        pool.start();
        pool.stop().await;
        pool.submit(async {}).await;
    }
}
