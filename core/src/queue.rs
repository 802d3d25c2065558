//! Fixed-size pool of worker threads draining a shared FIFO of tasks.
//!
//! Every submitted task bumps a pending counter that only drops once the task
//! has finished running, so [`WorkQueue::await_idle`] also waits for tasks that
//! running tasks submit on their way out.

use crate::error::QueueError;
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::collections::VecDeque;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct Tasks {
    queue: VecDeque<Task>,
    shutdown: bool,
}

#[derive(Default)]
struct Shared {
    tasks: Mutex<Tasks>,
    available: Condvar,
    pending: Mutex<usize>,
    idle: Condvar,
}

impl Shared {
    fn finish(&self, count: usize) {
        let mut pending = self.pending.lock();
        *pending -= count;
        if *pending == 0 {
            self.idle.notify_all();
        }
    }
}

pub struct WorkQueue {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
}

impl WorkQueue {
    pub const DEFAULT_THREADS: usize = 5;

    /// Starts `threads` workers (at least one).
    pub fn new(threads: usize) -> io::Result<Self> {
        let size = threads.max(1);
        let shared = Arc::new(Shared::default());
        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let shared = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name(format!("worker-{id}"))
                .spawn(move || run_worker(&shared))?;
            workers.push(handle);
        }
        tracing::debug!(threads = size, "work queue started");
        Ok(Self { shared, workers: Mutex::new(workers), size })
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Tasks submitted but not yet finished.
    pub fn pending(&self) -> usize {
        *self.shared.pending.lock()
    }

    /// Enqueues a task without waiting for it. Fails once the queue is shut down.
    pub fn submit<F>(&self, task: F) -> Result<(), QueueError>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut tasks = self.shared.tasks.lock();
        if tasks.shutdown {
            return Err(QueueError::Shutdown);
        }
        *self.shared.pending.lock() += 1;
        tasks.queue.push_back(Box::new(task));
        self.shared.available.notify_one();
        Ok(())
    }

    /// Blocks until the pending counter reaches zero. Must not be called from a
    /// task running on this queue.
    pub fn await_idle(&self) {
        let mut pending = self.shared.pending.lock();
        while *pending > 0 {
            self.shared.idle.wait(&mut pending);
        }
    }

    /// Stops the workers once their current task finishes. Queued tasks that
    /// have not started are dropped. Safe to call more than once.
    pub fn shutdown(&self) {
        let dropped = {
            let mut tasks = self.shared.tasks.lock();
            tasks.shutdown = true;
            let dropped = tasks.queue.len();
            tasks.queue.clear();
            self.shared.available.notify_all();
            dropped
        };
        if dropped > 0 {
            tracing::debug!(dropped, "discarded queued tasks on shutdown");
            self.shared.finish(dropped);
        }

        let current = thread::current().id();
        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            if worker.thread().id() == current {
                continue;
            }
            if worker.join().is_err() {
                tracing::error!("worker thread exited abnormally");
            }
        }
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(shared: &Shared) {
    loop {
        let task = {
            let mut tasks = shared.tasks.lock();
            loop {
                if tasks.shutdown {
                    return;
                }
                if let Some(task) = tasks.queue.pop_front() {
                    break task;
                }
                shared.available.wait(&mut tasks);
            }
        };
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
            tracing::error!(reason = panic_reason(payload.as_ref()), "task panicked");
        }
        shared.finish(1);
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown"
    }
}
