use crossbeam::channel::{Receiver, Sender, bounded, unbounded};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use super::panic_message;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// A concurrent task executor based on a thread pool pattern.
///
/// Used by the app to run `on_start` hooks without waiting for them. A task that panics is
/// caught at the worker boundary and logged; the worker keeps serving the queue.
pub struct Executor {
    sender: Sender<Message>,
    workers: Vec<Worker>,
}

enum Message {
    Task(Task),
    Shutdown,
}

struct Worker {
    id: usize,
    handle: Option<thread::JoinHandle<()>>,
}

impl Executor {
    /// Creates a new executor with the specified number of worker threads (at least one).
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let (sender, receiver) = unbounded();
        let mut workers = Vec::with_capacity(size);

        for id in 0..size {
            workers.push(Worker::new(id, receiver.clone()));
        }

        Executor { sender, workers }
    }

    /// Creates a single-threaded executor.
    pub fn single_threaded() -> Self {
        Self::new(1)
    }

    /// Executes a task on the thread pool.
    /// Tasks are executed in FIFO order, but completion order is non-deterministic.
    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.sender.send(Message::Task(Box::new(f))).is_err() {
            log::warn!("executor queue closed, task dropped");
        }
    }

    /// Spawns a cancelable task.
    ///
    /// Cancelling the returned handle before a worker picks the task up skips it. A task that
    /// already started is handed the same [`CancelToken`] and is expected to return soon after
    /// the token reports cancellation.
    pub fn spawn<F>(&self, f: F) -> TaskHandle
    where
        F: FnOnce(&CancelToken) + Send + 'static,
    {
        let token = CancelToken::new();
        let finished = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = bounded(1);

        let task_token = token.clone();
        let completion = Completion {
            finished: Arc::clone(&finished),
            done: done_tx,
        };
        self.execute(move || {
            let _completion = completion;
            if task_token.is_cancelled() {
                log::trace!("skipping cancelled task");
            } else {
                f(&task_token);
            }
        });

        TaskHandle {
            token,
            finished,
            done: done_rx,
        }
    }

    /// Returns the number of worker threads in the pool.
    pub fn size(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        // Queued tasks run before the shutdown messages reach the workers.
        for _ in &self.workers {
            let _ = self.sender.send(Message::Shutdown);
        }

        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take() {
                if handle.join().is_err() {
                    log::error!("executor worker {} terminated abnormally", worker.id);
                }
            }
        }
    }
}

impl Worker {
    fn new(id: usize, receiver: Receiver<Message>) -> Self {
        let handle = thread::spawn(move || {
            loop {
                match receiver.recv() {
                    Ok(Message::Task(task)) => {
                        if let Err(payload) = catch_unwind(AssertUnwindSafe(task)) {
                            log::error!(
                                "task panicked on worker {id}: {}",
                                panic_message(payload.as_ref())
                            );
                        }
                    }
                    Ok(Message::Shutdown) | Err(_) => break,
                }
            }
        });

        Worker {
            id,
            handle: Some(handle),
        }
    }
}

/// Marks a spawned task finished when dropped, including while unwinding from a panic.
struct Completion {
    finished: Arc<AtomicBool>,
    done: Sender<()>,
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.finished.store(true, Ordering::Release);
        let _ = self.done.try_send(());
    }
}

/// Cooperative cancellation flag shared between a [`TaskHandle`] and its running task.
#[derive(Debug, Default, Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns `true` once any clone of this token was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Handle to a task spawned with [`Executor::spawn`].
#[derive(Debug)]
pub struct TaskHandle {
    token: CancelToken,
    finished: Arc<AtomicBool>,
    done: Receiver<()>,
}

impl TaskHandle {
    /// Skip the task if it has not started yet, and signal its token if it has.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns `true` once [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The token handed to the task.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Returns `true` once the task ran, was skipped, or panicked.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Block until the task ran, was skipped, or panicked.
    pub fn wait(&self) {
        if !self.is_finished() {
            let _ = self.done.recv();
        }
    }

    /// Like [`wait`](Self::wait), giving up after `timeout`. Returns `true` if the task finished.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.is_finished() || self.done.recv_timeout(timeout).is_ok() || self.is_finished()
    }
}
