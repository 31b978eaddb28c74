//! Task queue and worker
//!
//! A single worker thread drains tasks in FIFO order. Synchronous callers go
//! through [`TaskQueue::run_exclusive`], which waits until the queue is empty
//! and the worker idle, then runs on the caller's thread while holding the
//! queue lock, so no task can start in between.

use crate::error::RunnerError;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

/// Unit of work run on the worker thread
pub trait Task: Send {
    /// Short name for logs and errors
    fn name(&self) -> &'static str;

    /// Run the task, consuming it
    fn execute(self: Box<Self>);
}

#[derive(Default)]
struct QueueState {
    tasks: VecDeque<Box<dyn Task>>,
    /// A task is running outside the lock
    busy: bool,
    shutdown: bool,
    /// Names and messages of tasks that panicked
    failures: Vec<String>,
}

impl QueueState {
    fn is_idle(&self) -> bool {
        self.tasks.is_empty() && !self.busy
    }
}

struct Shared {
    state: Mutex<QueueState>,
    changed: Condvar,
}

/// FIFO task queue with one dedicated worker
pub struct TaskQueue {
    shared: Arc<Shared>,
    worker_id: ThreadId,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TaskQueue {
    /// Start the worker thread
    ///
    /// # Errors
    /// Fails only if the OS refuses to spawn a thread.
    pub fn start() -> std::io::Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState::default()),
            changed: Condvar::new(),
        });
        let handle = thread::Builder::new().name("delta-worker".to_string()).spawn({
            let shared = Arc::clone(&shared);
            move || worker_loop(&shared)
        })?;
        Ok(Self {
            shared,
            worker_id: handle.thread().id(),
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Append a task
    ///
    /// # Errors
    /// [`RunnerError::WorkerStopped`] once the queue has shut down.
    pub fn push(&self, task: Box<dyn Task>) -> Result<(), RunnerError> {
        let mut state = self.shared.state.lock();
        if state.shutdown {
            return Err(RunnerError::WorkerStopped);
        }
        tracing::trace!(task = task.name(), depth = state.tasks.len(), "task queued");
        state.tasks.push_back(task);
        drop(state);
        self.shared.changed.notify_all();
        Ok(())
    }

    /// Wait for every queued task, then run `f` before the worker can pick
    /// up anything new
    ///
    /// # Errors
    /// [`RunnerError::InvariantViolation`] when called from the worker
    /// itself, [`RunnerError::WorkerStopped`] when the worker exited with
    /// tasks still queued.
    pub fn run_exclusive<T>(&self, f: impl FnOnce() -> T) -> Result<T, RunnerError> {
        if self.is_worker_thread() {
            return Err(RunnerError::InvariantViolation(
                "synchronous call issued from the worker thread".to_string(),
            ));
        }
        let guard = self.wait_idle()?;
        let value = f();
        drop(guard);
        Ok(value)
    }

    /// Block until the queue is empty and the worker idle
    ///
    /// # Errors
    /// As [`Self::run_exclusive`].
    pub fn wait_until_idle(&self) -> Result<(), RunnerError> {
        if self.is_worker_thread() {
            return Err(RunnerError::InvariantViolation(
                "worker thread waiting on itself".to_string(),
            ));
        }
        self.wait_idle().map(drop)
    }

    fn wait_idle(&self) -> Result<MutexGuard<'_, QueueState>, RunnerError> {
        let mut state = self.shared.state.lock();
        while !state.is_idle() {
            if state.shutdown && !self.worker_alive() {
                return Err(RunnerError::WorkerStopped);
            }
            self.shared.changed.wait(&mut state);
        }
        Ok(state)
    }

    fn worker_alive(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Whether the caller is running on the worker thread
    #[inline]
    #[must_use]
    pub fn is_worker_thread(&self) -> bool {
        thread::current().id() == self.worker_id
    }

    /// Tasks waiting to run
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.state.lock().tasks.len()
    }

    /// No task waiting
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Messages of tasks that panicked, oldest first
    #[must_use]
    pub fn failures(&self) -> Vec<String> {
        self.shared.state.lock().failures.clone()
    }

    /// Stop accepting tasks, let the worker drain what is queued and join it
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.shutdown {
                return;
            }
            state.shutdown = true;
        }
        self.shared.changed.notify_all();
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if self.is_worker_thread() {
                tracing::warn!("task queue shut down from its own worker; not joining");
                return;
            }
            if handle.join().is_err() {
                tracing::error!("worker thread panicked outside a task");
            }
        }
        tracing::debug!("task queue stopped");
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: &Shared) {
    tracing::debug!("worker started");
    loop {
        let task = {
            let mut state = shared.state.lock();
            loop {
                if let Some(task) = state.tasks.pop_front() {
                    state.busy = true;
                    break task;
                }
                if state.shutdown {
                    tracing::debug!("worker exiting");
                    return;
                }
                shared.changed.wait(&mut state);
            }
        };

        let name = task.name();
        tracing::trace!(task = name, "task started");
        let result = panic::catch_unwind(AssertUnwindSafe(move || task.execute()));

        let mut state = shared.state.lock();
        state.busy = false;
        if let Err(payload) = result {
            let message = panic_message(payload.as_ref());
            tracing::error!(task = name, %message, "task panicked");
            state.failures.push(format!("{name}: {message}"));
        }
        drop(state);
        shared.changed.notify_all();
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
