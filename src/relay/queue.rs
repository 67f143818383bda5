//! FIFO task queue shared by producers and workers.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::types::Task;

/// Unbounded, insertion-ordered queue of tasks
///
/// A monitor: a mutex-guarded deque plus a [`Notify`] that wakes one waiting
/// worker per enqueue. Enqueue never blocks and never fails; dequeue waits
/// until a task is available. A task put back by a worker is a new entry at
/// the tail.
#[derive(Default)]
pub struct TaskQueue {
    tasks: Mutex<VecDeque<Task>>,
    available: Notify,
}

impl TaskQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task and wake one waiting worker
    pub fn enqueue(&self, task: Task) {
        self.tasks.lock().push_back(task);
        self.available.notify_one();
    }

    /// Take the oldest task, waiting until one is available
    pub async fn dequeue(&self) -> Task {
        loop {
            // Register interest before checking, so an enqueue between the
            // check and the await is not missed.
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(task) = self.try_dequeue() {
                return task;
            }

            notified.await;
        }
    }

    /// Take the oldest task if there is one
    pub fn try_dequeue(&self) -> Option<Task> {
        self.tasks.lock().pop_front()
    }

    /// Number of waiting entries
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Whether no entry is waiting
    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("len", &self.len())
            .finish()
    }
}
