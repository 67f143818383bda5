//! Startup and shutdown coordination.

use std::sync::atomic::Ordering;

use crate::error::Result;
use crate::types::TaskStatus;

use super::Relay;
use super::worker::{WorkerContext, dispatch, spawn_workers};

impl Relay {
    /// Start the worker loops
    ///
    /// Spawns `workers` loops that run until [`Relay::shutdown`]. Calling it
    /// again while workers are running, or after shutdown, does nothing.
    pub fn start(&self) {
        if !self.workers.accepting_new.load(Ordering::SeqCst) {
            tracing::warn!("Relay is shut down, ignoring start");
            return;
        }

        let mut handles = self.workers.handles.lock();
        if !handles.is_empty() {
            tracing::warn!("Workers already running, ignoring start");
            return;
        }

        let ctx = WorkerContext {
            queue: self.queue.clone(),
            limiter: self.limiter.clone(),
            pipeline: self.pipeline.clone(),
            shutdown: self.workers.shutdown.clone(),
        };
        *handles = spawn_workers(self.config.workers, ctx);

        tracing::info!(workers = handles.len(), "Started workers");
    }

    /// Whether [`Relay::start`] has spawned the worker loops
    pub fn is_running(&self) -> bool {
        !self.workers.handles.lock().is_empty() && !self.workers.shutdown.is_cancelled()
    }

    /// Gracefully shut down the relay
    ///
    /// 1. Stops accepting new tasks
    /// 2. Signals the worker loops to stop waiting for work
    /// 3. Waits for every worker to finish the entry it is handling
    /// 4. Reports every finished task still queued; drops pending ones
    ///
    /// In-flight transfers are not interrupted; cancel a task through its own
    /// token to abort it.
    ///
    /// # Errors
    ///
    /// Currently infallible; the `Result` leaves room for backends that need
    /// flushing.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        // 1. Stop accepting new tasks
        self.workers.accepting_new.store(false, Ordering::SeqCst);

        // 2. Stop the worker loops between tasks
        self.workers.shutdown.cancel();

        // 3. Wait for in-flight entries
        let handles = std::mem::take(&mut *self.workers.handles.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Worker ended abnormally");
            }
        }

        // 4. Drain: finished tasks still owe their user a result
        let mut dropped = 0usize;
        while let Some(task) = self.queue.try_dequeue() {
            if task.status() == TaskStatus::Pending {
                tracing::debug!(task_id = %task.id, task = %task, "Dropping pending task");
                dropped += 1;
            } else {
                dispatch(task, &self.queue, &self.pipeline).await;
            }
        }
        if dropped > 0 {
            tracing::warn!(dropped, "Dropped pending tasks at shutdown");
        }

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }
}
