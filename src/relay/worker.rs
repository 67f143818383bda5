//! Worker loops that drain the queue under the global concurrency limit.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::types::{Task, TaskStatus};

use super::pipeline::Pipeline;
use super::queue::TaskQueue;

/// Shared state every worker loop needs
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub(crate) queue: Arc<TaskQueue>,
    /// Global concurrency limiter (sized independently of the worker count)
    pub(crate) limiter: Arc<Semaphore>,
    pub(crate) pipeline: Arc<Pipeline>,
    /// Stops the loops between tasks
    pub(crate) shutdown: CancellationToken,
}

/// Spawn `count` worker loops
pub(crate) fn spawn_workers(count: usize, ctx: WorkerContext) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|worker_id| {
            let ctx = ctx.clone();
            tokio::spawn(async move { worker_loop(worker_id, ctx).await })
        })
        .collect()
}

/// One worker: acquire a limiter slot, dequeue, dispatch, release, repeat
///
/// Every queue entry costs exactly one slot and one dequeue, whether it is
/// "process this file" or "announce this result". Shutdown is only observed
/// while waiting; a dequeued task is always dispatched to completion.
async fn worker_loop(worker_id: usize, ctx: WorkerContext) {
    tracing::debug!(worker_id, "Worker started");

    loop {
        let permit = tokio::select! {
            biased;
            _ = ctx.shutdown.cancelled() => break,
            permit = ctx.limiter.clone().acquire_owned() => match permit {
                Ok(p) => p,
                // Limiter closed
                Err(_) => break,
            },
        };

        let task = tokio::select! {
            biased;
            _ = ctx.shutdown.cancelled() => break,
            task = ctx.queue.dequeue() => task,
        };

        let task_id = task.id;
        tracing::debug!(worker_id, task_id = %task_id, status = %task.status(), "Got task");

        dispatch(task, &ctx.queue, &ctx.pipeline).await;

        drop(permit);
        tracing::debug!(worker_id, task_id = %task_id, "Task done");
    }

    tracing::debug!(worker_id, "Worker stopped");
}

/// Handle one queue entry according to the task's status
///
/// Pending tasks are processed and put back on the queue with their terminal
/// status; terminal tasks are reported and dropped.
pub(crate) async fn dispatch(mut task: Task, queue: &TaskQueue, pipeline: &Pipeline) {
    match task.status() {
        TaskStatus::Pending => {
            tracing::info!(task_id = %task.id, task = %task, "Processing task");
            pipeline.process(&mut task).await;
            queue.enqueue(task);
        }
        TaskStatus::Succeeded => {
            tracing::info!(
                task_id = %task.id,
                task = %task,
                age_ms = task.age().num_milliseconds(),
                "Task succeeded"
            );
            task.report
                .update(&format!("Saved\n{}", task.file_name()))
                .await;
        }
        TaskStatus::Failed => {
            let reason = task
                .error()
                .map(ToString::to_string)
                .unwrap_or_else(|| "unknown error".to_string());
            tracing::error!(
                task_id = %task.id,
                task = %task,
                age_ms = task.age().num_milliseconds(),
                error = %reason,
                "Task failed"
            );
            task.report
                .update(&format!("Failed to save file\n{reason}"))
                .await;
        }
        TaskStatus::Canceled => {
            tracing::info!(
                task_id = %task.id,
                task = %task,
                age_ms = task.age().num_milliseconds(),
                reason = ?task.error(),
                "Task canceled"
            );
        }
    }
}
