use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    CompletedTask,
    error::{Result, SchedulerError},
    queue::WorkQueue,
};

/// Shared, append-only list of finished tasks.
pub(crate) type CompletedLog = Arc<Mutex<Vec<CompletedTask>>>;

/// Pulls tasks until the queue is closed and drained.
///
/// Each callable runs on the blocking pool and the worker waits for it, so a
/// worker never has more than one task in flight. Returns how many tasks this
/// worker executed.
pub(crate) async fn worker_loop(
    worker: usize,
    queue: Arc<WorkQueue>,
    completed: CompletedLog,
) -> Result<usize> {
    info!("worker started");
    let mut executed = 0;

    while let Some(task) = queue.dequeue().await {
        let task_name = task.name.clone();

        let record = tokio::task::spawn_blocking(move || task.execute(worker))
            .await
            .map_err(|e| SchedulerError::WorkerJoin {
                worker,
                message: format!("task {task_name}: {e}"),
            })??;

        if record.is_panicked() {
            warn!(
                task_id = %record.id,
                task_name = %record.name,
                status = %record.status,
                "task panicked"
            );
        } else {
            debug!(
                task_id = %record.id,
                task_name = %record.name,
                time_taken_ms = record.time_taken.as_millis(),
                "task completed"
            );
        }

        completed.lock().await.push(record);
        executed += 1;
    }

    info!(executed, "worker exiting");
    Ok(executed)
}
