//! The task scheduler.

use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;
use tokio::sync::Mutex;
use tracing::{Instrument, debug, error, info, info_span};

use crate::{
    CompletedTask, PanicPolicy, RunId, RunSummary, SchedulerConfig, Task, TaskId, TaskStatus,
    error::{Result, SchedulerError},
    queue::WorkQueue,
    worker::{CompletedLog, worker_loop},
};

/// Runs registered tasks on a fixed-size pool of workers.
///
/// Tasks are registered with [`add_task`](Self::add_task) and consumed by
/// [`run`](Self::run). Both take `&mut self`, so registration cannot race a
/// run. Completed tasks accumulate across runs.
#[derive(Debug)]
pub struct TaskScheduler {
    config: SchedulerConfig,
    pending: Vec<Task>,
    completed: CompletedLog,
}

impl TaskScheduler {
    /// Scheduler with default settings and `max_workers` workers.
    ///
    /// Fails with [`SchedulerError::Config`] when `max_workers` is zero.
    pub fn new(max_workers: usize) -> Result<Self> {
        let config = SchedulerConfig::builder()
            .max_workers(max_workers)
            .build()?;
        Self::with_config(config)
    }

    /// Scheduler built from a full configuration, validated first.
    pub fn with_config(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        info!(
            max_workers = config.max_workers,
            panic_policy = ?config.panic_policy,
            "task scheduler created"
        );

        Ok(Self {
            config,
            pending: Vec::new(),
            completed: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Configuration this scheduler was built with.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Number of workers each run starts.
    pub fn max_workers(&self) -> usize {
        self.config.max_workers
    }

    /// Queues `job` under `name` for the next run. Names may repeat.
    pub fn add_task<F>(&mut self, name: impl Into<String>, job: F) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        let task = Task::new(name, job);
        let id = task.id.clone();
        self.pending.push(task);
        id
    }

    /// Tasks registered since the last run.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Executes every pending task and waits for all workers to exit.
    ///
    /// Exactly `max_workers` workers are started even when there are fewer
    /// tasks; idle ones exit as soon as the queue is closed. Must be awaited
    /// on a tokio runtime.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let tasks = std::mem::take(&mut self.pending);
        let run_id = RunId::new();
        let span = info_span!("run", run_id = %run_id);

        drive(&self.config, &self.completed, run_id, tasks)
            .instrument(span)
            .await
    }

    /// [`run`](Self::run) on a private runtime, for callers without one.
    ///
    /// Fails with [`SchedulerError::NestedRuntime`] when called from inside a
    /// tokio runtime; await [`run`](Self::run) there instead.
    pub fn run_blocking(&mut self) -> Result<RunSummary> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(SchedulerError::NestedRuntime);
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .max_blocking_threads(self.config.max_workers)
            .build()?;

        runtime.block_on(self.run())
    }

    /// Snapshot of every task completed so far, in completion order.
    pub async fn get_results(&self) -> Vec<CompletedTask> {
        self.completed.lock().await.clone()
    }

    /// Read-only view on the completed list that can be polled while a run is
    /// in progress.
    pub fn results_handle(&self) -> ResultsHandle {
        ResultsHandle {
            completed: self.completed.clone(),
        }
    }
}

/// Body of one run. Borrows only the `Sync` parts of the scheduler so the
/// future stays `Send`.
async fn drive(
    config: &SchedulerConfig,
    completed: &CompletedLog,
    run_id: RunId,
    tasks: Vec<Task>,
) -> Result<RunSummary> {
    let task_count = tasks.len();
    let max_workers = config.max_workers;
    info!(task_count, max_workers, "run started");

    let started = Instant::now();
    let offset = completed.lock().await.len();
    let queue = Arc::new(WorkQueue::new(task_count));
    debug!(capacity = queue.capacity(), "work queue sized for run");

    let handles: Vec<_> = (0..max_workers)
        .map(|worker| {
            let span = info_span!(
                "worker",
                worker_name = %format!("{}-{}", config.worker_name_prefix, worker)
            );
            tokio::spawn(worker_loop(worker, queue.clone(), completed.clone()).instrument(span))
        })
        .collect();

    let fed = feed(&queue, tasks);
    // Close unconditionally, otherwise idle workers never see the end.
    queue.close().await;

    let mut first_err = None;
    for (worker, joined) in join_all(handles).await.into_iter().enumerate() {
        let err = match joined {
            Ok(Ok(_)) => continue,
            Ok(Err(e)) => e,
            Err(e) => SchedulerError::WorkerJoin {
                worker,
                message: e.to_string(),
            },
        };
        error!(worker, error = %err, "worker failed");
        if first_err.is_none() {
            first_err = Some(err);
        }
    }

    fed?;
    if let Some(err) = first_err {
        return Err(err);
    }

    let tasks = completed.lock().await[offset..].to_vec();
    let summary = RunSummary {
        run_id,
        tasks,
        elapsed: started.elapsed(),
    };

    info!(
        completed = summary.completed_tasks(),
        panicked = summary.panicked_tasks(),
        elapsed_ms = summary.elapsed.as_millis(),
        "run finished"
    );

    if config.panic_policy == PanicPolicy::FailRun {
        if let Some(task) = summary.first_panicked() {
            let message = match &task.status {
                TaskStatus::Panicked { message } => message.clone(),
                status => status.to_string(),
            };
            return Err(SchedulerError::TaskPanicked {
                name: task.name.clone(),
                message,
            });
        }
    }

    Ok(summary)
}

/// Enqueues in registration order. The queue must hold every task at once;
/// a `QueueError::Full` here means it was sized too small.
fn feed(queue: &WorkQueue, tasks: Vec<Task>) -> Result<()> {
    for task in tasks {
        queue.try_enqueue(task)?;
    }
    Ok(())
}

/// Shared read access to a scheduler's completed tasks.
#[derive(Debug, Clone)]
pub struct ResultsHandle {
    completed: CompletedLog,
}

impl ResultsHandle {
    /// Tasks completed so far. Partial while a run is in progress.
    pub async fn snapshot(&self) -> Vec<CompletedTask> {
        self.completed.lock().await.clone()
    }

    /// Number of tasks completed so far.
    pub async fn len(&self) -> usize {
        self.completed.lock().await.len()
    }

    /// True until the first task completes.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
