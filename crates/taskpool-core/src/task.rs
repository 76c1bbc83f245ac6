//! Task records and their lifecycle.

use std::fmt::{self, Display};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{TaskId, panic::catch_task_panic};

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Lifecycle of a single task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    /// Registered, waiting for a run.
    Pending,
    /// Picked up by a worker, callable in flight.
    Running,
    /// Callable returned normally.
    Completed,
    /// Callable panicked; `message` is the panic payload when it was a string.
    Panicked {
        /// Panic payload text.
        message: String,
    },
}

/// Rejected [`TaskStatus`] change.
#[derive(Debug, Error)]
pub enum TaskTransitionError {
    /// `from` cannot move to `to`.
    #[error("illegal task transition from {from} to {to}")]
    Illegal {
        /// Current state.
        from: &'static str,
        /// Requested state.
        to: &'static str,
    },
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "Pending"),
            TaskStatus::Running => write!(f, "Running"),
            TaskStatus::Completed => write!(f, "Completed"),
            TaskStatus::Panicked { message } => write!(f, "Panicked(message={})", message),
        }
    }
}

impl TaskStatus {
    /// Variant name without payload.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::Running => "Running",
            TaskStatus::Completed => "Completed",
            TaskStatus::Panicked { .. } => "Panicked",
        }
    }

    /// `Pending → Running`.
    pub fn mark_as_running(&self) -> Result<TaskStatus, TaskTransitionError> {
        match self {
            TaskStatus::Pending => Ok(TaskStatus::Running),
            status => Err(TaskTransitionError::Illegal {
                from: status.as_str(),
                to: "Running",
            }),
        }
    }

    /// `Running → Completed`.
    pub fn mark_as_completed(&self) -> Result<TaskStatus, TaskTransitionError> {
        match self {
            TaskStatus::Running => Ok(TaskStatus::Completed),
            status => Err(TaskTransitionError::Illegal {
                from: status.as_str(),
                to: "Completed",
            }),
        }
    }

    /// `Running → Panicked`.
    pub fn mark_as_panicked(&self, message: String) -> Result<TaskStatus, TaskTransitionError> {
        match self {
            TaskStatus::Running => Ok(TaskStatus::Panicked { message }),
            status => Err(TaskTransitionError::Illegal {
                from: status.as_str(),
                to: "Panicked",
            }),
        }
    }

    /// `Completed` or `Panicked`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Panicked { .. })
    }
}

/// A named unit of work waiting to be run.
///
/// The callable is consumed on execution, so a `Task` can run at most once.
/// What remains afterwards is a [`CompletedTask`].
pub struct Task {
    /// Unique per registration.
    pub id: TaskId,
    /// Caller-chosen label, may repeat.
    pub name: String,
    /// `Pending` until a worker runs it.
    pub status: TaskStatus,
    job: Job,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl Task {
    /// Pending task with a fresh id.
    pub fn new<F>(name: impl Into<String>, job: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            id: TaskId::new(),
            name: name.into(),
            status: TaskStatus::Pending,
            job: Box::new(job),
        }
    }

    /// Runs the callable on the current thread and times it.
    ///
    /// Blocks until the callable returns. A panic is caught and recorded in
    /// the returned status instead of unwinding into the caller.
    pub fn execute(self, worker: usize) -> Result<CompletedTask, TaskTransitionError> {
        let Task {
            id,
            name,
            status,
            job,
        } = self;
        let running = status.mark_as_running()?;

        let start = Instant::now();
        let outcome = catch_task_panic(job);
        let time_taken = start.elapsed();

        let status = match outcome {
            Ok(()) => running.mark_as_completed()?,
            Err(message) => running.mark_as_panicked(message)?,
        };

        Ok(CompletedTask {
            id,
            name,
            worker,
            status,
            time_taken,
        })
    }
}

/// Record of a task after a worker has executed it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletedTask {
    /// Id assigned at registration.
    pub id: TaskId,
    /// Name given at registration.
    pub name: String,
    /// Index of the worker that ran the task, `0..max_workers`.
    pub worker: usize,
    /// `Completed` or `Panicked`.
    pub status: TaskStatus,
    /// Wall-clock time spent in the callable.
    pub time_taken: Duration,
}

impl CompletedTask {
    /// True when the callable panicked.
    pub fn is_panicked(&self) -> bool {
        matches!(self.status, TaskStatus::Panicked { .. })
    }
}
