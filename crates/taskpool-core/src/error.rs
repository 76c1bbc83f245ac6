//! Error types.

use thiserror::Error;

use crate::{queue::QueueError, task::TaskTransitionError};

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Errors returned by [`TaskScheduler`](crate::TaskScheduler) and its config.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Invalid configuration, such as zero workers.
    #[error("config error: {0}")]
    Config(String),

    /// The work queue rejected a task while a run was feeding it.
    #[error("work queue error: {0}")]
    Queue(#[from] QueueError),

    /// A worker, or the blocking execution it awaited, was cancelled.
    #[error("worker {worker} could not be joined: {message}")]
    WorkerJoin {
        /// Index of the failed worker.
        worker: usize,
        /// Join error text.
        message: String,
    },

    /// Only under [`PanicPolicy::FailRun`](crate::PanicPolicy::FailRun).
    #[error("task {name} panicked: {message}")]
    TaskPanicked {
        /// Name of the first task that panicked.
        name: String,
        /// Its panic message.
        message: String,
    },

    /// A task was found in an unexpected state.
    #[error(transparent)]
    Transition(#[from] TaskTransitionError),

    /// The private runtime of `run_blocking` could not be built.
    #[error("failed to build runtime: {0}")]
    Runtime(#[from] std::io::Error),

    /// `run_blocking` was called on a thread already driving a tokio runtime.
    #[error("run_blocking called from within a tokio runtime, await run() instead")]
    NestedRuntime,
}

impl SchedulerError {
    /// Shorthand for [`SchedulerError::Config`].
    pub fn config<S: Into<String>>(msg: S) -> Self {
        SchedulerError::Config(msg.into())
    }
}
