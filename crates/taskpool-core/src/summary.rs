//! Per-run summary.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{CompletedTask, RunId};

/// Outcome of one [`TaskScheduler::run`](crate::TaskScheduler::run).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSummary {
    /// Id of the run this summarizes.
    pub run_id: RunId,
    /// Tasks finished by this run, in completion order.
    pub tasks: Vec<CompletedTask>,
    /// Wall clock from run start until every worker was joined.
    pub elapsed: Duration,
}

impl RunSummary {
    /// Tasks whose callable returned normally.
    pub fn completed_tasks(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_panicked()).count()
    }

    /// Tasks whose callable panicked.
    pub fn panicked_tasks(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_panicked()).count()
    }

    /// Sum of per-task durations. Exceeds `elapsed` when tasks overlapped.
    pub fn total_task_time(&self) -> Duration {
        self.tasks.iter().map(|t| t.time_taken).sum()
    }

    /// Earliest-finishing task that panicked, if any.
    pub fn first_panicked(&self) -> Option<&CompletedTask> {
        self.tasks.iter().find(|t| t.is_panicked())
    }
}
