//! Bounded worker-pool task scheduler.
//!
//! Register named closures on a [`TaskScheduler`], then [`run`] them across a
//! fixed number of workers. Every task executes exactly once, is timed, and
//! lands in the completed list as a [`CompletedTask`].
//!
//! ```no_run
//! use std::time::Duration;
//! use taskpool_core::TaskScheduler;
//!
//! # async fn demo() -> taskpool_core::Result<()> {
//! let mut scheduler = TaskScheduler::new(3)?;
//! scheduler.add_task("A", || std::thread::sleep(Duration::from_millis(200)));
//! scheduler.add_task("B", || std::thread::sleep(Duration::from_millis(500)));
//!
//! let summary = scheduler.run().await?;
//! assert_eq!(summary.tasks.len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! [`run`]: TaskScheduler::run

pub mod config;
pub mod error;
pub mod ids;
pub mod queue;
pub mod scheduler;
pub mod summary;
pub mod task;

mod panic;
mod worker;

pub use config::{PanicPolicy, SchedulerConfig, SchedulerConfigBuilder};
pub use error::{Result, SchedulerError};
pub use ids::{RunId, TaskId};
pub use queue::{QueueError, WorkQueue};
pub use scheduler::{ResultsHandle, TaskScheduler};
pub use summary::RunSummary;
pub use task::{CompletedTask, Task, TaskStatus, TaskTransitionError};
