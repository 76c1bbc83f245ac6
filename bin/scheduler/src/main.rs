use std::{thread, time::Duration};

use taskpool_core::{SchedulerConfig, TaskScheduler};
use tracing::{error, info};

use tracing_subscriber::{EnvFilter, fmt};

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    info!("starting scheduler demo");

    let config = match SchedulerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid scheduler configuration");
            return;
        }
    };

    let mut scheduler = match TaskScheduler::with_config(config) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            error!(error = %e, "failed to create scheduler");
            return;
        }
    };

    // Simulated work of different lengths
    for (name, ms) in [("A", 200), ("B", 500), ("C", 1000)] {
        scheduler.add_task(name, move || thread::sleep(Duration::from_millis(ms)));
    }

    info!(
        pending = scheduler.pending_len(),
        max_workers = scheduler.max_workers(),
        "tasks registered"
    );

    let summary = match scheduler.run().await {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "run failed");
            return;
        }
    };

    for task in scheduler.get_results().await {
        info!(
            task_name = %task.name,
            worker = task.worker,
            status = %task.status,
            time_taken_ms = task.time_taken.as_millis(),
            "task result"
        );
    }

    info!(
        elapsed_ms = summary.elapsed.as_millis(),
        total_task_ms = summary.total_task_time().as_millis(),
        "scheduler demo finished"
    );
}
