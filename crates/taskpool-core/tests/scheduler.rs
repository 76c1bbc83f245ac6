use std::collections::HashSet;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::thread;
use std::time::{Duration, Instant};

use taskpool_core::{PanicPolicy, SchedulerConfig, SchedulerError, TaskScheduler, TaskStatus};

fn sleeper(ms: u64) -> impl FnOnce() + Send + 'static {
    move || thread::sleep(Duration::from_millis(ms))
}

#[test]
fn zero_workers_is_a_config_error() {
    let err = TaskScheduler::new(0).unwrap_err();
    assert!(matches!(err, SchedulerError::Config(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn workers_run_tasks_in_parallel() {
    let mut scheduler = TaskScheduler::new(3).unwrap();
    scheduler.add_task("A", sleeper(200));
    scheduler.add_task("B", sleeper(500));
    scheduler.add_task("C", sleeper(1000));

    let started = Instant::now();
    let summary = scheduler.run().await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(1000));
    assert!(elapsed < Duration::from_millis(1600), "took {elapsed:?}");

    let results = scheduler.get_results().await;
    assert_eq!(results.len(), 3);
    assert_eq!(summary.tasks, results);

    for (name, ms) in [("A", 200), ("B", 500), ("C", 1000)] {
        let task = results.iter().find(|t| t.name == name).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.time_taken >= Duration::from_millis(ms));
        assert!(task.time_taken < Duration::from_millis(ms + 400));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn single_worker_serializes_tasks() {
    let mut scheduler = TaskScheduler::new(1).unwrap();
    for name in ["one", "two", "three"] {
        scheduler.add_task(name, sleeper(100));
    }

    let summary = scheduler.run().await.unwrap();

    assert!(summary.elapsed >= Duration::from_millis(300));
    assert_eq!(summary.completed_tasks(), 3);
    assert!(summary.tasks.iter().all(|t| t.worker == 0));

    // one worker drains the queue in registration order
    let order: Vec<_> = summary.tasks.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(order, ["one", "two", "three"]);
}

#[tokio::test]
async fn empty_run_returns_immediately() {
    let mut scheduler = TaskScheduler::new(4).unwrap();

    let summary = scheduler.run().await.unwrap();

    assert!(summary.tasks.is_empty());
    assert!(summary.elapsed < Duration::from_millis(500));
    assert!(scheduler.get_results().await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_task_runs_exactly_once() {
    let counters: Arc<Vec<AtomicUsize>> =
        Arc::new((0..200).map(|_| AtomicUsize::new(0)).collect());

    for workers in [1, 3, 16] {
        for c in counters.iter() {
            c.store(0, Ordering::SeqCst);
        }

        let mut scheduler = TaskScheduler::new(workers).unwrap();
        for i in 0..counters.len() {
            let counters = counters.clone();
            scheduler.add_task(format!("task-{i}"), move || {
                counters[i].fetch_add(1, Ordering::SeqCst);
            });
        }

        let summary = scheduler.run().await.unwrap();

        assert_eq!(summary.tasks.len(), counters.len());
        assert!(counters.iter().all(|c| c.load(Ordering::SeqCst) == 1));
        assert!(summary.tasks.iter().all(|t| t.worker < workers));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn in_flight_tasks_never_exceed_max_workers() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut scheduler = TaskScheduler::new(4).unwrap();
    for i in 0..24 {
        let in_flight = in_flight.clone();
        let peak = peak.clone();
        scheduler.add_task(format!("bounded-{i}"), move || {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(15));
            in_flight.fetch_sub(1, Ordering::SeqCst);
        });
    }

    scheduler.run().await.unwrap();

    let peak = peak.load(Ordering::SeqCst);
    assert!(peak >= 1);
    assert!(peak <= 4, "peak concurrency {peak}");
    assert_eq!(in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_appends_are_not_lost() {
    let mut scheduler = TaskScheduler::new(64).unwrap();
    let mut registered = HashSet::new();
    for i in 0..2_000 {
        registered.insert(scheduler.add_task(format!("tiny-{i}"), || {}));
    }

    scheduler.run().await.unwrap();

    let results = scheduler.get_results().await;
    assert_eq!(results.len(), 2_000);
    let seen: HashSet<_> = results.into_iter().map(|t| t.id).collect();
    assert_eq!(seen, registered);
}

#[tokio::test]
async fn duplicate_names_are_kept_apart() {
    let mut scheduler = TaskScheduler::new(2).unwrap();
    let first = scheduler.add_task("dup", || {});
    let second = scheduler.add_task("dup", || {});
    assert_ne!(first, second);
    assert_eq!(scheduler.pending_len(), 2);

    let summary = scheduler.run().await.unwrap();

    assert_eq!(summary.tasks.len(), 2);
    assert!(summary.tasks.iter().all(|t| t.name == "dup"));
}

#[tokio::test]
async fn results_accumulate_across_runs() {
    let mut scheduler = TaskScheduler::new(2).unwrap();
    scheduler.add_task("first", || {});
    let first = scheduler.run().await.unwrap();
    assert_eq!(scheduler.pending_len(), 0);

    scheduler.add_task("second", || {});
    scheduler.add_task("third", || {});
    let second = scheduler.run().await.unwrap();

    assert_eq!(first.tasks.len(), 1);
    assert_eq!(second.tasks.len(), 2);
    assert_ne!(first.run_id, second.run_id);
    assert!(second.tasks.iter().all(|t| t.name != "first"));
    assert_eq!(scheduler.get_results().await.len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panicking_task_is_isolated() {
    let ran = Arc::new(AtomicUsize::new(0));

    let mut scheduler = TaskScheduler::new(2).unwrap();
    scheduler.add_task("explodes", || panic!("kaboom"));
    for i in 0..5 {
        let ran = ran.clone();
        scheduler.add_task(format!("fine-{i}"), move || {
            ran.fetch_add(1, Ordering::SeqCst);
        });
    }

    let summary = scheduler.run().await.unwrap();

    assert_eq!(summary.tasks.len(), 6);
    assert_eq!(summary.completed_tasks(), 5);
    assert_eq!(summary.panicked_tasks(), 1);
    assert_eq!(ran.load(Ordering::SeqCst), 5);

    let failed = summary.first_panicked().unwrap();
    assert_eq!(failed.name, "explodes");
    assert_eq!(
        failed.status,
        TaskStatus::Panicked {
            message: "kaboom".to_string()
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn fail_run_policy_reports_panic_after_draining() {
    let config = SchedulerConfig::builder()
        .max_workers(2)
        .panic_policy(PanicPolicy::FailRun)
        .build()
        .unwrap();
    let mut scheduler = TaskScheduler::with_config(config).unwrap();
    scheduler.add_task("explodes", || panic!("kaboom"));
    scheduler.add_task("slow", sleeper(50));
    scheduler.add_task("fast", || {});

    let err = scheduler.run().await.unwrap_err();

    match err {
        SchedulerError::TaskPanicked { name, message } => {
            assert_eq!(name, "explodes");
            assert_eq!(message, "kaboom");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(scheduler.get_results().await.len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn results_handle_sees_partial_progress() {
    let mut scheduler = TaskScheduler::new(2).unwrap();
    scheduler.add_task("slow", sleeper(400));
    scheduler.add_task("fast", || {});
    let handle = scheduler.results_handle();

    let (summary, partial) = tokio::join!(scheduler.run(), async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        handle.snapshot().await
    });

    assert_eq!(summary.unwrap().tasks.len(), 2);
    assert_eq!(partial.len(), 1);
    assert_eq!(partial[0].name, "fast");
    assert_eq!(handle.len().await, 2);
}

#[test]
fn run_blocking_works_without_a_runtime() {
    let mut scheduler = TaskScheduler::new(2).unwrap();
    scheduler.add_task("left", sleeper(150));
    scheduler.add_task("right", sleeper(150));

    let summary = scheduler.run_blocking().unwrap();

    assert_eq!(summary.completed_tasks(), 2);
    assert!(summary.elapsed < Duration::from_millis(280));
    assert!(summary.total_task_time() >= Duration::from_millis(300));
}

#[tokio::test]
async fn run_blocking_inside_a_runtime_is_rejected() {
    let mut scheduler = TaskScheduler::new(1).unwrap();
    scheduler.add_task("kept", || {});

    let err = scheduler.run_blocking().unwrap_err();

    assert!(matches!(err, SchedulerError::NestedRuntime));
    assert_eq!(scheduler.pending_len(), 1);
    assert!(scheduler.run().await.is_ok());
}

#[tokio::test]
async fn summary_exports_as_json() {
    let mut scheduler = TaskScheduler::new(1).unwrap();
    scheduler.add_task("export-me", || {});

    let summary = scheduler.run().await.unwrap();
    let json = serde_json::to_value(&summary).unwrap();

    assert_eq!(json["tasks"][0]["name"], "export-me");
    assert_eq!(json["tasks"][0]["status"], "Completed");
    assert_eq!(json["tasks"][0]["worker"], 0);
}
