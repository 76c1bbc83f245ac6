//! Work channel shared by a run's workers.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use crate::Task;

/// Why a task could not be put on a [`WorkQueue`].
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Every slot is taken. A run sizes its queue to the task count, so this
    /// means the sizing was wrong.
    #[error("queue is full")]
    Full,

    /// [`WorkQueue::close`] was already called.
    #[error("queue is closed")]
    Closed,
}

/// Multi-consumer work channel feeding one run's workers.
///
/// Every worker shares the single receiver; whoever holds the receiver lock
/// gets the next task, so distribution is first-available. Once [`close`]
/// is called the remaining tasks still drain, after which [`dequeue`]
/// returns `None`.
///
/// [`close`]: WorkQueue::close
/// [`dequeue`]: WorkQueue::dequeue
#[derive(Debug)]
pub struct WorkQueue {
    sender: Mutex<Option<mpsc::Sender<Task>>>,
    receiver: Mutex<mpsc::Receiver<Task>>,
    capacity: usize,
    len: AtomicUsize,
}

impl WorkQueue {
    /// A zero `capacity` is raised to 1, tokio channels cannot be unbuffered.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        debug!(capacity, "initializing work queue");

        let (tx, rx) = mpsc::channel(capacity);

        Self {
            sender: Mutex::new(Some(tx)),
            receiver: Mutex::new(rx),
            capacity,
            len: AtomicUsize::new(0),
        }
    }

    /// Puts `task` on the queue without waiting for a free slot.
    pub fn try_enqueue(&self, task: Task) -> Result<(), QueueError> {
        let sender = self.sender.try_lock().ok().and_then(|s| s.clone());

        let sender = sender.ok_or(QueueError::Closed)?;
        let (task_id, task_name) = (task.id.clone(), task.name.clone());

        match sender.try_send(task) {
            Ok(()) => {
                debug!(task_id = %task_id, task_name = %task_name, "task enqueued");
                self.len.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(task_id = %task_id, capacity = self.capacity, "enqueue failed: queue full");
                Err(QueueError::Full)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(task_id = %task_id, "enqueue failed: queue closed");
                Err(QueueError::Closed)
            }
        }
    }

    /// Waits for the next task. `None` means the queue is closed and drained.
    pub async fn dequeue(&self) -> Option<Task> {
        let mut receiver = self.receiver.lock().await;
        let task = receiver.recv().await;

        if let Some(ref task) = task {
            debug!(task_id = %task.id, "task dequeued");
            self.len.fetch_sub(1, Ordering::SeqCst);
        } else {
            debug!("work queue drained");
        }

        task
    }

    /// Stops accepting tasks. Already queued tasks are still handed out.
    pub async fn close(&self) {
        if self.sender.lock().await.take().is_some() {
            info!(remaining = self.len(), "work queue closed");
        }
    }

    /// Tasks enqueued but not yet handed to a worker.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::SeqCst)
    }

    /// Slots in the underlying channel.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    fn noop(name: &str) -> Task {
        Task::new(name, || {})
    }

    #[tokio::test]
    async fn fifo_enqueue_dequeue() {
        let queue = WorkQueue::new(10);

        let t1 = noop("first");
        let t2 = noop("second");
        let (id1, id2) = (t1.id.clone(), t2.id.clone());

        queue.try_enqueue(t1).unwrap();
        queue.try_enqueue(t2).unwrap();
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.dequeue().await.unwrap().id, id1);
        assert_eq!(queue.dequeue().await.unwrap().id, id2);
        assert_eq!(queue.len(), 0);
    }

    #[tokio::test]
    async fn closed_queue_drains_then_ends() {
        let queue = WorkQueue::new(2);
        queue.try_enqueue(noop("a")).unwrap();
        queue.close().await;

        assert!(queue.dequeue().await.is_some());
        assert!(queue.dequeue().await.is_none());
    }

    #[tokio::test]
    async fn enqueue_after_close_is_rejected() {
        let queue = WorkQueue::new(2);
        queue.close().await;

        assert!(matches!(
            queue.try_enqueue(noop("late")),
            Err(QueueError::Closed)
        ));
    }

    #[tokio::test]
    async fn try_enqueue_reports_full() {
        let queue = WorkQueue::new(1);
        queue.try_enqueue(noop("a")).unwrap();

        assert!(matches!(queue.try_enqueue(noop("b")), Err(QueueError::Full)));
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn zero_capacity_is_clamped() {
        let queue = WorkQueue::new(0);
        assert_eq!(queue.capacity(), 1);
        queue.close().await;
        assert!(queue.dequeue().await.is_none());
    }

    #[tokio::test]
    async fn dequeue_waits_for_work_while_open() {
        let queue = WorkQueue::new(1);
        assert!(
            timeout(Duration::from_millis(50), queue.dequeue())
                .await
                .is_err()
        );
    }
}
