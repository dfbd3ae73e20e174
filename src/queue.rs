//! FIFO serializer for mutating git commands.
//!
//! Concurrent `git` invocations that touch the index or refs collide on lock
//! files, so every mutation goes through one worker task that runs jobs
//! strictly one at a time, in submission order. Read-only queries do not
//! need to queue.

use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, oneshot};

use crate::error::GitError;

type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Handle to the queue worker. Cheap to clone.
#[derive(Clone)]
pub struct OperationQueue {
    tx: mpsc::UnboundedSender<Job>,
    pending: Arc<AtomicUsize>,
}

impl OperationQueue {
    /// Spawns the worker task on the current tokio runtime.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        tokio::spawn(queue_worker(rx));
        Self {
            tx,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Submits `op` and returns a future resolving to its output.
    ///
    /// The job's place in line is taken here, at call time, not when the
    /// returned future is first polled. A job that panics resolves its own
    /// caller with an error and the worker moves on to the next one.
    pub fn enqueue<F, Fut, T>(&self, op: F) -> impl Future<Output = Result<T, GitError>> + Send + 'static
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, GitError>> + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel::<Result<T, GitError>>();
        let pending = Arc::clone(&self.pending);
        pending.fetch_add(1, Ordering::SeqCst);

        let job: Job = Box::new(move || {
            async move {
                let result = AssertUnwindSafe(op()).catch_unwind().await;
                pending.fetch_sub(1, Ordering::SeqCst);
                let result = result.unwrap_or_else(|_| {
                    log::error!("queued operation panicked");
                    Err(GitError::Join("operation panicked".to_string()))
                });
                let _ = done_tx.send(result);
            }
            .boxed()
        });

        let submitted = self.tx.send(job).is_ok();
        if !submitted {
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }

        async move {
            if !submitted {
                return Err(GitError::QueueClosed);
            }
            done_rx.await.unwrap_or(Err(GitError::QueueClosed))
        }
    }

    /// Jobs submitted and not yet finished, including the running one.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_busy(&self) -> bool {
        self.pending() > 0
    }
}

async fn queue_worker(mut rx: mpsc::UnboundedReceiver<Job>) {
    while let Some(job) = rx.recv().await {
        job().await;
    }
    log::debug!("operation queue worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    #[tokio::test]
    async fn runs_in_submission_order_without_overlap() {
        let queue = OperationQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let running = Arc::new(AtomicBool::new(false));

        let mut futures = Vec::new();
        for i in 0..5u64 {
            let log = Arc::clone(&log);
            let running = Arc::clone(&running);
            futures.push(queue.enqueue(move || async move {
                assert!(!running.swap(true, Ordering::SeqCst), "jobs overlapped");
                log.lock().push(format!("start {i}"));
                // Earlier jobs sleep longer; order must still hold.
                tokio::time::sleep(Duration::from_millis(25 - i * 5)).await;
                log.lock().push(format!("end {i}"));
                running.store(false, Ordering::SeqCst);
                Ok(i)
            }));
        }

        let results = futures::future::join_all(futures).await;
        let values: Vec<u64> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, vec![0, 1, 2, 3, 4]);

        let expected: Vec<String> = (0..5)
            .flat_map(|i| [format!("start {i}"), format!("end {i}")])
            .collect();
        assert_eq!(*log.lock(), expected);
        assert_eq!(queue.pending(), 0);
        assert!(!queue.is_busy());
    }

    #[tokio::test]
    async fn failure_does_not_block_followers() {
        let queue = OperationQueue::new();
        let first = queue.enqueue(|| async {
            Err::<(), _>(GitError::Failed {
                command: "git push".to_string(),
                stderr: "rejected".to_string(),
            })
        });
        let second = queue.enqueue(|| async { Ok("fetched") });

        assert!(matches!(first.await, Err(GitError::Failed { .. })));
        assert_eq!(second.await.unwrap(), "fetched");
    }

    #[tokio::test]
    async fn panic_resolves_only_its_caller() {
        let queue = OperationQueue::new();
        let bad = queue.enqueue(|| async {
            if true {
                panic!("boom");
            }
            Ok(())
        });
        let good = queue.enqueue(|| async { Ok(7) });
        assert!(matches!(bad.await, Err(GitError::Join(_))));
        assert_eq!(good.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn order_is_fixed_at_call_time() {
        let queue = OperationQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let l1 = Arc::clone(&log);
        let push = queue.enqueue(move || async move {
            l1.lock().push("push");
            Ok(())
        });
        let l2 = Arc::clone(&log);
        let fetch = queue.enqueue(move || async move {
            l2.lock().push("fetch");
            Ok(())
        });

        // Await in reverse; execution order must not follow await order.
        fetch.await.unwrap();
        push.await.unwrap();
        assert_eq!(*log.lock(), vec!["push", "fetch"]);
    }
}
