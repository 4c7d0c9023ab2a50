//! Single-writer task queue
//!
//! Every registry mutation is submitted here and executed by one worker
//! task, one operation at a time, in submission order. The worker holds
//! the write lock while an operation runs; anything else that must not
//! interleave with queued writes (backup restore) takes the same lock.
//!
//! A failing or panicking operation is logged and discarded. It is not
//! retried, and the worker moves on to the next item.
//!
//! The queue is in memory only: operations still queued when the process
//! exits are lost unless [`WriteQueue::flush`] is awaited first.

use crate::db::models::{EntityKind, Submission};
use crate::db::reconcile;
use crate::db::store::Store;
use crate::{Error, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Boxed closure for ad-hoc queued writes
pub type CustomOp = Box<dyn FnOnce(Store) -> BoxFuture<'static, Result<()>> + Send>;

/// A queued registry mutation
pub enum WriteOp {
    /// Insert directly into the registry
    Register(Submission),
    /// Insert into the kind's pending-request table
    SubmitRequest(Submission),
    /// Move a pending request into the registry
    ApproveRequest {
        kind: EntityKind,
        id: i64,
        moderator: String,
    },
    /// Drop a pending request; no-op if already gone
    DeleteRequest { kind: EntityKind, id: i64 },
    /// Run one reconciliation pass
    Synchronize,
    /// Arbitrary write against the store
    Custom { label: String, run: CustomOp },
}

impl WriteOp {
    /// Wrap an async closure as a queued write
    pub fn custom<F, Fut>(label: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(Store) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        WriteOp::Custom {
            label: label.into(),
            run: Box::new(move |store| f(store).boxed()),
        }
    }

    /// Short description for logs
    pub fn label(&self) -> String {
        match self {
            WriteOp::Register(s) => format!("register {} '{}'", s.kind(), s.name()),
            WriteOp::SubmitRequest(s) => format!("request {} '{}'", s.kind(), s.name()),
            WriteOp::ApproveRequest { kind, id, .. } => format!("approve {} request {}", kind, id),
            WriteOp::DeleteRequest { kind, id } => format!("delete {} request {}", kind, id),
            WriteOp::Synchronize => "synchronize".to_string(),
            WriteOp::Custom { label, .. } => label.clone(),
        }
    }

    async fn apply(self, store: &Store) -> Result<()> {
        match self {
            WriteOp::Register(submission) => {
                store.insert(&submission).await?;
            }
            WriteOp::SubmitRequest(submission) => {
                store.insert_request(&submission).await?;
            }
            WriteOp::ApproveRequest {
                kind,
                id,
                moderator,
            } => {
                if store.approve_request(kind, id, &moderator).await?.is_none() {
                    warn!(kind = %kind, id, "Request was already processed");
                }
            }
            WriteOp::DeleteRequest { kind, id } => {
                store.delete_request(kind, id).await?;
            }
            WriteOp::Synchronize => {
                reconcile::synchronize(store).await?;
            }
            WriteOp::Custom { run, .. } => {
                run(store.clone()).await?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for WriteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WriteOp").field(&self.label()).finish()
    }
}

enum QueueItem {
    Op(WriteOp),
    /// Answered once every item submitted before it has been processed
    Barrier(oneshot::Sender<()>),
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

/// Queue counters at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub submitted: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl QueueStats {
    /// Operations submitted but not yet finished
    pub fn pending(&self) -> u64 {
        self.submitted
            .saturating_sub(self.succeeded)
            .saturating_sub(self.failed)
    }
}

/// Handle to the write queue; clones feed the same worker
#[derive(Clone)]
pub struct WriteQueue {
    tx: mpsc::UnboundedSender<QueueItem>,
    lock: Arc<Mutex<()>>,
    counters: Arc<Counters>,
}

impl WriteQueue {
    /// Start the worker task on the current runtime.
    ///
    /// The worker stops once every `WriteQueue` clone has been dropped and
    /// the remaining items are drained.
    pub fn spawn(store: Store) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let lock = Arc::new(Mutex::new(()));
        let counters = Arc::new(Counters::default());

        let handle = tokio::spawn(run_worker(store, rx, lock.clone(), counters.clone()));

        (Self { tx, lock, counters }, handle)
    }

    /// Append `op` to the queue. Returns as soon as it is enqueued.
    pub fn submit(&self, op: WriteOp) -> Result<()> {
        let label = op.label();

        // Count before sending so stats never show more finished than submitted
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        if self.tx.send(QueueItem::Op(op)).is_err() {
            self.counters.submitted.fetch_sub(1, Ordering::Relaxed);
            return Err(Error::Internal(format!(
                "Write queue closed, dropped '{}'",
                label
            )));
        }

        debug!(op = %label, "Write queued");
        Ok(())
    }

    /// Wait until everything submitted before this call has been processed
    pub async fn flush(&self) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(QueueItem::Barrier(done_tx))
            .map_err(|_| Error::Internal("Write queue closed".to_string()))?;

        done_rx
            .await
            .map_err(|_| Error::Internal("Write queue worker stopped".to_string()))
    }

    /// Take the global write lock, blocking the worker between operations
    pub async fn lock_writes(&self) -> OwnedMutexGuard<()> {
        self.lock.clone().lock_owned().await
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            succeeded: self.counters.succeeded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

async fn run_worker(
    store: Store,
    mut rx: mpsc::UnboundedReceiver<QueueItem>,
    lock: Arc<Mutex<()>>,
    counters: Arc<Counters>,
) {
    info!("Write queue worker started");
    let mut seq: u64 = 0;

    while let Some(item) = rx.recv().await {
        let op = match item {
            QueueItem::Op(op) => op,
            QueueItem::Barrier(done) => {
                let _ = done.send(());
                continue;
            }
        };

        seq += 1;
        let label = op.label();

        let outcome = {
            let _guard = lock.lock().await;
            AssertUnwindSafe(op.apply(&store)).catch_unwind().await
        };

        match outcome {
            Ok(Ok(())) => {
                counters.succeeded.fetch_add(1, Ordering::Relaxed);
                debug!(seq, op = %label, "Write completed");
            }
            Ok(Err(e)) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                error!(seq, op = %label, error = %e, "Database error, write discarded");
            }
            Err(panic) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    seq,
                    op = %label,
                    panic = panic_message(panic.as_ref()),
                    "Write panicked, discarded"
                );
            }
        }
    }

    info!(processed = seq, "Write queue worker stopped");
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_count() {
        let stats = QueueStats {
            submitted: 10,
            succeeded: 6,
            failed: 1,
        };
        assert_eq!(stats.pending(), 3);
    }

    #[test]
    fn test_labels() {
        assert_eq!(WriteOp::Synchronize.label(), "synchronize");
        assert_eq!(
            WriteOp::DeleteRequest {
                kind: EntityKind::Creator,
                id: 5
            }
            .label(),
            "delete creator request 5"
        );
        assert_eq!(
            WriteOp::custom("bump", |_store| async { Ok::<(), Error>(()) }).label(),
            "bump"
        );
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
