//! Periodic triggers
//!
//! Two independent timers run next to the command handlers: one enqueues
//! a reconciliation pass, the other exports a backup outside the queue.

use gpdb_common::{Store, WriteOp, WriteQueue};
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::backup;

/// Handles of the running triggers
pub struct Triggers {
    pub sync: JoinHandle<()>,
    pub backup: JoinHandle<()>,
}

impl Triggers {
    pub fn start(
        store: Store,
        queue: WriteQueue,
        saves_dir: PathBuf,
        sync_every: Duration,
        backup_every: Duration,
    ) -> Self {
        info!(
            sync_secs = sync_every.as_secs(),
            backup_secs = backup_every.as_secs(),
            "Starting periodic triggers"
        );

        Self {
            sync: spawn_sync_trigger(queue, sync_every),
            backup: spawn_backup_trigger(store, saves_dir, backup_every),
        }
    }

    /// Stop both timers; writes already queued are unaffected
    pub fn abort(&self) {
        self.sync.abort();
        self.backup.abort();
    }
}

/// Submit a reconciliation pass every `every`. Stops once the queue is gone.
pub fn spawn_sync_trigger(queue: WriteQueue, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = queue.submit(WriteOp::Synchronize) {
                error!(error = %e, "Sync trigger stopping");
                break;
            }
        }
    })
}

/// Export a backup every `every`, skipping the immediate first tick
pub fn spawn_backup_trigger(store: Store, saves_dir: PathBuf, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(e) = backup::create_backup(&store, &saves_dir).await {
                error!(error = %e, "Periodic backup failed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpdb_common::db::NewArtist;

    #[tokio::test]
    async fn test_sync_trigger_feeds_queue() {
        let store = Store::open_in_memory().await.unwrap();
        let (queue, _worker) = WriteQueue::spawn(store);

        let trigger = spawn_sync_trigger(queue.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(60)).await;
        trigger.abort();
        queue.flush().await.unwrap();

        let stats = queue.stats();
        assert!(stats.submitted >= 2);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.pending(), 0);
    }

    #[tokio::test]
    async fn test_backup_trigger_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open_in_memory().await.unwrap();
        store
            .insert_artist(NewArtist {
                name: "Bob".to_string(),
                yt: None,
                soundcloud: None,
                recorder_name: "mod".to_string(),
                recorder_notes: None,
            })
            .await
            .unwrap();

        let trigger =
            spawn_backup_trigger(store, dir.path().to_path_buf(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(70)).await;
        trigger.abort();

        let backups = backup::list_backups(dir.path()).await.unwrap();
        assert!(!backups.is_empty());
    }
}
