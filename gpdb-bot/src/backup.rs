//! Backup export and restore
//!
//! Backups are JSON snapshots of every table written to the saves
//! directory as `gpdb-backup<YYYY-MM-DDHHMMSS>.json`. Export reads through
//! the store like any other reader and does not go through the write
//! queue. Restore replaces the whole database and holds the queue's write
//! lock while doing so, so no queued write interleaves with it.

use gpdb_common::db::{Snapshot, Store};
use gpdb_common::WriteQueue;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

const BACKUP_PREFIX: &str = "gpdb-backup";
const BACKUP_EXTENSION: &str = "json";

#[derive(Debug, Error)]
pub enum BackupError {
    /// Requested backup file does not exist
    #[error("Backup file not found: {}", .0.display())]
    Missing(PathBuf),

    /// Backup names are plain file names inside the saves directory
    #[error("Invalid backup name: {0}")]
    InvalidName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(#[from] gpdb_common::Error),
}

/// What a restore brought back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreSummary {
    pub path: PathBuf,
    pub snapshot_taken_at: String,
    pub rows: usize,
    pub pending_requests: usize,
}

/// File name for a backup taken at `now`
pub fn backup_file_name(now: chrono::DateTime<chrono::Local>) -> String {
    format!(
        "{}{}.{}",
        BACKUP_PREFIX,
        now.format("%Y-%m-%d%H%M%S"),
        BACKUP_EXTENSION
    )
}

/// Write a snapshot of the whole database into `saves_dir`
pub async fn create_backup(store: &Store, saves_dir: &Path) -> Result<PathBuf, BackupError> {
    tokio::fs::create_dir_all(saves_dir).await?;

    let snapshot = store.snapshot().await?;
    let path = saves_dir.join(backup_file_name(chrono::Local::now()));
    let json = serde_json::to_vec_pretty(&snapshot)?;
    tokio::fs::write(&path, json).await?;

    info!("Save created at {}", path.display());
    Ok(path)
}

/// Replace the database content with the backup `file_name` from `saves_dir`.
///
/// A missing file is reported and leaves the database untouched.
pub async fn load_backup(
    store: &Store,
    queue: &WriteQueue,
    saves_dir: &Path,
    file_name: &str,
) -> Result<RestoreSummary, BackupError> {
    let path = resolve_backup_path(saves_dir, file_name)?;

    let content = match tokio::fs::read(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            error!("Backup file {} not found", path.display());
            return Err(BackupError::Missing(path));
        }
        Err(e) => return Err(e.into()),
    };
    let snapshot: Snapshot = serde_json::from_slice(&content)?;

    {
        let _guard = queue.lock_writes().await;
        store.restore(&snapshot).await?;
    }

    let summary = RestoreSummary {
        rows: snapshot.creators.len()
            + snapshot.layouts.len()
            + snapshot.collabs.len()
            + snapshot.musics.len()
            + snapshot.artists.len(),
        pending_requests: snapshot.requests.len(),
        snapshot_taken_at: snapshot.created_at,
        path,
    };

    info!(
        rows = summary.rows,
        pending_requests = summary.pending_requests,
        "Backup {} loaded",
        summary.path.display()
    );
    Ok(summary)
}

/// Backups present in `saves_dir`, oldest first
pub async fn list_backups(saves_dir: &Path) -> Result<Vec<String>, BackupError> {
    let mut names = Vec::new();

    let mut entries = match tokio::fs::read_dir(saves_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
        Err(e) => return Err(e.into()),
    };

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(BACKUP_PREFIX) && name.ends_with(BACKUP_EXTENSION) {
            names.push(name);
        }
    }

    // Timestamped names sort chronologically
    names.sort();
    Ok(names)
}

fn resolve_backup_path(saves_dir: &Path, file_name: &str) -> Result<PathBuf, BackupError> {
    let name = file_name.trim();
    let is_plain = !name.is_empty()
        && Path::new(name).file_name().map(|f| f == name).unwrap_or(false);

    if !is_plain {
        return Err(BackupError::InvalidName(file_name.to_string()));
    }
    Ok(saves_dir.join(name))
}
