//! Crash-tolerant persisted transfer state.
//!
//! The store holds one JSON document mapping file name to the most recent
//! [`TransferRecord`], plus a sibling `.bak` copy refreshed at most once
//! per backup interval. Corruption never surfaces to callers: a primary
//! that fails to parse falls back to the backup, and a backup that also
//! fails to parse falls back to an empty snapshot, with warnings logged at
//! each step.
//!
//! All mutation goes through [`StateStore::upsert`], which holds a single
//! async mutex across its read-merge-write sequence so writes are
//! linearized regardless of transfer concurrency. The snapshot is written
//! to a temp file and renamed over the primary, so a reader never observes
//! a half-written document.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use ferry_core::transfer::{StateSnapshot, TransferError, TransferRecord};

/// Persisted mapping of file identifier to transfer record.
pub struct StateStore {
    path: PathBuf,
    backup_path: PathBuf,
    backup_interval: Duration,
    /// Guards the read-merge-write sequence and the backup clock.
    lock: Mutex<BackupClock>,
}

#[derive(Default)]
struct BackupClock {
    last_backup: Option<Instant>,
}

impl StateStore {
    /// Create a store over `path`; the backup lives at `<path>.bak`.
    pub fn new(path: impl Into<PathBuf>, backup_interval: Duration) -> Self {
        let path = path.into();
        let backup_path = backup_path_for(&path);
        Self {
            path,
            backup_path,
            backup_interval,
            lock: Mutex::new(BackupClock::default()),
        }
    }

    /// Path of the primary snapshot.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the current snapshot.
    ///
    /// Never fails: corruption degrades to the backup, then to an empty
    /// snapshot, with warnings logged.
    pub async fn load(&self) -> StateSnapshot {
        let _clock = self.lock.lock().await;
        self.read_current()
    }

    /// Persist one record, merging it into the latest on-disk snapshot.
    ///
    /// Takes a backup of the primary first when the backup interval has
    /// elapsed (best-effort; a copy failure is logged, not fatal).
    pub async fn upsert(
        &self,
        file_name: &str,
        record: TransferRecord,
    ) -> Result<(), TransferError> {
        let mut clock = self.lock.lock().await;

        self.maybe_backup(&mut clock);

        let mut snapshot = self.read_current();
        snapshot.insert(file_name.to_string(), record);
        self.write_snapshot(&snapshot)
    }

    /// Copy the primary to the backup location when one is due.
    fn maybe_backup(&self, clock: &mut BackupClock) {
        let due = clock
            .last_backup
            .is_none_or(|at| at.elapsed() >= self.backup_interval);
        if !due || !self.path.is_file() {
            return;
        }

        match fs::copy(&self.path, &self.backup_path) {
            Ok(_) => {
                clock.last_backup = Some(Instant::now());
                info!(backup = %self.backup_path.display(), "Created state backup");
            }
            Err(e) => {
                error!(
                    backup = %self.backup_path.display(),
                    error = %e,
                    "Failed to create state backup"
                );
            }
        }
    }

    /// Read the latest snapshot with corruption recovery.
    fn read_current(&self) -> StateSnapshot {
        match read_snapshot(&self.path) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => StateSnapshot::default(),
            Err(e) => {
                warn!(
                    state = %self.path.display(),
                    error = %e,
                    "State file corrupted; attempting to recover from backup"
                );
                self.read_backup()
            }
        }
    }

    fn read_backup(&self) -> StateSnapshot {
        match read_snapshot(&self.backup_path) {
            Ok(Some(snapshot)) => {
                info!(backup = %self.backup_path.display(), "Recovered state from backup");
                snapshot
            }
            Ok(None) => {
                error!(
                    state = %self.path.display(),
                    "No backup available; starting with empty state"
                );
                StateSnapshot::default()
            }
            Err(e) => {
                error!(
                    backup = %self.backup_path.display(),
                    error = %e,
                    "Backup also corrupted; starting with empty state"
                );
                StateSnapshot::default()
            }
        }
    }

    /// Write the full snapshot via temp-file-and-rename.
    fn write_snapshot(&self, snapshot: &StateSnapshot) -> Result<(), TransferError> {
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| TransferError::other(format!("serialize state: {e}")))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| TransferError::from_io_error(&e))?;
            }
        }

        let tmp = temp_path_for(&self.path);
        fs::write(&tmp, json).map_err(|e| TransferError::from_io_error(&e))?;
        fs::rename(&tmp, &self.path).map_err(|e| TransferError::from_io_error(&e))
    }
}

/// Read and parse a snapshot file. `Ok(None)` means the file is absent.
fn read_snapshot(path: &Path) -> Result<Option<StateSnapshot>, String> {
    if !path.is_file() {
        return Ok(None);
    }
    let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&text).map(Some).map_err(|e| e.to_string())
}

fn backup_path_for(path: &Path) -> PathBuf {
    append_suffix(path, ".bak")
}

fn temp_path_for(path: &Path) -> PathBuf {
    append_suffix(path, ".tmp")
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
    name.push_str(suffix);
    path.with_file_name(name)
}
