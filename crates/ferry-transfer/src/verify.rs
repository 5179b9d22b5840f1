//! Checksum re-verification of already-transferred files.
//!
//! Used after runs with an agent that cannot verify checksums itself
//! (lftp), or to re-audit a directory against the provider's md5 listing.
//! Each file is hashed locally and its state record overwritten with the
//! verification result, so a later `fetch` run re-attempts anything that
//! failed the audit.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use ferry_core::transfer::TransferRecord;
use ferry_fsops::{ChecksumEntry, file_md5};

use crate::state::StateStore;

/// Summary of one verification pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Files whose computed checksum matched.
    pub valid: usize,
    /// Files present but with a mismatched checksum.
    pub invalid: usize,
    /// Listed files not found on disk.
    pub missing: usize,
}

enum FileResult {
    Valid,
    Invalid,
    Missing,
}

/// Verify `entries` against files under `base_dir`, recording one state
/// record per verified file.
///
/// Hashing runs on blocking threads, at most `concurrency` at a time.
/// Missing files are counted, logged, and left without a record; an
/// absent record schedules the file on the next fetch anyway.
pub async fn verify_checksums(
    store: &Arc<StateStore>,
    entries: &[ChecksumEntry],
    base_dir: Option<&Path>,
    tool: &str,
    concurrency: usize,
) -> VerifyReport {
    info!(count = entries.len(), "Starting checksum verification");

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for entry in entries {
        let entry = entry.clone();
        let path = entry.resolve(base_dir);
        let store = Arc::clone(store);
        let tool = tool.to_string();
        let semaphore = Arc::clone(&semaphore);

        tasks.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return FileResult::Missing;
            };

            if !path.is_file() {
                warn!(path = %path.display(), "File not found, skipping verification");
                return FileResult::Missing;
            }

            let hash_path = path.clone();
            let computed = tokio::task::spawn_blocking(move || file_md5(&hash_path)).await;
            let computed = match computed {
                Ok(Ok(sum)) => sum,
                Ok(Err(e)) => {
                    warn!(path = %path.display(), error = %e, "Cannot hash file");
                    return FileResult::Missing;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Hashing task failed");
                    return FileResult::Missing;
                }
            };

            let valid = computed == entry.checksum;
            let record = TransferRecord::verification(
                &entry.checksum,
                path.display().to_string(),
                &tool,
                valid,
            );
            let file_name = Path::new(&entry.file_name)
                .file_name()
                .map_or_else(|| entry.file_name.clone(), |n| n.to_string_lossy().into_owned());
            if let Err(e) = store.upsert(&file_name, record).await {
                warn!(file = %file_name, error = %e, "Failed to persist verification record");
            }

            if valid {
                info!(file = %file_name, "Checksum valid");
                FileResult::Valid
            } else {
                warn!(
                    file = %file_name,
                    expected = %entry.checksum,
                    actual = %computed,
                    "Checksum mismatch"
                );
                FileResult::Invalid
            }
        });
    }

    let mut report = VerifyReport::default();
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(FileResult::Valid) => report.valid += 1,
            Ok(FileResult::Invalid) => report.invalid += 1,
            Ok(FileResult::Missing) => report.missing += 1,
            Err(e) => {
                warn!(error = %e, "Verification task failed");
                report.missing += 1;
            }
        }
    }

    info!(
        valid = report.valid,
        invalid = report.invalid,
        missing = report.missing,
        "Checksum verification finished"
    );
    report
}
