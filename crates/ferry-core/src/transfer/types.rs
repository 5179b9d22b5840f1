//! Transfer request, persisted record, and outcome types.
//!
//! A `TransferRecord` is the durable outcome of the most recent attempt for
//! one file. Records are only ever created through the constructors here,
//! which uphold the store invariant: `completed` implies the checksum was
//! both verified and valid. Inconsistent combinations can still appear in
//! snapshots written by older tooling; readers must treat those as
//! not-yet-done rather than reject them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ============================================================================
// Request
// ============================================================================

/// One unit of work: a remote file to fetch and verify.
///
/// Constructed once per manifest row and owned by the orchestrator for the
/// duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// File identifier; also the key in the state snapshot.
    pub file_name: String,
    /// Full remote locator handed to the transfer agent.
    pub remote_url: String,
    /// Expected MD5 checksum (lowercase hex), when the manifest carries one.
    pub checksum: Option<String>,
    /// Run/batch identifier used as a destination sub-directory.
    pub run_id: Option<String>,
}

impl TransferRequest {
    /// Create a request for a remote URL, deriving the file name from the
    /// last path segment.
    pub fn from_url(remote_url: impl Into<String>) -> Self {
        let remote_url = remote_url.into();
        let file_name = remote_url
            .rsplit('/')
            .next()
            .unwrap_or(remote_url.as_str())
            .to_string();
        Self {
            file_name,
            remote_url,
            checksum: None,
            run_id: None,
        }
    }

    /// Attach an expected checksum.
    #[must_use]
    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    /// Attach a run identifier (destination sub-directory).
    #[must_use]
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    /// Directory the file lands in, under `base`.
    pub fn output_dir_in(&self, base: &Path) -> PathBuf {
        match &self.run_id {
            Some(run_id) => base.join(run_id),
            None => base.to_path_buf(),
        }
    }

    /// Full destination path of the file, under `base`.
    pub fn destination_in(&self, base: &Path) -> PathBuf {
        self.output_dir_in(base).join(&self.file_name)
    }
}

// ============================================================================
// Persisted record
// ============================================================================

/// Status of the most recent transfer attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    /// Transferred and checksum-verified.
    Completed,
    /// Attempt did not produce a verified file.
    Failed,
}

/// Persisted outcome of the most recent attempt for one file identifier.
///
/// The serde aliases accept snapshots written by the predecessor scripts,
/// which spelled the checksum fields `md5` / `verified_with_md5`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Attempt status.
    pub status: TransferStatus,
    /// Local wall-clock time the record was produced.
    pub timestamp: String,
    /// Expected checksum used for verification (empty when none was known).
    #[serde(alias = "md5")]
    pub checksum: String,
    /// Destination path of the file.
    pub path: String,
    /// Name of the agent that produced the result (`aria2`, `lftp`, ...).
    pub tool: String,
    /// Whether checksum verification was performed for this attempt.
    #[serde(alias = "verified_with_md5")]
    pub verified_with_checksum: bool,
    /// Whether the verified checksum matched.
    pub checksum_valid: bool,
    /// Failure reason, present on failed records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TransferRecord {
    /// Record for a transfer that finished and passed checksum verification.
    pub fn completed(
        checksum: impl Into<String>,
        path: impl Into<String>,
        tool: impl Into<String>,
    ) -> Self {
        Self {
            status: TransferStatus::Completed,
            timestamp: now_timestamp(),
            checksum: checksum.into(),
            path: path.into(),
            tool: tool.into(),
            verified_with_checksum: true,
            checksum_valid: true,
            error: None,
        }
    }

    /// Record for a failed, stopped, or unverified attempt.
    pub fn failed(
        checksum: Option<&str>,
        path: impl Into<String>,
        tool: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            status: TransferStatus::Failed,
            timestamp: now_timestamp(),
            checksum: checksum.unwrap_or_default().to_string(),
            path: path.into(),
            tool: tool.into(),
            verified_with_checksum: false,
            checksum_valid: false,
            error: Some(error.into()),
        }
    }

    /// Record for a completed verification pass (re-check of an existing
    /// file), valid or not.
    pub fn verification(
        checksum: impl Into<String>,
        path: impl Into<String>,
        tool: impl Into<String>,
        valid: bool,
    ) -> Self {
        if valid {
            Self::completed(checksum, path, tool)
        } else {
            let checksum = checksum.into();
            Self {
                verified_with_checksum: true,
                ..Self::failed(
                    Some(checksum.as_str()),
                    path,
                    tool,
                    "checksum verification failed",
                )
            }
        }
    }

    /// True when this record makes its request skippable: completed,
    /// verified, and the checksum matched.
    ///
    /// All three fields are checked (not just `status`) so that
    /// completed-but-unverified records from legacy snapshots are
    /// re-scheduled instead of trusted.
    #[must_use]
    pub fn is_verified_complete(&self) -> bool {
        self.status == TransferStatus::Completed
            && self.verified_with_checksum
            && self.checksum_valid
    }
}

/// The full persisted state: file identifier -> most recent record.
pub type StateSnapshot = HashMap<String, TransferRecord>;

/// Local timestamp in the format the state documents have always used.
pub fn now_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

// ============================================================================
// Outcome
// ============================================================================

/// Result of one transfer attempt, as returned to the orchestrator's caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Whether the agent process finished successfully.
    pub success: bool,
    /// Human-readable result message.
    pub message: String,
    /// Wall-clock duration of the attempt.
    pub duration: Duration,
}

impl TransferOutcome {
    /// Outcome for a request that was never started because the run was
    /// already stopping.
    #[must_use]
    pub fn stopped() -> Self {
        Self {
            success: false,
            message: "stopped".to_string(),
            duration: Duration::ZERO,
        }
    }

    /// Failure outcome carrying a diagnostic message.
    pub fn failed(message: impl Into<String>, duration: Duration) -> Self {
        Self {
            success: false,
            message: message.into(),
            duration,
        }
    }

    /// Success outcome carrying a result message.
    pub fn succeeded(message: impl Into<String>, duration: Duration) -> Self {
        Self {
            success: true,
            message: message.into(),
            duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_destination_includes_run_id() {
        let req = TransferRequest::from_url("sftp://host:44398/proj/RUN1/sample.bam")
            .with_run_id("RUN1");
        assert_eq!(req.file_name, "sample.bam");
        assert_eq!(
            req.destination_in(Path::new("/data")),
            PathBuf::from("/data/RUN1/sample.bam")
        );
    }

    #[test]
    fn request_destination_without_run_id() {
        let req = TransferRequest::from_url("sftp://host/sample.bam");
        assert_eq!(
            req.destination_in(Path::new("/data")),
            PathBuf::from("/data/sample.bam")
        );
    }

    #[test]
    fn completed_record_upholds_invariant() {
        let rec = TransferRecord::completed("abc", "/data/f.bam", "aria2");
        assert_eq!(rec.status, TransferStatus::Completed);
        assert!(rec.verified_with_checksum);
        assert!(rec.checksum_valid);
        assert!(rec.is_verified_complete());
    }

    #[test]
    fn failed_record_is_not_skippable() {
        let rec = TransferRecord::failed(Some("abc"), "/data/f.bam", "aria2", "exit 1");
        assert_eq!(rec.status, TransferStatus::Failed);
        assert!(!rec.is_verified_complete());
        assert_eq!(rec.error.as_deref(), Some("exit 1"));
    }

    #[test]
    fn verification_record_mismatch_keeps_verified_flag() {
        let rec = TransferRecord::verification("abc", "/data/f.bam", "md5sum", false);
        assert_eq!(rec.status, TransferStatus::Failed);
        assert!(rec.verified_with_checksum);
        assert!(!rec.checksum_valid);
    }

    #[test]
    fn legacy_field_names_deserialize() {
        let json = r#"{
            "status": "completed",
            "timestamp": "2025-01-01 00:00:00.000000",
            "md5": "abc",
            "path": "/data/f.bam",
            "tool": "lftp",
            "verified_with_md5": true,
            "checksum_valid": true
        }"#;
        let rec: TransferRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.checksum, "abc");
        assert!(rec.is_verified_complete());
    }

    #[test]
    fn legacy_unverified_complete_is_rescheduled() {
        let json = r#"{
            "status": "completed",
            "timestamp": "2025-01-01 00:00:00.000000",
            "md5": "abc",
            "path": "/data/f.bam",
            "tool": "lftp",
            "verified_with_md5": false,
            "checksum_valid": false
        }"#;
        let rec: TransferRecord = serde_json::from_str(json).unwrap();
        assert!(!rec.is_verified_complete());
    }
}
