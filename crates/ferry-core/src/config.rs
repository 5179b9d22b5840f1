//! Transfer configuration.
//!
//! One explicit configuration value is constructed at the composition root
//! and passed to the orchestrator; nothing here is read from ambient
//! globals. Credentials come from the environment (the CLI loads a `.env`
//! file first) and are never hard-coded.

use std::path::PathBuf;
use std::time::Duration;

use crate::transfer::TransferError;

/// Default interval between state snapshot backups.
pub const DEFAULT_BACKUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Default connection/concurrency hint passed to the transfer agent.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Configuration for a transfer run.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Base URL prefixed onto manifest remote paths
    /// (e.g. `sftp://fms.biosino.org:44398/`).
    pub base_url: String,
    /// Base directory downloads land in (run id appended per request).
    pub output_dir: PathBuf,
    /// Directory for per-worker log artifacts.
    pub log_dir: PathBuf,
    /// Path of the persisted state snapshot.
    pub state_file: PathBuf,
    /// Optional combined log the progress reporter appends to.
    pub combined_log: Option<PathBuf>,
    /// Connection hint handed to the transfer agent.
    pub max_connections: u32,
    /// Minimum interval between state snapshot backups.
    pub backup_interval: Duration,
}

impl TransferConfig {
    /// Build a configuration with conventional paths under `output_dir`.
    pub fn new(base_url: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        let output_dir = output_dir.into();
        Self {
            base_url: base_url.into(),
            log_dir: output_dir.join("logs"),
            state_file: output_dir.join("transfer_state.json"),
            combined_log: None,
            output_dir,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            backup_interval: DEFAULT_BACKUP_INTERVAL,
        }
    }
}

/// SFTP credentials for the transfer agent.
#[derive(Clone)]
pub struct SftpCredentials {
    /// Account name.
    pub username: String,
    /// Account password. Kept out of `Debug` output.
    pub password: String,
}

impl std::fmt::Debug for SftpCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SftpCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl SftpCredentials {
    /// Create credentials from explicit values.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Read credentials from `SFTP_USER` / `SFTP_PASS`.
    pub fn from_env() -> Result<Self, TransferError> {
        let username = std::env::var("SFTP_USER").map_err(|_| {
            TransferError::credentials("SFTP_USER must be set in the environment or .env file")
        })?;
        let password = std::env::var("SFTP_PASS").map_err(|_| {
            TransferError::credentials("SFTP_PASS must be set in the environment or .env file")
        })?;
        Ok(Self { username, password })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conventional_paths_derive_from_output_dir() {
        let config = TransferConfig::new("sftp://host:22/", "/data/project");
        assert_eq!(config.log_dir, PathBuf::from("/data/project/logs"));
        assert_eq!(
            config.state_file,
            PathBuf::from("/data/project/transfer_state.json")
        );
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn debug_redacts_password() {
        let creds = SftpCredentials::new("user", "hunter2");
        let debug = format!("{creds:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("user"));
    }
}
