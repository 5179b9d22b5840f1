//! Error type for filesystem operations.

use thiserror::Error;

/// Errors from the filesystem utilities.
#[derive(Debug, Error)]
pub enum FsOpsError {
    /// The filename pattern failed to compile.
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// An I/O error outside the per-file tolerated failures.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
