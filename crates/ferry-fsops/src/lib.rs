//! Filesystem utilities for ferry.
//!
//! Simple collaborators of the transfer engine: recursive move/remove of
//! files whose names match a pattern, and MD5 checksum helpers for
//! verifying transferred files against provider listings.

mod checksum;
mod error;
mod pattern;

pub use checksum::{ChecksumEntry, ChecksumFile, file_md5};
pub use error::FsOpsError;
pub use pattern::{MovedFile, move_matching, remove_matching};
