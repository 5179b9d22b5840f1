//! Recursive move/remove of files matching a name pattern.
//!
//! Both operations tolerate per-file failures: a file that cannot be moved
//! or removed is logged and skipped, and the walk continues. Only setup
//! failures (bad pattern, unreadable destination) abort the whole
//! operation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::warn;
use walkdir::WalkDir;

use crate::error::FsOpsError;

/// A single completed move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovedFile {
    /// Original location.
    pub from: PathBuf,
    /// Final location (may carry a `_<n>` collision suffix).
    pub to: PathBuf,
}

/// Recursively move files whose names match `pattern` from `source` to
/// `dest`, preserving the relative directory structure.
///
/// Name collisions at the destination are resolved by appending `_<n>`
/// before the extension. Returns the moves that succeeded.
pub fn move_matching(source: &Path, dest: &Path, pattern: &str) -> Result<Vec<MovedFile>, FsOpsError> {
    let matcher = Regex::new(pattern)?;
    fs::create_dir_all(dest)?;

    let mut moved = Vec::new();
    for entry in WalkDir::new(source).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if !matcher.is_match(name) {
            continue;
        }

        let source_path = entry.path();
        let rel_path = source_path.strip_prefix(source).unwrap_or(source_path);
        let target = dest.join(rel_path);

        if let Some(parent) = target.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!(path = %target.display(), error = %e, "Cannot create destination directory");
                continue;
            }
        }

        let target = next_free_name(&target);
        match move_file(source_path, &target) {
            Ok(()) => moved.push(MovedFile {
                from: source_path.to_path_buf(),
                to: target,
            }),
            Err(e) => {
                warn!(path = %source_path.display(), error = %e, "Error moving file");
            }
        }
    }

    Ok(moved)
}

/// Recursively remove files under `root` whose names match `pattern`.
///
/// Returns the paths that were removed.
pub fn remove_matching(root: &Path, pattern: &str) -> Result<Vec<PathBuf>, FsOpsError> {
    let matcher = Regex::new(pattern)?;

    let mut removed = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if !matcher.is_match(name) {
            continue;
        }

        match fs::remove_file(entry.path()) {
            Ok(()) => removed.push(entry.path().to_path_buf()),
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "Error removing file");
            }
        }
    }

    Ok(removed)
}

/// Find a destination path that does not exist yet, appending `_<n>`
/// before the extension until one is free.
fn next_free_name(target: &Path) -> PathBuf {
    if !target.exists() {
        return target.to_path_buf();
    }

    let stem = target
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let ext = target.extension().and_then(|s| s.to_str());
    let parent = target.parent().unwrap_or_else(|| Path::new(""));

    let mut counter = 1;
    loop {
        let candidate = match ext {
            Some(ext) => parent.join(format!("{stem}_{counter}.{ext}")),
            None => parent.join(format!("{stem}_{counter}")),
        };
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Move one file, falling back to copy-and-delete when a rename crosses
/// filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"data").unwrap();
    }

    #[test]
    fn moves_matching_files_preserving_structure() {
        let source = tempdir().unwrap();
        let dest = tempdir().unwrap();

        touch(&source.path().join("sub/a.bam"));
        touch(&source.path().join("sub/keep.txt"));
        touch(&source.path().join("b.bam"));

        let moved = move_matching(source.path(), dest.path(), r"\.bam$").unwrap();
        assert_eq!(moved.len(), 2);

        assert!(dest.path().join("sub/a.bam").is_file());
        assert!(dest.path().join("b.bam").is_file());
        // non-matching file stays behind
        assert!(source.path().join("sub/keep.txt").is_file());
        assert!(!source.path().join("b.bam").exists());
    }

    #[test]
    fn collision_gets_numeric_suffix() {
        let source = tempdir().unwrap();
        let dest = tempdir().unwrap();

        touch(&source.path().join("a.bam"));
        touch(&dest.path().join("a.bam"));

        let moved = move_matching(source.path(), dest.path(), r"\.bam$").unwrap();
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].to, dest.path().join("a_1.bam"));
        assert!(dest.path().join("a_1.bam").is_file());
    }

    #[test]
    fn second_collision_increments_counter() {
        let source = tempdir().unwrap();
        let dest = tempdir().unwrap();

        touch(&source.path().join("a.bam"));
        touch(&dest.path().join("a.bam"));
        touch(&dest.path().join("a_1.bam"));

        let moved = move_matching(source.path(), dest.path(), r"\.bam$").unwrap();
        assert_eq!(moved[0].to, dest.path().join("a_2.bam"));
    }

    #[test]
    fn removes_only_matching_files() {
        let root = tempdir().unwrap();
        touch(&root.path().join("sub/a.tmp"));
        touch(&root.path().join("sub/b.bam"));

        let removed = remove_matching(root.path(), r"\.tmp$").unwrap();
        assert_eq!(removed, vec![root.path().join("sub/a.tmp")]);
        assert!(root.path().join("sub/b.bam").is_file());
    }

    #[test]
    fn bad_pattern_is_an_error() {
        let root = tempdir().unwrap();
        assert!(matches!(
            remove_matching(root.path(), "["),
            Err(FsOpsError::Pattern(_))
        ));
    }
}
