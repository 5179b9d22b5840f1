//! The `mv` and `rm` commands: recursive pattern move/remove.

use std::path::Path;

use anyhow::Context;

/// Move files matching `pattern` from `source` to `dest`.
pub fn move_files(source: &Path, dest: &Path, pattern: &str) -> anyhow::Result<()> {
    let moved = ferry_fsops::move_matching(source, dest, pattern)
        .context("moving files")?;

    for entry in &moved {
        println!("Moved: {} -> {}", entry.from.display(), entry.to.display());
    }
    println!("{} file(s) moved", moved.len());
    Ok(())
}

/// Remove files matching `pattern` under `folder`.
pub fn remove_files(folder: &Path, pattern: &str) -> anyhow::Result<()> {
    let removed = ferry_fsops::remove_matching(folder, pattern)
        .context("removing files")?;

    for path in &removed {
        println!("Removed: {}", path.display());
    }
    println!("{} file(s) removed", removed.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn move_then_remove_round_trip() {
        let source = tempdir().unwrap();
        let dest = tempdir().unwrap();
        std::fs::write(source.path().join("a.tmp"), b"x").unwrap();
        std::fs::write(source.path().join("a.bam"), b"x").unwrap();

        move_files(source.path(), dest.path(), r"\.bam$").unwrap();
        assert!(dest.path().join("a.bam").is_file());

        remove_files(source.path(), r"\.tmp$").unwrap();
        assert!(!source.path().join("a.tmp").exists());
    }

    #[test]
    fn bad_pattern_surfaces_as_error() {
        let dir = tempdir().unwrap();
        assert!(remove_files(dir.path(), "[").is_err());
    }
}
