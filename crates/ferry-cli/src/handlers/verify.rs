//! The `verify` command: hash transferred files against an md5 listing.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};

use ferry_core::config::DEFAULT_BACKUP_INTERVAL;
use ferry_fsops::ChecksumFile;
use ferry_transfer::{StateStore, verify_checksums};

/// Arguments for one verification pass.
pub struct VerifyArgs {
    pub checksums: PathBuf,
    pub base_dir: Option<PathBuf>,
    pub state_file: PathBuf,
    pub jobs: usize,
    pub tool: String,
}

/// Verify every listed file and record the results in the state snapshot.
pub async fn execute(args: VerifyArgs) -> anyhow::Result<()> {
    let listing = ChecksumFile::load(&args.checksums).context("loading checksum listing")?;
    if listing.is_empty() {
        println!("No checksums found in {}", args.checksums.display());
        return Ok(());
    }
    println!(
        "Loaded {} checksums from {}",
        listing.len(),
        args.checksums.display()
    );

    let store = Arc::new(StateStore::new(&args.state_file, DEFAULT_BACKUP_INTERVAL));
    let report = verify_checksums(
        &store,
        listing.entries(),
        args.base_dir.as_deref(),
        &args.tool,
        args.jobs,
    )
    .await;

    println!(
        "Verification finished: {} valid, {} invalid, {} missing (results in {})",
        report.valid,
        report.invalid,
        report.missing,
        args.state_file.display()
    );

    if report.invalid > 0 {
        bail!("{} file(s) failed checksum verification", report.invalid);
    }
    Ok(())
}
