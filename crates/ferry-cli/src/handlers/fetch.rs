//! The `fetch` command: run a manifest through the transfer orchestrator.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use tracing::warn;

use ferry_core::config::{SftpCredentials, TransferConfig};
use ferry_core::manifest::Manifest;
use ferry_core::ports::TransferAgent;
use ferry_transfer::{Aria2Agent, LftpAgent, TransferOrchestrator};

/// Arguments for one fetch run.
pub struct FetchArgs {
    pub manifest: PathBuf,
    pub md5_listing: bool,
    pub base_url: String,
    pub output_dir: PathBuf,
    pub jobs: usize,
    pub max_connections: u32,
    pub lftp: bool,
    pub log_file: Option<PathBuf>,
}

/// Load the manifest, wire up the orchestrator, run it, print the report.
pub async fn execute(args: FetchArgs) -> anyhow::Result<()> {
    let manifest = if args.md5_listing {
        Manifest::from_md5sum_file(&args.manifest)
    } else {
        Manifest::load(&args.manifest)
    }
    .context("loading manifest")?;

    if manifest.is_empty() {
        println!("Manifest is empty; nothing to do");
        return Ok(());
    }

    let requests = manifest.requests(&args.base_url);

    let mut config = TransferConfig::new(args.base_url, args.output_dir);
    config.max_connections = args.max_connections;
    config.combined_log = args.log_file;

    let credentials = SftpCredentials::from_env().context("loading SFTP credentials")?;
    let agent: Arc<dyn TransferAgent> = if args.lftp {
        Arc::new(LftpAgent::new(&config, credentials))
    } else {
        Arc::new(Aria2Agent::new(&config, credentials))
    };

    let orchestrator = TransferOrchestrator::new(config, agent);

    // The signal handler's only job is setting the token; the orchestrator
    // handles termination of in-flight agents from there.
    let cancel = orchestrator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping transfers...");
            cancel.cancel();
        }
    });

    let total = requests.len();
    let results = orchestrator.run(requests, args.jobs).await;

    let mut failed = 0usize;
    let mut names: Vec<&String> = results.keys().collect();
    names.sort();
    for name in names {
        let outcome = &results[name];
        if !outcome.success {
            failed += 1;
        }
        println!(
            "{name}: {} - {} - {:.2}s",
            if outcome.success { "Success" } else { "Failed" },
            outcome.message,
            outcome.duration.as_secs_f64()
        );
    }

    let skipped = total - results.len();
    if skipped > 0 {
        println!("{skipped} file(s) already transferred and verified");
    }

    if failed > 0 {
        bail!("{failed} of {} transfer(s) failed", results.len());
    }
    Ok(())
}
