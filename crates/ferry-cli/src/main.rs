//! CLI entry point - the composition root.
//!
//! This is the only place where infrastructure is wired together:
//! environment loading, logging, and dispatch to handlers.

use clap::Parser;

use ferry_cli::handlers;
use ferry_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load environment variables (SFTP credentials live here)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Fetch {
            manifest,
            md5_listing,
            base_url,
            output_dir,
            jobs,
            max_connections,
            lftp,
            log_file,
        } => {
            let args = handlers::fetch::FetchArgs {
                manifest,
                md5_listing,
                base_url,
                output_dir,
                jobs,
                max_connections,
                lftp,
                log_file,
            };
            handlers::fetch::execute(args).await?;
        }
        Commands::Verify {
            checksums,
            base_dir,
            state_file,
            jobs,
            tool,
        } => {
            let args = handlers::verify::VerifyArgs {
                checksums,
                base_dir,
                state_file,
                jobs,
                tool,
            };
            handlers::verify::execute(args).await?;
        }
        Commands::Mv {
            source,
            dest,
            pattern,
        } => {
            handlers::fsops::move_files(&source, &dest, &pattern)?;
        }
        Commands::Rm { folder, pattern } => {
            handlers::fsops::remove_files(&folder, &pattern)?;
        }
    }

    Ok(())
}
