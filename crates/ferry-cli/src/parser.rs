//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Resumable bulk SFTP mirroring with checksum verification.
#[derive(Parser, Debug)]
#[command(name = "ferry", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch every file listed in a manifest, skipping verified ones
    Fetch {
        /// Tab-delimited manifest with run_id, ftp_file_path, fileName
        /// and MD5 columns
        #[arg(long)]
        manifest: PathBuf,

        /// Treat the manifest as an md5sum-format listing of remote paths
        #[arg(long)]
        md5_listing: bool,

        /// Base URL prefixed onto manifest remote paths
        #[arg(long, env = "FERRY_BASE_URL")]
        base_url: String,

        /// Directory downloads land in (run id appended per file)
        #[arg(long, env = "FERRY_OUTPUT_DIR")]
        output_dir: PathBuf,

        /// Number of parallel transfers
        #[arg(long, default_value_t = 5)]
        jobs: usize,

        /// Connection hint handed to the transfer agent
        #[arg(long, default_value_t = 10)]
        max_connections: u32,

        /// Use lftp instead of aria2c (no agent-side checksum check)
        #[arg(long)]
        lftp: bool,

        /// Combined progress log appended to alongside console output
        #[arg(long)]
        log_file: Option<PathBuf>,
    },

    /// Re-verify transferred files against an md5sum listing
    Verify {
        /// md5sum-format listing (`<checksum>  <name>` per line)
        #[arg(long)]
        checksums: PathBuf,

        /// Directory the listed names are relative to
        #[arg(long)]
        base_dir: Option<PathBuf>,

        /// State snapshot to record verification results in
        #[arg(long)]
        state_file: PathBuf,

        /// Number of files hashed in parallel
        #[arg(long, default_value_t = 4)]
        jobs: usize,

        /// Tool name recorded on each verification record
        #[arg(long, default_value = "md5sum")]
        tool: String,
    },

    /// Move files matching a regex recursively, preserving structure
    Mv {
        /// Root directory to scan
        #[arg(long)]
        source: PathBuf,

        /// Directory to move matching files into
        #[arg(long)]
        dest: PathBuf,

        /// Regex matched against file names (e.g. '\.bam$')
        #[arg(long)]
        pattern: String,
    },

    /// Remove files matching a regex recursively
    Rm {
        /// Root directory to scan
        #[arg(long)]
        folder: PathBuf,

        /// Regex matched against file names
        #[arg(long)]
        pattern: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_parses_with_defaults() {
        let cli = Cli::try_parse_from([
            "ferry",
            "fetch",
            "--manifest",
            "links.txt",
            "--base-url",
            "sftp://host:44398/",
            "--output-dir",
            "/data/out",
        ])
        .unwrap();

        match cli.command.unwrap() {
            Commands::Fetch {
                jobs,
                max_connections,
                lftp,
                md5_listing,
                ..
            } => {
                assert_eq!(jobs, 5);
                assert_eq!(max_connections, 10);
                assert!(!lftp);
                assert!(!md5_listing);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn verify_requires_state_file() {
        let result = Cli::try_parse_from(["ferry", "verify", "--checksums", "md5sum.txt"]);
        assert!(result.is_err());
    }
}
