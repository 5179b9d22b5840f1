//! aria2c-backed transfer agent.

use std::path::PathBuf;

use ferry_core::config::{SftpCredentials, TransferConfig};
use ferry_core::ports::{AgentCommand, TransferAgent};
use ferry_core::transfer::{TransferError, TransferRequest};

/// Exit code aria2c uses when checksum validation fails.
const ARIA2_CHECKSUM_EXIT: i32 = 32;

/// Transfer agent invoking `aria2c` over SFTP.
///
/// When the request carries an expected checksum it is handed to aria2c
/// (`--checksum md5=...`), so verification happens inside the agent and a
/// mismatch surfaces as a dedicated exit code.
pub struct Aria2Agent {
    credentials: SftpCredentials,
    output_dir: PathBuf,
    max_connections: u32,
}

impl Aria2Agent {
    /// Create an agent writing under the configured output directory.
    pub fn new(config: &TransferConfig, credentials: SftpCredentials) -> Self {
        Self {
            credentials,
            output_dir: config.output_dir.clone(),
            max_connections: config.max_connections,
        }
    }
}

impl TransferAgent for Aria2Agent {
    fn name(&self) -> &str {
        "aria2"
    }

    fn command(&self, request: &TransferRequest) -> Result<AgentCommand, TransferError> {
        let output_dir = request.output_dir_in(&self.output_dir);
        let agent_log = output_dir.join(format!("{}.log", request.file_name));

        let mut cmd = AgentCommand::new("aria2c")
            .args(["--ftp-user", self.credentials.username.as_str()])
            .args(["--ftp-passwd", self.credentials.password.as_str()])
            .arg("-x")
            .arg(self.max_connections.to_string())
            .arg("--dir")
            .arg(output_dir.display().to_string())
            .arg("--console-log-level=notice")
            .arg("--summary-interval=60")
            .arg("--show-console-readout=true")
            .arg("--log")
            .arg(agent_log.display().to_string())
            .arg("--log-level=info")
            .ensure_dir(output_dir);

        if let Some(checksum) = &request.checksum {
            cmd = cmd
                .arg("--checksum")
                .arg(format!("md5={checksum}"))
                .checksum_failure_exit(ARIA2_CHECKSUM_EXIT);
        }

        Ok(cmd.arg(request.remote_url.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> Aria2Agent {
        let config = TransferConfig::new("sftp://host:44398/", "/data/out");
        Aria2Agent::new(&config, SftpCredentials::new("user", "secret"))
    }

    fn request() -> TransferRequest {
        TransferRequest::from_url("sftp://host:44398/proj/RUN1/sample.bam")
            .with_run_id("RUN1")
            .with_checksum("abc123")
    }

    #[test]
    fn builds_checksum_verifying_invocation() {
        let cmd = agent().command(&request()).unwrap();

        assert_eq!(cmd.program, "aria2c");
        assert!(cmd.args.windows(2).any(|w| w == ["--ftp-user", "user"]));
        assert!(cmd.args.windows(2).any(|w| w == ["--checksum", "md5=abc123"]));
        assert_eq!(cmd.args.last().unwrap(), "sftp://host:44398/proj/RUN1/sample.bam");
        assert_eq!(cmd.checksum_failure_exit, Some(ARIA2_CHECKSUM_EXIT));
    }

    #[test]
    fn run_id_lands_in_output_dir() {
        let cmd = agent().command(&request()).unwrap();
        assert!(cmd.args.windows(2).any(|w| w == ["--dir", "/data/out/RUN1"]));
        assert_eq!(cmd.ensure_dirs, vec![PathBuf::from("/data/out/RUN1")]);
    }

    #[test]
    fn no_checksum_means_no_verification_flag() {
        let req = TransferRequest::from_url("sftp://host/f.bam");
        let cmd = agent().command(&req).unwrap();

        assert!(!cmd.args.iter().any(|a| a == "--checksum"));
        assert_eq!(cmd.checksum_failure_exit, None);
    }
}
