//! lftp-backed transfer agent.

use std::path::PathBuf;

use ferry_core::config::{SftpCredentials, TransferConfig};
use ferry_core::ports::{AgentCommand, TransferAgent};
use ferry_core::transfer::{TransferError, TransferRequest};

/// Transfer agent invoking `lftp` with resume enabled.
///
/// lftp has no built-in checksum validation; a run that used this agent is
/// typically followed by a `verify` pass against the provider's md5
/// listing.
pub struct LftpAgent {
    credentials: SftpCredentials,
    output_dir: PathBuf,
    max_connections: u32,
}

impl LftpAgent {
    /// Create an agent writing under the configured output directory.
    pub fn new(config: &TransferConfig, credentials: SftpCredentials) -> Self {
        Self {
            credentials,
            output_dir: config.output_dir.clone(),
            max_connections: config.max_connections,
        }
    }
}

impl TransferAgent for LftpAgent {
    fn name(&self) -> &str {
        "lftp"
    }

    fn command(&self, request: &TransferRequest) -> Result<AgentCommand, TransferError> {
        let output_dir = request.output_dir_in(&self.output_dir);
        let destination = request.destination_in(&self.output_dir);

        // `get -c` resumes partial files; clobber stays off so a finished
        // file is never overwritten by a retry.
        let script = format!(
            "set xfer:clobber off; \
             set net:reconnect-interval-base 10; \
             set net:max-retries 5; \
             set net:timeout 300; \
             set net:connection-limit {}; \
             get -c {} -o {}; \
             bye",
            self.max_connections,
            request.remote_url,
            destination.display()
        );

        Ok(AgentCommand::new("lftp")
            .arg("-u")
            .arg(format!(
                "{},{}",
                self.credentials.username, self.credentials.password
            ))
            .args(["-e", script.as_str()])
            .ensure_dir(output_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> LftpAgent {
        let config = TransferConfig::new("sftp://host:44398/", "/data/out");
        LftpAgent::new(&config, SftpCredentials::new("user", "secret"))
    }

    #[test]
    fn builds_resuming_invocation() {
        let req = TransferRequest::from_url("sftp://host:44398/proj/RUN1/sample.bam")
            .with_run_id("RUN1")
            .with_checksum("abc123");
        let cmd = agent().command(&req).unwrap();

        assert_eq!(cmd.program, "lftp");
        assert!(cmd.args.contains(&"user,secret".to_string()));

        let script = cmd.args.last().unwrap();
        assert!(script.contains("get -c sftp://host:44398/proj/RUN1/sample.bam"));
        assert!(script.contains("-o /data/out/RUN1/sample.bam"));
        assert!(script.contains("xfer:clobber off"));

        // verification is not the agent's job here
        assert_eq!(cmd.checksum_failure_exit, None);
        assert_eq!(cmd.ensure_dirs, vec![PathBuf::from("/data/out/RUN1")]);
    }
}
