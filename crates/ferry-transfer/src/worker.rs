//! Transfer worker: drives one external agent process per request.
//!
//! The worker consumes the agent's output incrementally under a
//! `tokio::select!` with the cancellation token, so a stop request is acted
//! on at the next suspension point rather than after the transfer
//! finishes. On cancellation the agent process is killed and the attempt
//! reported as "stopped".
//!
//! Every observed output line goes to a per-worker log artifact (named by
//! start time and worker identity) to preserve full detail without
//! contention; only start/finish events go through the shared progress
//! channel.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use ferry_core::ports::{AgentCommand, TransferAgent};
use ferry_core::transfer::{TransferError, TransferOutcome, TransferRequest};

use crate::progress::ProgressSender;

/// Everything one worker invocation needs, created by the orchestrator.
///
/// Explicit context instead of ambient state: the worker holds cloned
/// handles only and has no access back into the orchestrator.
#[derive(Clone)]
pub struct WorkerContext {
    /// Worker identity used in events and the log artifact name.
    pub worker_id: String,
    /// Agent capability that builds the process invocation.
    pub agent: Arc<dyn TransferAgent>,
    /// Directory for per-worker log artifacts.
    pub log_dir: PathBuf,
    /// Run-wide cancellation token.
    pub cancel: CancellationToken,
    /// Shared progress pipe.
    pub progress: ProgressSender,
}

/// Run one transfer attempt to completion, cancellation, or failure.
///
/// Agent-level failures (nonzero exit, checksum mismatch, stop) come back
/// as unsuccessful [`TransferOutcome`]s; an `Err` means the attempt could
/// not be driven at all (command construction, spawn, log artifact) and is
/// converted to a failed record at the orchestrator boundary.
pub async fn execute(
    ctx: &WorkerContext,
    request: &TransferRequest,
) -> Result<TransferOutcome, TransferError> {
    if ctx.cancel.is_cancelled() {
        return Ok(TransferOutcome::stopped());
    }

    let started = Instant::now();
    let command = ctx.agent.command(request)?;

    for dir in &command.ensure_dirs {
        std::fs::create_dir_all(dir).map_err(|e| TransferError::from_io_error(&e))?;
    }

    let mut log = WorkerLog::create(&ctx.log_dir, &ctx.worker_id)?;
    log.line(&format!("Starting transfer of {}", request.remote_url));
    ctx.progress.emit(format!(
        "[{}] {} started transfer of {} from {}",
        event_timestamp(),
        ctx.worker_id,
        request.file_name,
        request.remote_url
    ));

    let result = drive_agent(ctx, &command, &mut log).await;

    let duration = started.elapsed();
    let outcome = match result {
        Ok(AgentExit::Success) => {
            let message = match &request.checksum {
                Some(_) => "checksum verified by agent",
                None => "no checksum provided",
            };
            TransferOutcome::succeeded(message, duration)
        }
        Ok(AgentExit::ChecksumMismatch) => {
            TransferOutcome::failed("checksum mismatch reported by agent", duration)
        }
        Ok(AgentExit::Failed(diagnostic)) => TransferOutcome::failed(diagnostic, duration),
        Ok(AgentExit::Stopped) => TransferOutcome::failed("stopped", duration),
        Err(e) => {
            log.line(&format!("Transfer error: {e}"));
            return Err(e);
        }
    };

    log.line(&format!(
        "Transfer {} in {:.2}s: {}",
        if outcome.success { "completed" } else { "failed" },
        outcome.duration.as_secs_f64(),
        outcome.message
    ));
    ctx.progress.emit(format!(
        "[{}] {} finished {}: {} - {}",
        event_timestamp(),
        ctx.worker_id,
        request.file_name,
        if outcome.success { "Success" } else { "Failed" },
        outcome.message
    ));

    Ok(outcome)
}

/// How the agent process ended.
enum AgentExit {
    Success,
    ChecksumMismatch,
    Failed(String),
    Stopped,
}

/// Spawn the agent and stream its output until exit or cancellation.
async fn drive_agent(
    ctx: &WorkerContext,
    command: &AgentCommand,
    log: &mut WorkerLog,
) -> Result<AgentExit, TransferError> {
    let mut child = Command::new(&command.program)
        .args(&command.args)
        .kill_on_drop(true)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| TransferError::spawn(format!("{}: {e}", command.program)))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| TransferError::spawn("missing stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| TransferError::spawn("missing stderr"))?;

    let mut lines = BufReader::new(stdout).lines();
    let mut stderr_reader = BufReader::new(stderr);
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = stderr_reader.read_to_end(&mut buf).await;
        buf
    });

    // Stream stdout until EOF, watching the token at every suspension point.
    loop {
        tokio::select! {
            biased;

            () = ctx.cancel.cancelled() => {
                let _ = child.kill().await;
                stderr_task.abort();
                log.line("Transfer stopped by cancellation");
                return Ok(AgentExit::Stopped);
            }

            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if !line.trim().is_empty() {
                            log.line(&line);
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        debug!(error = %e, "Agent output read error");
                        break;
                    }
                }
            }
        }
    }

    let status = tokio::select! {
        biased;

        () = ctx.cancel.cancelled() => {
            let _ = child.kill().await;
            stderr_task.abort();
            log.line("Transfer stopped by cancellation");
            return Ok(AgentExit::Stopped);
        }

        status = child.wait() => {
            status.map_err(|e| TransferError::other(format!("wait for agent: {e}")))?
        }
    };

    let stderr_buf = stderr_task.await.unwrap_or_default();
    let stderr_text = String::from_utf8_lossy(&stderr_buf).trim().to_string();
    if !stderr_text.is_empty() {
        log.line(&stderr_text);
    }

    if status.success() {
        return Ok(AgentExit::Success);
    }
    if status.code().is_some() && status.code() == command.checksum_failure_exit {
        return Ok(AgentExit::ChecksumMismatch);
    }

    let diagnostic = if stderr_text.is_empty() {
        format!("agent exited with status {status}")
    } else {
        stderr_text
    };
    Ok(AgentExit::Failed(diagnostic))
}

/// Append-only per-worker log artifact.
struct WorkerLog {
    file: File,
}

impl WorkerLog {
    /// Open `<log_dir>/<start-secs>_<worker>.log`, creating the directory.
    fn create(log_dir: &Path, worker_id: &str) -> Result<Self, TransferError> {
        std::fs::create_dir_all(log_dir).map_err(|e| TransferError::from_io_error(&e))?;

        let start_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let path = log_dir.join(format!("{start_secs}_{worker_id}.log"));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| TransferError::from_io_error(&e))?;

        Ok(Self { file })
    }

    /// Write one timestamped line, flushing so the artifact stays current
    /// while the transfer runs.
    fn line(&mut self, text: &str) {
        let _ = writeln!(self.file, "[{}] {}", event_timestamp(), text);
        let _ = self.file.flush();
    }
}

fn event_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress;
    use tempfile::tempdir;

    /// Test agent that runs a fixed shell snippet.
    struct ShellAgent {
        script: String,
        checksum_exit: Option<i32>,
    }

    impl ShellAgent {
        fn new(script: &str) -> Self {
            Self {
                script: script.to_string(),
                checksum_exit: None,
            }
        }
    }

    impl TransferAgent for ShellAgent {
        fn name(&self) -> &str {
            "sh"
        }

        fn command(&self, _request: &TransferRequest) -> Result<AgentCommand, TransferError> {
            let mut cmd = AgentCommand::new("sh").args(["-c", self.script.as_str()]);
            if let Some(code) = self.checksum_exit {
                cmd = cmd.checksum_failure_exit(code);
            }
            Ok(cmd)
        }
    }

    fn context(agent: ShellAgent, root: &Path) -> (WorkerContext, tokio::task::JoinHandle<()>) {
        let (sender, reporter) = progress::channel(None);
        (
            WorkerContext {
                worker_id: "worker-1".to_string(),
                agent: Arc::new(agent),
                log_dir: root.join("logs"),
                cancel: CancellationToken::new(),
                progress: sender,
            },
            reporter,
        )
    }

    fn request() -> TransferRequest {
        TransferRequest::from_url("sftp://host/proj/RUN1/sample.bam").with_checksum("abc123")
    }

    #[tokio::test]
    async fn successful_agent_yields_verified_message() {
        let dir = tempdir().unwrap();
        let (ctx, _reporter) = context(ShellAgent::new("echo progress line"), dir.path());

        let outcome = execute(&ctx, &request()).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.message, "checksum verified by agent");
    }

    #[tokio::test]
    async fn success_without_checksum_says_so() {
        let dir = tempdir().unwrap();
        let (ctx, _reporter) = context(ShellAgent::new("true"), dir.path());

        let req = TransferRequest::from_url("sftp://host/f.bam");
        let outcome = execute(&ctx, &req).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.message, "no checksum provided");
    }

    #[tokio::test]
    async fn nonzero_exit_carries_stderr_diagnostic() {
        let dir = tempdir().unwrap();
        let (ctx, _reporter) =
            context(ShellAgent::new("echo boom >&2; exit 3"), dir.path());

        let outcome = execute(&ctx, &request()).await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.contains("boom"));
    }

    #[tokio::test]
    async fn checksum_failure_exit_is_distinguished() {
        let dir = tempdir().unwrap();
        let mut agent = ShellAgent::new("exit 32");
        agent.checksum_exit = Some(32);
        let (ctx, _reporter) = context(agent, dir.path());

        let outcome = execute(&ctx, &request()).await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.contains("checksum mismatch"));
    }

    #[tokio::test]
    async fn pre_set_token_short_circuits() {
        let dir = tempdir().unwrap();
        let (ctx, _reporter) = context(ShellAgent::new("sleep 30"), dir.path());
        ctx.cancel.cancel();

        let outcome = execute(&ctx, &request()).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message, "stopped");
        // no side effects: the log directory was never created
        assert!(!dir.path().join("logs").exists());
    }

    #[tokio::test]
    async fn cancellation_kills_running_agent_promptly() {
        let dir = tempdir().unwrap();
        let (ctx, _reporter) = context(ShellAgent::new("sleep 30"), dir.path());

        let cancel = ctx.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            cancel.cancel();
        });

        let started = Instant::now();
        let outcome = execute(&ctx, &request()).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message, "stopped");
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[tokio::test]
    async fn output_lines_land_in_worker_log() {
        let dir = tempdir().unwrap();
        let (ctx, _reporter) =
            context(ShellAgent::new("echo one; echo two"), dir.path());

        execute(&ctx, &request()).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("logs"))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with("_worker-1.log"))
            .collect();
        assert_eq!(entries.len(), 1);

        let contents = std::fs::read_to_string(entries[0].path()).unwrap();
        assert!(contents.contains("one"));
        assert!(contents.contains("two"));
        assert!(contents.contains("Starting transfer"));
        assert!(contents.contains("Transfer completed"));
    }
}
