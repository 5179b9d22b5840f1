//! Ordered progress reporting shared by all workers.
//!
//! Workers push text events into one multi-producer queue; a single
//! reporter task drains it to stdout and an optional combined log file.
//! Because only the reporter writes to the shared sinks, concurrent
//! workers never interleave partial lines.
//!
//! The reporter exits when the channel is closed *and* drained. The
//! orchestrator holds sender handles until every dispatched worker has
//! finished, so no buffered event is lost on shutdown, cancelled runs
//! included.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

/// Handle workers use to emit progress lines.
#[derive(Clone)]
pub struct ProgressSender {
    tx: mpsc::UnboundedSender<String>,
}

impl ProgressSender {
    /// Queue one line for the reporter.
    ///
    /// Sending never blocks; a send after the reporter is gone (which only
    /// happens after `run` returned) is silently dropped.
    pub fn emit(&self, line: impl Into<String>) {
        let _ = self.tx.send(line.into());
    }
}

/// Create the progress channel and spawn its reporter task.
///
/// The returned handle completes once every [`ProgressSender`] clone has
/// been dropped and the queue is empty.
pub fn channel(combined_log: Option<PathBuf>) -> (ProgressSender, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let handle = tokio::spawn(async move {
        let mut sink = combined_log.as_deref().and_then(|path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    warn!(path = %path.display(), error = %e, "Cannot open combined log");
                })
                .ok()
        });

        while let Some(line) = rx.recv().await {
            println!("{line}");
            if let Some(file) = sink.as_mut() {
                if writeln!(file, "{line}").is_err() {
                    // stop trying rather than warn per line
                    sink = None;
                    warn!("Combined log became unwritable; continuing console-only");
                }
            }
        }

        if let Some(file) = sink.as_mut() {
            let _ = file.flush();
        }
    });

    (ProgressSender { tx }, handle)
}
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn reporter_drains_everything_before_exit() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("combined.log");

        let (sender, handle) = channel(Some(log_path.clone()));
        let second = sender.clone();

        for i in 0..50 {
            sender.emit(format!("event {i}"));
        }
        second.emit("last event");

        drop(sender);
        drop(second);
        handle.await.unwrap();

        let contents = std::fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 51);
        assert_eq!(lines[0], "event 0");
        assert_eq!(lines[50], "last event");
    }

    #[tokio::test]
    async fn works_without_combined_log() {
        let (sender, handle) = channel(None);
        sender.emit("console only");
        drop(sender);
        handle.await.unwrap();
    }
}
