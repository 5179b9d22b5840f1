//! Transfer agent port definition.
//!
//! A transfer agent is an external program (aria2c, lftp, ...) that moves
//! one file and optionally verifies its checksum. The port is a capability
//! with a single required method: build the process invocation for a
//! request. The command is described as plain data so this crate needs no
//! process-spawning dependency and tests can inspect what an agent would
//! run without running it.

use std::path::PathBuf;

use crate::transfer::{TransferError, TransferRequest};

/// Description of one external process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentCommand {
    /// Program to execute.
    pub program: String,
    /// Arguments, in order. Credentials appear here; never log this value.
    pub args: Vec<String>,
    /// Directories that must exist before the process starts.
    pub ensure_dirs: Vec<PathBuf>,
    /// Exit code the agent uses to signal a checksum mismatch, when it
    /// verifies checksums itself (aria2c exits 32).
    pub checksum_failure_exit: Option<i32>,
}

impl AgentCommand {
    /// Create a command with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            ensure_dirs: Vec::new(),
            checksum_failure_exit: None,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Require a directory to exist before the process starts.
    #[must_use]
    pub fn ensure_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.ensure_dirs.push(dir.into());
        self
    }

    /// Declare the exit code that means "checksum mismatch" for this
    /// invocation.
    #[must_use]
    pub fn checksum_failure_exit(mut self, code: i32) -> Self {
        self.checksum_failure_exit = Some(code);
        self
    }
}

/// Capability for building one transfer invocation.
///
/// Concrete agents are variant structs (`Aria2Agent`, `LftpAgent` in
/// `ferry-transfer`); no runtime hierarchy beyond this single trait.
pub trait TransferAgent: Send + Sync {
    /// Short tool name recorded in the state store (`aria2`, `lftp`).
    fn name(&self) -> &str;

    /// Build the external process invocation for one transfer request.
    fn command(&self, request: &TransferRequest) -> Result<AgentCommand, TransferError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates() {
        let cmd = AgentCommand::new("aria2c")
            .arg("-x")
            .arg("10")
            .args(["--dir", "/data"])
            .ensure_dir("/data");

        assert_eq!(cmd.program, "aria2c");
        assert_eq!(cmd.args, vec!["-x", "10", "--dir", "/data"]);
        assert_eq!(cmd.ensure_dirs, vec![PathBuf::from("/data")]);
    }
}
