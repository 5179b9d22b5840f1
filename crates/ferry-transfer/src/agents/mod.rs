//! Concrete transfer agents.
//!
//! Each agent is a variant struct implementing the `TransferAgent`
//! capability: it knows how to phrase one transfer as an external process
//! invocation, nothing more. The worker owns spawning and supervision.

mod aria2;
mod lftp;

pub use aria2::Aria2Agent;
pub use lftp::LftpAgent;
