//! Core domain types and port definitions for ferry.
//!
//! This crate holds everything the transfer engine and the CLI agree on:
//! transfer requests and persisted records, the error taxonomy, the
//! `TransferAgent` capability port, manifest parsing, and configuration.
//! It deliberately carries no process-spawning or I/O-heavy dependencies;
//! those live in `ferry-transfer`.

pub mod config;
pub mod manifest;
pub mod ports;
pub mod transfer;

pub use config::{SftpCredentials, TransferConfig};
pub use manifest::{Manifest, ManifestRow};
pub use ports::{AgentCommand, TransferAgent};
pub use transfer::{
    TransferError, TransferOutcome, TransferRecord, TransferRequest, TransferStatus,
};
