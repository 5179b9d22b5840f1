//! CLI library for ferry.
//!
//! `main.rs` is the composition root; everything testable lives here:
//! the clap parser and the command handlers.

pub mod handlers;
pub mod parser;

pub use parser::{Cli, Commands};
