//! Command handlers. Each handler owns the wiring for one subcommand and
//! reports through its return value; `main.rs` only dispatches.

pub mod fetch;
pub mod fsops;
pub mod verify;
