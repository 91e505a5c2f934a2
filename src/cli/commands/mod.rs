//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Async Commands
//!
//! `revert` and `wait` do network I/O. Each handler builds a tokio runtime
//! and blocks on its async implementation.

mod completion;
mod revert;
mod wait;

pub use completion::completion;
pub use revert::revert;
pub use wait::wait;

use crate::cli::args::Command;
use crate::core::config::Config;
use anyhow::Result;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Revert(args) => revert(config, args),
        Command::Wait { condition } => wait(config, condition),
        Command::Completion { shell } => completion(shell),
    }
}
