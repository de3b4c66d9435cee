//! CLI layer: argument parsing and command dispatch

pub mod args;
pub mod commands;
pub mod error;
pub mod output;

pub use args::{Cli, Commands, ConvertArgs};
pub use commands::{execute_command, execute_with_settings};
pub use error::{CliError, CliResult};
