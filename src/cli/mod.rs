//! CLI module for unirest
//!
//! - serve: boot the storage backend and serve the REST API
//! - check-config: validate and print the effective configuration

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command, ServeArgs};
pub use commands::{check_config, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
