//! `snapctl` operator CLI.
//!
//! Read-only introspection and maintenance over one partition's
//! snapshot store: list committed snapshots, show one in detail, and
//! sweep stale staging directories outside of the automatic startup
//! sweep.

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::run_command;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
