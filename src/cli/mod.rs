//! Command-line interface for fleetlock.
//!
//! Provides the `simulate` and `api-docs` commands.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, ApiDocsArgs, Cli, Commands, SimulateArgs};
