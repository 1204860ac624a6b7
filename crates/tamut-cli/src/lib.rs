//! tamut CLI library
//!
//! Command-line front end for mutation testing of timed-automaton components.

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod logging;
mod output;

pub use commands::{
    CheckStrategyArgs, Cli, ColorArg, Commands, FormatArg, MutateArgs, OperatorArgs, RunArgs,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{OutputFormat, ProgressReporter};
