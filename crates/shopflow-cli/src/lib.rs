//! Shopflow CLI library
//!
//! Command definitions, output and command execution for the `shopflow`
//! binary.

#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
mod output;
mod runner;

pub use commands::{
    Cli, ColorArg, Commands, DeviceArg, EngineArg, ListArgs, ResetArgs, RunArgs,
    ScenarioSourceArgs, ShowArgs, StoreArgs,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{outcome_line, ProgressReporter};
pub use runner::{list_line, load_scenarios, FlowRunner};
