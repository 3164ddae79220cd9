//! widget-probe CLI library
//!
//! Argument parsing, configuration resolution and result reporting for the
//! `widget-probe` binary.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
mod logging;
mod output;
mod runner;

pub use commands::{Cli, ColorArg, Commands, ConfigArgs, FormatArg, ListArgs, RunArgs, SuiteArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use logging::init_tracing;
pub use output::{OutputFormat, Reporter};
pub use runner::{finish, list, resolve_config, run, run_options, show_config};
