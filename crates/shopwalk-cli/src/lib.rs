//! Shopwalk CLI library
//!
//! Argument parsing, log setup and the run/report glue behind the
//! `shopwalk` binary.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod error;
mod logging;
mod output;
mod runner;

pub use commands::{Cli, Commands, ConfigArgs, FlowArg, RunArgs, DEFAULT_CONFIG_PATH};
pub use error::{CliError, CliResult};
pub use logging::{init as init_logging, Verbosity};
pub use output::render_report;
pub use runner::{apply_overrides, browser_factory, load_config, requested_flows, run_suite};
