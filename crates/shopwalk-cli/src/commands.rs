//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use shopwalk::FlowKind;
use std::path::PathBuf;

/// Default config location, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/shopwalk.yaml";

/// Shopwalk: storefront end-to-end flows in a real browser
#[derive(Parser, Debug)]
#[command(name = "shopwalk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (only warnings and errors are logged)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run flows against the storefront
    Run(RunArgs),

    /// Load and validate a config file without launching a browser
    CheckConfig(ConfigArgs),

    /// Print the effective locator catalog
    Locators(ConfigArgs),
}

/// Config file selection shared by every command
#[derive(Parser, Debug, Clone)]
pub struct ConfigArgs {
    /// YAML config file
    #[arg(short, long, env = "SHOPWALK_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

/// Arguments for the run command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Config file
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Flows to run, in order (repeatable)
    #[arg(short, long = "flow", value_enum, default_value = "shopping")]
    pub flows: Vec<FlowArg>,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,

    /// Override the storefront URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Flows run side by side, each with its own browser
    #[arg(short = 'j', long, default_value = "1")]
    pub jobs: usize,

    /// Chromium binary to launch instead of the one on PATH
    #[arg(long)]
    pub chrome: Option<PathBuf>,

    /// Skip logging in (the login flow still logs in)
    #[arg(long)]
    pub no_login: bool,
}

/// Flow names accepted on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowArg {
    /// Log in and out
    Login,
    /// Search, add to cart, change quantity, empty the cart
    Shopping,
}

impl From<FlowArg> for FlowKind {
    fn from(arg: FlowArg) -> Self {
        match arg {
            FlowArg::Login => Self::Login,
            FlowArg::Shopping => Self::Shopping,
        }
    }
}
