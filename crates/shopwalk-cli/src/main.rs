//! Shopwalk CLI: run storefront end-to-end flows
//!
//! ## Usage
//!
//! ```bash
//! shopwalk run                                  # shopping flow, config/shopwalk.yaml
//! shopwalk run --flow login --flow shopping -j 2
//! shopwalk check-config -c ci.yaml              # validate without a browser
//! shopwalk locators                             # print the effective selectors
//! ```

use clap::Parser;
use shopwalk::SuiteConfig;
use shopwalk_cli::{
    apply_overrides, browser_factory, init_logging, load_config, render_report, requested_flows,
    run_suite, Cli, CliError, CliResult, Commands, ConfigArgs, RunArgs, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);

    match cli.command {
        Commands::Run(args) => {
            let mut config = load_config(&args.config.config)?;
            apply_overrides(&mut config, &args)?;
            let _guard = init_logging(verbosity, cli.json_logs, config.log_path.as_deref())?;
            run_flows(config, &args)
        }
        Commands::CheckConfig(args) => {
            let _guard = init_logging(verbosity, cli.json_logs, None)?;
            check_config(&args)
        }
        Commands::Locators(args) => {
            let _guard = init_logging(verbosity, cli.json_logs, None)?;
            print_locators(&args)
        }
    }
}

fn run_flows(config: SuiteConfig, args: &RunArgs) -> CliResult<()> {
    let factory = browser_factory(args)?;
    let flows = requested_flows(args);
    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(run_suite(config, &flows, args.jobs, factory))?;

    print!("{}", render_report(&report));
    if report.all_passed() {
        Ok(())
    } else {
        Err(CliError::FlowsFailed {
            failed: report.failed_count(),
            total: report.total(),
        })
    }
}

fn check_config(args: &ConfigArgs) -> CliResult<()> {
    let config = load_config(&args.config)?;
    println!("{}: ok", args.config.display());
    println!("  base_url: {}", config.base_url);
    println!("  login: {}", config.flow.login);
    match config.keyword_pair() {
        Ok(pair) => println!("  keywords: {} / {}", pair.first, pair.second),
        Err(e) => println!("  keywords: {e}"),
    }
    if let Err(e) = config.require_credentials() {
        println!("  credentials: {e}");
    }
    Ok(())
}

fn print_locators(args: &ConfigArgs) -> CliResult<()> {
    let config = if args.config.is_file() {
        load_config(&args.config)?
    } else {
        SuiteConfig::default()
    };
    for (key, locator) in config.locators.entries() {
        println!("{key:<28} {locator}");
    }
    Ok(())
}
