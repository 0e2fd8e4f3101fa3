//! Turns parsed arguments into a configured suite run

use crate::commands::RunArgs;
use crate::error::{CliError, CliResult};
use shopwalk::{DriverFactory, FlowKind, FlowSuite, SuiteConfig, SuiteReport};
use std::path::Path;
use std::sync::Arc;

/// Load the config file, then layer environment variables on top
pub fn load_config(path: &Path) -> CliResult<SuiteConfig> {
    let mut config = SuiteConfig::load(path)?;
    config.apply_env();
    config.validate()?;
    Ok(config)
}

/// Apply command-line overrides and re-check the result
pub fn apply_overrides(config: &mut SuiteConfig, args: &RunArgs) -> CliResult<()> {
    if let Some(url) = &args.base_url {
        config.base_url.clone_from(url);
    }
    if args.headless {
        config.session.headless = true;
    }
    if args.no_login {
        config.flow.login = false;
    }
    config.validate()?;
    Ok(())
}

/// Flow kinds in the order they were given
#[must_use]
pub fn requested_flows(args: &RunArgs) -> Vec<FlowKind> {
    args.flows.iter().copied().map(Into::into).collect()
}

/// Run every requested flow against browsers from `factory`
pub async fn run_suite(
    config: SuiteConfig,
    flows: &[FlowKind],
    jobs: usize,
    factory: Arc<dyn DriverFactory>,
) -> CliResult<SuiteReport> {
    if flows.is_empty() {
        return Err(CliError::config("no flows requested"));
    }
    let suite = flows
        .iter()
        .fold(FlowSuite::new(Arc::new(config), factory), |suite, &kind| {
            suite.with_flow(kind)
        })
        .with_jobs(jobs);
    tracing::info!(flows = suite.flow_count(), jobs, "starting suite");
    Ok(suite.run().await)
}

/// Chromium over CDP
#[cfg(feature = "browser")]
pub fn browser_factory(args: &RunArgs) -> CliResult<Arc<dyn DriverFactory>> {
    let factory = match &args.chrome {
        Some(path) => shopwalk::ChromiumFactory::new().with_executable(path),
        None => shopwalk::ChromiumFactory::new(),
    };
    Ok(Arc::new(factory))
}

/// Built without a browser backend
#[cfg(not(feature = "browser"))]
pub fn browser_factory(_args: &RunArgs) -> CliResult<Arc<dyn DriverFactory>> {
    Err(CliError::config(
        "built without browser support; rebuild with --features browser",
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::commands::{Cli, Commands};
    use clap::Parser;
    use shopwalk::mock::{MockDriver, MockDriverFactory};
    use std::io::Write;

    fn run_args(argv: &[&str]) -> RunArgs {
        let mut full = vec!["shopwalk", "run"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Run(args) => args,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_load_missing_config() {
        let err = load_config(Path::new("/nonexistent/shopwalk.yaml")).unwrap_err();
        assert!(err.to_string().contains("config file"));
    }

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "base_url: \"https://example.test/tr/\"\nflow:\n  target_quantity: 3"
        )
        .unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.flow.target_quantity, 3);
    }

    #[test]
    fn test_overrides() {
        let mut config = SuiteConfig::default();
        let args = run_args(&["--headless", "--base-url", "https://shop.test/", "--no-login"]);
        apply_overrides(&mut config, &args).unwrap();
        assert!(config.session.headless);
        assert_eq!(config.base_url, "https://shop.test/");
        assert!(!config.flow.login);
    }

    #[test]
    fn test_bad_override_is_rejected() {
        let mut config = SuiteConfig::default();
        let args = run_args(&["--base-url", "shop.test"]);
        assert!(apply_overrides(&mut config, &args).is_err());
    }

    #[tokio::test]
    async fn test_suite_reports_missing_inputs_without_launching() {
        let factory = Arc::new(MockDriverFactory::new(MockDriver::new));
        let config = SuiteConfig::default();
        let report = run_suite(config, &[FlowKind::Login], 1, factory.clone())
            .await
            .unwrap();
        assert_eq!(report.failed_count(), 1);
        assert!(factory.launched().is_empty());
    }

    #[tokio::test]
    async fn test_empty_flow_list() {
        let factory = Arc::new(MockDriverFactory::new(MockDriver::new));
        assert!(run_suite(SuiteConfig::default(), &[], 1, factory).await.is_err());
    }
}
