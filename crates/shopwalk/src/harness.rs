//! Suite harness: runs flows, optionally side by side, and collects outcomes.

use crate::config::SuiteConfig;
use crate::flow::{FlowKind, FlowRunner};
use crate::session::DriverFactory;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of running a single flow
#[derive(Debug, Clone)]
pub struct FlowOutcome {
    /// Flow name
    pub name: String,
    /// Whether the flow passed
    pub passed: bool,
    /// Error message if failed
    pub error: Option<String>,
    /// Steps completed, in order
    pub steps: Vec<String>,
    /// Failure screenshot, when one was captured
    pub screenshot: Option<PathBuf>,
    /// Flow duration
    pub duration: Duration,
}

impl FlowOutcome {
    /// Create a passing outcome
    #[must_use]
    pub fn pass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            error: None,
            steps: Vec::new(),
            screenshot: None,
            duration: Duration::ZERO,
        }
    }

    /// Create a failing outcome
    #[must_use]
    pub fn fail(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            error: Some(error.into()),
            steps: Vec::new(),
            screenshot: None,
            duration: Duration::ZERO,
        }
    }

    /// Set completed steps
    #[must_use]
    pub fn with_steps(mut self, steps: Vec<String>) -> Self {
        self.steps = steps;
        self
    }

    /// Attach the failure screenshot
    #[must_use]
    pub fn with_screenshot(mut self, path: Option<PathBuf>) -> Self {
        self.screenshot = path;
        self
    }

    /// Set duration
    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Last step that completed before the outcome was decided
    #[must_use]
    pub fn last_step(&self) -> Option<&str> {
        self.steps.last().map(String::as_str)
    }
}

/// Outcomes of a whole suite run
#[derive(Debug, Clone, Default)]
pub struct SuiteReport {
    /// Individual outcomes, in the order the flows were requested
    pub outcomes: Vec<FlowOutcome>,
    /// Wall-clock duration
    pub duration: Duration,
}

impl SuiteReport {
    /// Check if all flows passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|r| r.passed)
    }

    /// Count passed flows
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.outcomes.iter().filter(|r| r.passed).count()
    }

    /// Count failed flows
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|r| !r.passed).count()
    }

    /// Get total flow count
    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Get failed flows
    #[must_use]
    pub fn failures(&self) -> Vec<&FlowOutcome> {
        self.outcomes.iter().filter(|r| !r.passed).collect()
    }
}

/// A list of flows run against one configuration
#[derive(Debug)]
pub struct FlowSuite {
    config: Arc<SuiteConfig>,
    factory: Arc<dyn DriverFactory>,
    flows: Vec<FlowKind>,
    jobs: usize,
}

impl FlowSuite {
    /// Create an empty suite
    #[must_use]
    pub fn new(config: Arc<SuiteConfig>, factory: Arc<dyn DriverFactory>) -> Self {
        Self {
            config,
            factory,
            flows: Vec::new(),
            jobs: 1,
        }
    }

    /// Add a flow
    #[must_use]
    pub fn with_flow(mut self, kind: FlowKind) -> Self {
        self.flows.push(kind);
        self
    }

    /// Number of flows run side by side (at least 1)
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Get the number of flows
    #[must_use]
    pub fn flow_count(&self) -> usize {
        self.flows.len()
    }

    /// Run every flow. Each one gets its own browser, and flows of the same
    /// kind write to numbered output files.
    pub async fn run(&self) -> SuiteReport {
        let start = Instant::now();
        let runners: Vec<(FlowKind, FlowRunner)> = self
            .flows
            .iter()
            .enumerate()
            .map(|(index, &kind)| {
                let nth = self.flows[..index].iter().filter(|&&k| k == kind).count();
                let mut config = (*self.config).clone();
                if nth > 0 {
                    config.output_path = numbered_path(&config.output_path, nth);
                }
                (kind, FlowRunner::new(Arc::new(config), self.factory.clone()))
            })
            .collect();

        let mut outcomes = Vec::with_capacity(runners.len());
        for batch in runners.chunks(self.jobs) {
            let results =
                futures::future::join_all(batch.iter().map(|(kind, runner)| runner.run_kind(*kind)))
                    .await;
            outcomes.extend(results);
        }

        let report = SuiteReport {
            outcomes,
            duration: start.elapsed(),
        };
        tracing::info!(
            passed = report.passed_count(),
            failed = report.failed_count(),
            "suite finished"
        );
        report
    }
}

/// `out/product.txt` → `out/product_2.txt`
fn numbered_path(path: &Path, n: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map_or_else(|| "output".to_string(), |s| s.to_string_lossy().into_owned());
    let name = match path.extension() {
        Some(ext) => format!("{stem}_{}.{}", n + 1, ext.to_string_lossy()),
        None => format!("{stem}_{}", n + 1),
    };
    path.with_file_name(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod outcome_tests {
        use super::*;

        #[test]
        fn test_fail_keeps_last_step() {
            let outcome = FlowOutcome::fail("shopping", "boom")
                .with_steps(vec!["open storefront".into(), "accept cookies".into()])
                .with_duration(Duration::from_secs(2));
            assert!(!outcome.passed);
            assert_eq!(outcome.last_step(), Some("accept cookies"));
            assert_eq!(outcome.duration, Duration::from_secs(2));
        }

        #[test]
        fn test_report_counts() {
            let report = SuiteReport {
                outcomes: vec![
                    FlowOutcome::pass("login"),
                    FlowOutcome::fail("shopping", "x"),
                ],
                duration: Duration::ZERO,
            };
            assert!(!report.all_passed());
            assert_eq!(report.passed_count(), 1);
            assert_eq!(report.failed_count(), 1);
            assert_eq!(report.total(), 2);
            assert_eq!(report.failures()[0].name, "shopping");
        }

        #[test]
        fn test_empty_report_passes() {
            assert!(SuiteReport::default().all_passed());
        }
    }

    mod path_tests {
        use super::*;

        #[test]
        fn test_numbered_path() {
            assert_eq!(
                numbered_path(Path::new("out/product.txt"), 1),
                PathBuf::from("out/product_2.txt")
            );
            assert_eq!(numbered_path(Path::new("snapshot"), 2), PathBuf::from("snapshot_3"));
        }
    }
}
