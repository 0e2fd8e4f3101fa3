//! Human-readable suite summary

use console::style;
use shopwalk::{FlowOutcome, SuiteReport};
use std::fmt::Write;

fn outcome_line(outcome: &FlowOutcome) -> String {
    let mark = if outcome.passed {
        style("PASS").green().bold()
    } else {
        style("FAIL").red().bold()
    };
    format!(
        "{mark} {} ({} steps, {:.1}s)",
        outcome.name,
        outcome.steps.len(),
        outcome.duration.as_secs_f64()
    )
}

/// Render the summary printed after a run
#[must_use]
pub fn render_report(report: &SuiteReport) -> String {
    let mut out = String::new();
    for outcome in &report.outcomes {
        let _ = writeln!(out, "{}", outcome_line(outcome));
        if let Some(error) = &outcome.error {
            let _ = writeln!(
                out,
                "     after: {}",
                outcome.last_step().unwrap_or("<nothing completed>")
            );
            let _ = writeln!(out, "     error: {error}");
        }
        if let Some(path) = &outcome.screenshot {
            let _ = writeln!(out, "     screenshot: {}", path.display());
        }
    }
    let summary = format!(
        "{} passed, {} failed in {:.1}s",
        report.passed_count(),
        report.failed_count(),
        report.duration.as_secs_f64()
    );
    let summary = if report.all_passed() {
        style(summary).green()
    } else {
        style(summary).red()
    };
    let _ = writeln!(out, "\n{summary}");
    out
}
