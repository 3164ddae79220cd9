//! Output formatting for scenario results

use console::{style, Style, StyledObject, Term};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use widget_probe::{Outcome, ScenarioReport, SuiteReport};

/// Output format for scenario results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON document on stdout
    Json,
}

/// Writes status lines to stderr and data to stdout
#[derive(Debug)]
pub struct Reporter {
    term: Term,
    out: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl Reporter {
    /// Create a new reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            out: Term::stdout(),
            use_color,
            quiet,
        }
    }

    fn prefixed(&self, symbol: &str, plain: &str, paint: fn(StyledObject<&str>) -> StyledObject<&str>) -> String {
        if self.use_color {
            paint(style(symbol)).bold().to_string()
        } else {
            plain.to_string()
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = self.prefixed("✓", "PASS", |s| s.green());
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        let prefix = self.prefixed("✗", "FAIL", |s| s.red());
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = self.prefixed("⚠", "SKIP", |s| s.yellow());
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = self.prefixed("ℹ", "INFO", |s| s.blue());
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }
        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };
        let _ = self.term.write_line("");
        let _ = self.term.write_line(&styled);
    }

    /// Write a data line to stdout
    pub fn data(&self, line: &str) -> std::io::Result<()> {
        self.out.write_line(line)
    }

    /// Print one scenario's outcome
    pub fn scenario(&self, report: &ScenarioReport) {
        match report.outcome {
            Outcome::Passed => {
                self.success(&format!("{} ({}ms)", report.name, report.duration_ms));
            }
            Outcome::Failed => {
                let step = report.failed_step.unwrap_or("?");
                let error = report.error.as_deref().unwrap_or("unknown error");
                self.failure(&format!("{} at step `{step}`: {error}", report.name));
            }
            Outcome::Skipped => self.warning(&format!("{} (skipped)", report.name)),
        }
    }

    /// Print every scenario followed by the summary line
    pub fn suite(&self, report: &SuiteReport) {
        for scenario in &report.scenarios {
            self.scenario(scenario);
        }
        self.summary(
            report.passed(),
            report.failed(),
            report.skipped(),
            Duration::from_millis(report.duration_ms),
        );
    }

    /// Print run summary
    pub fn summary(&self, passed: usize, failed: usize, skipped: usize, duration: Duration) {
        if self.quiet && failed == 0 {
            return;
        }

        let _ = self.term.write_line("");

        let total = passed + failed + skipped;
        let duration_secs = duration.as_secs_f64();

        if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();
            let skipped_style = Style::new().yellow();

            let status = if failed > 0 {
                failed_style.apply_to("FAILED")
            } else {
                passed_style.apply_to("PASSED")
            };

            let _ = self.term.write_line(&format!(
                "{} {} scenarios in {:.2}s ({} passed, {} failed, {} skipped)",
                status,
                total,
                duration_secs,
                passed_style.apply_to(passed),
                if failed > 0 {
                    failed_style.apply_to(failed).to_string()
                } else {
                    failed.to_string()
                },
                skipped_style.apply_to(skipped)
            ));
        } else {
            let status = if failed > 0 { "FAILED" } else { "PASSED" };
            let _ = self.term.write_line(&format!(
                "{status} {total} scenarios in {duration_secs:.2}s ({passed} passed, {failed} failed, {skipped} skipped)"
            ));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn report(outcome: Outcome) -> ScenarioReport {
        ScenarioReport {
            name: "widget_opens",
            outcome,
            duration_ms: 12,
            steps: Vec::new(),
            failed_step: (outcome == Outcome::Failed).then_some("open widget"),
            error: (outcome == Outcome::Failed).then(|| "timed out".to_string()),
        }
    }

    mod output_format_tests {
        use super::*;

        #[test]
        fn test_default_format() {
            assert_eq!(OutputFormat::default(), OutputFormat::Text);
        }
    }

    mod reporter_tests {
        use super::*;

        #[test]
        fn test_new_reporter() {
            let reporter = Reporter::new(false, true);
            assert!(!reporter.use_color);
            assert!(reporter.quiet);
        }

        #[test]
        fn test_scenario_lines_do_not_panic() {
            let reporter = Reporter::new(false, false);
            reporter.scenario(&report(Outcome::Passed));
            reporter.scenario(&report(Outcome::Failed));
            reporter.scenario(&report(Outcome::Skipped));
        }

        #[test]
        fn test_suite_and_summary_colored() {
            let reporter = Reporter::new(true, false);
            reporter.header("Scenarios");
            reporter.suite(&SuiteReport {
                scenarios: vec![report(Outcome::Passed), report(Outcome::Failed)],
                duration_ms: 1500,
            });
        }
    }
}
