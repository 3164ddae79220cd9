//! Subcommand implementations

use crate::commands::{ConfigArgs, ListArgs, RunArgs, SuiteArgs};
use crate::error::{CliError, CliResult};
use crate::output::{OutputFormat, Reporter};
use serde::Serialize;
use widget_probe::{RunOptions, Scenario, SuiteConfig, SuiteReport};

/// Build the suite configuration: file (if any), then flag and env overrides
pub fn resolve_config(args: &SuiteArgs) -> CliResult<SuiteConfig> {
    let mut config = match &args.config {
        Some(path) => SuiteConfig::load(path).map_err(|e| {
            CliError::config(format!("cannot load {}: {e}", path.display()))
        })?,
        None => SuiteConfig::default(),
    };
    if let Some(url) = &args.base_url {
        config.base_url.clone_from(url);
    }
    if let Some(min) = args.min_articles {
        config.min_articles = min;
    }
    if args.headed {
        config.browser.headless = false;
    }
    if let Some(path) = &args.chromium_path {
        config.browser.chromium_path = Some(path.clone());
    }
    if args.no_sandbox {
        config.browser.sandbox = false;
    }
    config.validate()?;
    Ok(config)
}

/// Check run arguments and turn them into runner options
pub fn run_options(args: &RunArgs) -> CliResult<RunOptions> {
    if args.jobs == 0 {
        return Err(CliError::invalid_argument("--jobs must be at least 1"));
    }
    if let Some(filter) = &args.filter {
        if Scenario::select(Some(filter)).is_empty() {
            return Err(CliError::invalid_argument(format!(
                "no scenario matches `{filter}` (see `widget-probe list`)"
            )));
        }
    }
    Ok(RunOptions {
        filter: args.filter.clone(),
        jobs: args.jobs,
        fail_fast: args.fail_fast,
    })
}

/// Print the report and turn failures into an error
pub fn finish(report: &SuiteReport, format: OutputFormat, reporter: &Reporter) -> CliResult<()> {
    match format {
        OutputFormat::Json => reporter.data(&serde_json::to_string_pretty(report)?)?,
        OutputFormat::Text => {
            reporter.header("Scenarios");
            reporter.suite(report);
        }
    }
    if report.success() {
        Ok(())
    } else {
        Err(CliError::ScenariosFailed {
            failed: report.failed(),
            total: report.scenarios.len(),
        })
    }
}

/// `run`: launch chromium and execute the selected scenarios
#[cfg(feature = "browser")]
pub fn run(args: &RunArgs, reporter: &Reporter) -> CliResult<()> {
    let config = resolve_config(&args.suite)?;
    let options = run_options(args)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let report = runtime.block_on(async {
        let browser = widget_probe::Browser::launch(&config.browser).await?;
        reporter.info(&format!("target {}", config.base_url));
        let report = widget_probe::run_suite(&browser, &config, &options).await;
        if let Err(e) = browser.close().await {
            tracing::warn!(error = %e, "browser did not close cleanly");
        }
        Ok::<_, CliError>(report)
    })?;

    finish(&report, args.format.into(), reporter)
}

/// `run` without browser support compiled in
#[cfg(not(feature = "browser"))]
pub fn run(args: &RunArgs, _reporter: &Reporter) -> CliResult<()> {
    let _ = resolve_config(&args.suite)?;
    let _ = run_options(args)?;
    Err(CliError::config(
        "browser support not enabled. Rebuild with --features browser",
    ))
}

#[derive(Serialize)]
struct ScenarioEntry {
    name: &'static str,
    description: &'static str,
}

/// `list`: print scenario names and descriptions
pub fn list(args: &ListArgs, reporter: &Reporter) -> CliResult<()> {
    match OutputFormat::from(args.format) {
        OutputFormat::Json => {
            let entries: Vec<ScenarioEntry> = Scenario::ALL
                .iter()
                .map(|s| ScenarioEntry {
                    name: s.name(),
                    description: s.description(),
                })
                .collect();
            reporter.data(&serde_json::to_string_pretty(&entries)?)?;
        }
        OutputFormat::Text => {
            for scenario in Scenario::ALL {
                reporter.data(&format!("{:<38} {}", scenario.name(), scenario.description()))?;
            }
        }
    }
    Ok(())
}

/// `config`: print the effective configuration as YAML
pub fn show_config(args: &ConfigArgs, reporter: &Reporter) -> CliResult<()> {
    let config = resolve_config(&args.suite)?;
    reporter.data(config.to_yaml()?.trim_end())?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::commands::FormatArg;
    use std::io::Write;

    fn run_args(filter: Option<&str>, jobs: usize) -> RunArgs {
        RunArgs {
            suite: SuiteArgs::default(),
            filter: filter.map(str::to_string),
            jobs,
            fail_fast: true,
            format: FormatArg::Text,
        }
    }

    mod resolve_config_tests {
        use super::*;

        #[test]
        fn test_defaults_without_file() {
            let config = resolve_config(&SuiteArgs::default()).unwrap();
            assert_eq!(config, SuiteConfig::default());
        }

        #[test]
        fn test_flags_override_file() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "base_url: http://from-file/\nmin_articles: 7").unwrap();
            let args = SuiteArgs {
                config: Some(file.path().to_path_buf()),
                base_url: Some("http://from-flag/".to_string()),
                headed: true,
                no_sandbox: true,
                chromium_path: Some("/usr/bin/chromium".to_string()),
                ..SuiteArgs::default()
            };
            let config = resolve_config(&args).unwrap();
            assert_eq!(config.base_url, "http://from-flag/");
            assert_eq!(config.min_articles, 7);
            assert!(!config.browser.headless);
            assert!(!config.browser.sandbox);
            assert_eq!(config.browser.chromium_path.as_deref(), Some("/usr/bin/chromium"));
        }

        #[test]
        fn test_missing_file_is_config_error() {
            let args = SuiteArgs {
                config: Some("/nonexistent/suite.yaml".into()),
                ..SuiteArgs::default()
            };
            let err = resolve_config(&args).unwrap_err();
            assert!(err.to_string().contains("/nonexistent/suite.yaml"));
        }

        #[test]
        fn test_invalid_override_rejected() {
            let args = SuiteArgs {
                base_url: Some(String::new()),
                ..SuiteArgs::default()
            };
            assert!(resolve_config(&args).is_err());
        }
    }

    mod run_options_tests {
        use super::*;

        #[test]
        fn test_zero_jobs_rejected() {
            assert!(run_options(&run_args(None, 0)).is_err());
        }

        #[test]
        fn test_unmatched_filter_rejected() {
            let err = run_options(&run_args(Some("nope"), 1)).unwrap_err();
            assert!(err.to_string().contains("nope"));
        }

        #[test]
        fn test_options_carried_over() {
            let options = run_options(&run_args(Some("articles"), 2)).unwrap();
            assert_eq!(options.filter.as_deref(), Some("articles"));
            assert_eq!(options.jobs, 2);
            assert!(options.fail_fast);
        }
    }

    mod finish_tests {
        use super::*;

        #[test]
        fn test_empty_report_succeeds() {
            let report = SuiteReport {
                scenarios: Vec::new(),
                duration_ms: 0,
            };
            finish(&report, OutputFormat::Text, &Reporter::new(false, true)).unwrap();
        }
    }
}
