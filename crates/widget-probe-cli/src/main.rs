//! widget-probe: end-to-end checks for the support widget
//!
//! ## Usage
//!
//! ```bash
//! widget-probe list                          # Show scenarios
//! widget-probe run                           # Run all scenarios headless
//! widget-probe run --filter contact --headed # One scenario, visible browser
//! widget-probe run --jobs 3 --format json    # Concurrent, JSON report
//! widget-probe config --config suite.yaml    # Effective configuration
//! ```

use clap::Parser;
use std::process::ExitCode;
use widget_probe_cli::{
    init_tracing, list, run, show_config, Cli, CliConfig, CliResult, Commands, Reporter,
    Verbosity,
};

fn main() -> ExitCode {
    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_tracing(config.verbosity, config.log_json);

    let reporter = Reporter::new(config.color.should_color(), config.verbosity.is_quiet());
    tracing::debug!(?config, "starting");

    match &cli.command {
        Commands::Run(args) => run(args, &reporter),
        Commands::List(args) => list(args, &reporter),
        Commands::Config(args) => show_config(args, &reporter),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.into())
        .with_log_json(cli.log_json)
}
