//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// widget-probe: end-to-end checks for the support widget on uchi.ru
#[derive(Parser, Debug)]
#[command(name = "widget-probe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run scenarios against the live page
    Run(RunArgs),

    /// List the available scenarios
    List(ListArgs),

    /// Show the effective configuration
    Config(ConfigArgs),
}

/// Settings that shape the suite configuration
#[derive(Args, Debug, Clone, Default)]
pub struct SuiteArgs {
    /// YAML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Page the widget is embedded on
    #[arg(long, env = "WIDGET_PROBE_BASE_URL")]
    pub base_url: Option<String>,

    /// Minimum number of popular articles
    #[arg(long)]
    pub min_articles: Option<usize>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Path to the chromium binary
    #[arg(long, env = "CHROMIUM_PATH")]
    pub chromium_path: Option<String>,

    /// Disable the chromium sandbox (containers)
    #[arg(long)]
    pub no_sandbox: bool,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Suite configuration
    #[command(flatten)]
    pub suite: SuiteArgs,

    /// Only run scenarios whose name contains this
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Scenarios to run at once, each on its own page
    #[arg(short, long, default_value = "1")]
    pub jobs: usize,

    /// Skip remaining scenarios after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: FormatArg,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(long, default_value = "text")]
    pub format: FormatArg,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Suite configuration
    #[command(flatten)]
    pub suite: SuiteArgs,
}

/// Output format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatArg {
    /// Human-readable lines
    #[default]
    Text,
    /// JSON on stdout
    Json,
}

impl From<FormatArg> for crate::output::OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
