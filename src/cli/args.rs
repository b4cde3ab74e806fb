//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs, config::ConfigCommands, fixture::FixtureCommands,
    init::InitArgs, log::LogCommands, measure::MeasureArgs,
};

#[derive(Parser)]
#[command(name = "fxl")]
#[command(author, version, about = "Fixture Ledger")]
#[command(long_about = "Catalogue fixtures and accessories, record inspection measurements, and analyse the history, all in plain CSV files.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Directory holding the catalog and observation log (default: Desktop)
    #[arg(long, global = true, env = "FXL_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Read configuration from this file as well as the global one
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the data directory and an empty catalog
    Init(InitArgs),

    /// Fixture catalog management (accessories and inspection parameters)
    #[command(subcommand)]
    Fixture(FixtureCommands),

    /// Record an inspection session and append it to the observation log
    Measure(MeasureArgs),

    /// Browse, filter and pivot the observation log
    #[command(subcommand)]
    Log(LogCommands),

    /// Show or create configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (tsv for tables, yaml for show)
    #[default]
    Auto,
    /// Tab-separated values (for reading and piping)
    Tsv,
    /// CSV format (for spreadsheets)
    Csv,
    /// JSON format (for programming)
    Json,
    /// YAML format (full fidelity)
    Yaml,
    /// Markdown tables
    Md,
}
