//! `fxl config` command - configuration inspection

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::PathBuf;

use crate::cli::helpers::open_workspace;
use crate::cli::GlobalOpts;
use crate::core::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration values and resolved paths
    Show(ShowArgs),

    /// Show the path of the global configuration file
    Path,

    /// Write a commented configuration template
    Init(InitArgs),
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Valid configuration keys
const VALID_KEYS: &[&str] = &[
    "data_dir",
    "catalog_file",
    "log_file",
    "catalog_key",
    "default_format",
];

pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => run_show(args, global),
        ConfigCommands::Path => run_path(),
        ConfigCommands::Init(args) => run_init(args, global),
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (config, workspace) = open_workspace(global)?;

    if let Some(key) = &args.key {
        let value = match key.as_str() {
            "data_dir" => workspace.data_dir().display().to_string(),
            "catalog_file" => config.catalog_file().to_string(),
            "log_file" => config.log_file().to_string(),
            "catalog_key" => config.catalog_key().to_string(),
            "default_format" => config
                .default_format
                .clone()
                .unwrap_or_else(|| "auto".to_string()),
            _ => {
                return Err(miette::miette!(
                    help = format!("valid keys: {}", VALID_KEYS.join(", ")),
                    "Unknown configuration key '{}'",
                    key
                ))
            }
        };
        println!("{}", value);
        return Ok(());
    }

    println!("{}", style("Effective Configuration").bold().underlined());
    println!();
    print_value("data_dir", &workspace.data_dir().display().to_string());
    print_value("catalog_file", config.catalog_file());
    print_value("log_file", config.log_file());
    print_value("catalog_key", &config.catalog_key().to_string());
    print_value(
        "default_format",
        config.default_format.as_deref().unwrap_or("auto"),
    );
    println!();
    println!("{}", style("Resolved files:").dim());
    println!("  {}", workspace.catalog_path().display());
    println!("  {}", workspace.log_path().display());
    println!();
    println!("{}", style("Config Sources (later wins):").dim());
    println!("  1. Global config (config.yaml in the user config directory)");
    println!("  2. --config <FILE>");
    println!("  3. Environment variables (FXL_DATA_DIR, FXL_CATALOG_FILE, FXL_LOG_FILE)");
    println!("  4. --data-dir");
    Ok(())
}

fn run_path() -> Result<()> {
    let path = global_config_path()?;
    println!("{}", path.display());
    Ok(())
}

fn run_init(args: InitArgs, global: &GlobalOpts) -> Result<()> {
    let path = match &global.config {
        Some(path) => path.clone(),
        None => global_config_path()?,
    };

    if path.exists() && !args.force {
        return Err(miette::miette!(
            help = "use --force to overwrite it",
            "Config file already exists: {}",
            path.display()
        ));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).into_diagnostic()?;
    }
    fs::write(&path, Config::template()).into_diagnostic()?;

    if !global.quiet {
        println!(
            "{} Wrote config template to {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }
    Ok(())
}

fn global_config_path() -> Result<PathBuf> {
    Config::global_config_path()
        .ok_or_else(|| miette::miette!("Could not determine global config directory"))
}

fn print_value(key: &str, value: &str) {
    println!("  {}: {}", style(key).cyan(), style(value).yellow());
}
