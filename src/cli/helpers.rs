//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use miette::Result;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{Config, Workspace};

/// Load config and resolve the data directory for a command
pub fn open_workspace(global: &GlobalOpts) -> Result<(Config, Workspace)> {
    let config = Config::load(global.config.as_deref())?;
    let workspace = Workspace::resolve(&config, global.data_dir.as_deref());
    tracing::debug!(
        data_dir = %workspace.data_dir().display(),
        catalog_key = %workspace.catalog_key(),
        "resolved workspace"
    );
    Ok((config, workspace))
}

/// Resolve `auto` against the configured default, then the command's fallback
pub fn resolve_format(global: &GlobalOpts, config: &Config, fallback: OutputFormat) -> OutputFormat {
    if global.format != OutputFormat::Auto {
        return global.format;
    }
    let configured = config.default_format.as_deref().and_then(|f| {
        <OutputFormat as clap::ValueEnum>::from_str(f, true).ok()
    });
    match configured {
        Some(OutputFormat::Auto) | None => fallback,
        Some(f) => f,
    }
}

/// Truncate a string to max_len, adding "..." if truncated
///
/// Useful for table columns that need fixed-width output.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Parse an accessory given as `NUMBER=NAME`
pub fn parse_accessory_spec(s: &str) -> Result<(String, String), String> {
    let (number, name) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NUMBER=NAME, got '{}'", s))?;
    let (number, name) = (number.trim(), name.trim());
    if number.is_empty() || name.is_empty() {
        return Err(format!("accessory number and name are both required in '{}'", s));
    }
    Ok((number.to_string(), name.to_string()))
}

/// A parameter row given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub accessory: String,
    pub parameter: String,
    pub specification: String,
    pub instrument: String,
}

/// Parse a parameter given as `ACCESSORY|PARAMETER|SPECIFICATION|INSTRUMENT`
pub fn parse_param_spec(s: &str) -> Result<ParamSpec, String> {
    let parts: Vec<&str> = s.split('|').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(format!(
            "expected ACCESSORY|PARAMETER|SPECIFICATION|INSTRUMENT, got '{}'",
            s
        ));
    }
    Ok(ParamSpec {
        accessory: parts[0].to_string(),
        parameter: parts[1].to_string(),
        specification: parts[2].to_string(),
        instrument: parts[3].to_string(),
    })
}
