//! Configuration management with layered hierarchy

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::catalog::CatalogKey;
use crate::core::error::{StoreError, StoreResult};

pub const DEFAULT_CATALOG_FILE: &str = "fixture_data.csv";
pub const DEFAULT_LOG_FILE: &str = "All_Accessories_Data.csv";

/// FXL configuration with layered hierarchy
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the catalog and observation log
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Catalog file name inside the data directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_file: Option<String>,

    /// Observation log file name inside the data directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,

    /// How catalog rows are grouped into accessories on load
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_key: Option<CatalogKey>,

    /// Default output format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_format: Option<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order.
    ///
    /// A missing or broken global config is skipped with a warning; a file
    /// named with `--config` must exist and parse.
    pub fn load(explicit: Option<&Path>) -> StoreResult<Self> {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/fxl/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                match Self::read_file(&global_path) {
                    Ok(global) => config.merge(global),
                    Err(e) => {
                        tracing::warn!(error = %e, "ignoring global config file");
                    }
                }
            }
        }

        // 3. Config file named on the command line
        if let Some(path) = explicit {
            config.merge(Self::read_file(path)?);
        }

        // 4. Environment variables
        if let Ok(dir) = std::env::var("FXL_DATA_DIR") {
            if !dir.is_empty() {
                config.data_dir = Some(PathBuf::from(dir));
            }
        }
        if let Ok(name) = std::env::var("FXL_CATALOG_FILE") {
            if !name.is_empty() {
                config.catalog_file = Some(name);
            }
        }
        if let Ok(name) = std::env::var("FXL_LOG_FILE") {
            if !name.is_empty() {
                config.log_file = Some(name);
            }
        }

        Ok(config)
    }

    fn read_file(path: &Path) -> StoreResult<Config> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| StoreError::from_io(e, path))?;
        // A fresh template is all comments
        if contents
            .lines()
            .all(|line| line.trim().is_empty() || line.trim_start().starts_with('#'))
        {
            return Ok(Config::default());
        }
        serde_yml::from_str::<Config>(&contents).map_err(|e| StoreError::InvalidConfig {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "fxl")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
        if other.catalog_file.is_some() {
            self.catalog_file = other.catalog_file;
        }
        if other.log_file.is_some() {
            self.log_file = other.log_file;
        }
        if other.catalog_key.is_some() {
            self.catalog_key = other.catalog_key;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
    }

    /// Data directory: configured, else the desktop, else the home directory
    pub fn data_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.data_dir {
            return dir.clone();
        }
        directories::UserDirs::new()
            .and_then(|dirs| {
                dirs.desktop_dir()
                    .map(Path::to_path_buf)
                    .or_else(|| Some(dirs.home_dir().to_path_buf()))
            })
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn catalog_file(&self) -> &str {
        self.catalog_file.as_deref().unwrap_or(DEFAULT_CATALOG_FILE)
    }

    pub fn log_file(&self) -> &str {
        self.log_file.as_deref().unwrap_or(DEFAULT_LOG_FILE)
    }

    pub fn catalog_key(&self) -> CatalogKey {
        self.catalog_key.unwrap_or_default()
    }

    pub fn template() -> &'static str {
        r#"# Fixture Ledger configuration

# Directory holding the catalog and the observation log (default: Desktop)
# data_dir: ""

# File names inside the data directory
# catalog_file: fixture_data.csv
# log_file: All_Accessories_Data.csv

# Grouping key for catalog rows: accessory | fixture-accessory
# catalog_key: accessory

# Default output format (auto, tsv, csv, json, yaml, md)
# default_format: auto
"#
    }
}
