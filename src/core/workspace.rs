//! Data directory resolution

use std::path::{Path, PathBuf};

use crate::core::catalog::{CatalogKey, CatalogStore};
use crate::core::config::Config;
use crate::core::error::{StoreError, StoreResult};
use crate::core::observation_log::ObservationLog;

/// The directory holding one catalog and one observation log
#[derive(Debug, Clone)]
pub struct Workspace {
    data_dir: PathBuf,
    catalog_path: PathBuf,
    log_path: PathBuf,
    catalog_key: CatalogKey,
}

impl Workspace {
    /// Resolve paths from config, with an optional command line override
    pub fn resolve(config: &Config, data_dir_override: Option<&Path>) -> Self {
        let data_dir = data_dir_override
            .map(Path::to_path_buf)
            .unwrap_or_else(|| config.data_dir());
        Self {
            catalog_path: data_dir.join(config.catalog_file()),
            log_path: data_dir.join(config.log_file()),
            catalog_key: config.catalog_key(),
            data_dir,
        }
    }

    /// Create the data directory and a header-only catalog.
    ///
    /// Returns whether the catalog file was created.
    pub fn init(&self) -> StoreResult<bool> {
        std::fs::create_dir_all(&self.data_dir)
            .map_err(|e| StoreError::from_io(e, &self.data_dir))?;
        self.catalog().ensure_exists()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn catalog_path(&self) -> &Path {
        &self.catalog_path
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn catalog_key(&self) -> CatalogKey {
        self.catalog_key
    }

    pub fn catalog(&self) -> CatalogStore {
        CatalogStore::new(&self.catalog_path, self.catalog_key)
    }

    pub fn observation_log(&self) -> ObservationLog {
        ObservationLog::new(&self.log_path)
    }
}
