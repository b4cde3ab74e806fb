//! Store errors with diagnostic help text

use miette::Diagnostic;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by the catalog, observation log and query engine
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("file not found: {}", path.display())]
    #[diagnostic(
        code(fxl::store::not_found),
        help("Nothing has been saved here yet. Check --data-dir or the FXL_DATA_DIR variable.")
    )]
    NotFound { path: PathBuf },

    #[error("permission denied: unable to write to {}", path.display())]
    #[diagnostic(
        code(fxl::store::permission_denied),
        help("Make sure the file is not open in another program and that you have write permission.")
    )]
    PermissionDenied { path: PathBuf },

    #[error("incomplete data: {what}")]
    #[diagnostic(
        code(fxl::store::incomplete),
        help("Fill in every field before saving.")
    )]
    IncompleteData { what: String },

    #[error("cannot aggregate line {line}: '{value}' in column '{column}' is not a number")]
    #[diagnostic(
        code(fxl::query::aggregation_type),
        help("sum, mean, min and max need a numeric value column. Use 'count' or pick another column.")
    )]
    AggregationType {
        line: usize,
        column: String,
        value: String,
    },

    #[error("unsaved observations for fixture {fixture}, accessory {accessory}")]
    #[diagnostic(
        code(fxl::session::unsaved),
        help("Cache the current accessory or discard its edits before switching.")
    )]
    UnsavedChanges { fixture: String, accessory: String },

    #[error("fixture '{0}' not found in the catalog")]
    #[diagnostic(code(fxl::catalog::unknown_fixture))]
    UnknownFixture(String),

    #[error("accessory '{accessory}' not found on fixture '{fixture}'")]
    #[diagnostic(code(fxl::catalog::unknown_accessory))]
    UnknownAccessory { fixture: String, accessory: String },

    #[error("accessory '{accessory}' has no parameter row {serial}")]
    #[diagnostic(code(fxl::catalog::unknown_row))]
    UnknownRow { accessory: String, serial: usize },

    #[error("accessory '{accessory}' already exists on fixture '{fixture}'")]
    #[diagnostic(code(fxl::catalog::duplicate_accessory))]
    DuplicateAccessory { fixture: String, accessory: String },

    #[error("invalid config file {path}: {reason}")]
    #[diagnostic(
        code(fxl::config::invalid),
        help("Check the YAML syntax, or run 'fxl config init --force' to start from the template.")
    )]
    InvalidConfig { path: PathBuf, reason: String },

    #[error("unexpected error: {0}")]
    #[diagnostic(code(fxl::store::unexpected))]
    Unexpected(String),
}

impl StoreError {
    /// Classify an I/O error raised while touching `path`
    pub fn from_io(err: io::Error, path: &Path) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound {
                path: path.to_path_buf(),
            },
            io::ErrorKind::PermissionDenied => StoreError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => StoreError::Unexpected(format!("{}: {}", path.display(), err)),
        }
    }

    /// Classify a CSV error, unwrapping the I/O cause when there is one
    pub fn from_csv(err: csv::Error, path: &Path) -> Self {
        if err.is_io_error() {
            if let csv::ErrorKind::Io(io_err) = err.into_kind() {
                return Self::from_io(io_err, path);
            }
            return StoreError::Unexpected(format!("{}: CSV I/O error", path.display()));
        }
        StoreError::Unexpected(format!("{}: {}", path.display(), err))
    }

    pub fn incomplete(what: impl Into<String>) -> Self {
        StoreError::IncompleteData { what: what.into() }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
