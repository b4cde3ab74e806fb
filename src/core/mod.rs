//! Core module - stores, session context and query engine

pub mod catalog;
pub mod config;
pub mod error;
pub mod observation_log;
pub mod pivot;
pub mod query;
pub mod session;
pub mod workspace;

pub use catalog::{CatalogKey, CatalogStore, FixtureCatalog, FixtureSummary};
pub use config::Config;
pub use error::{StoreError, StoreResult};
pub use observation_log::{lookup, AccessoryTemplate, ObservationLog};
pub use pivot::{aggregate, AggFn, PivotSpec, PivotTable};
pub use query::{distinct_values, filter, load_log, LogFilter, LogRow, LogTable};
pub use session::MeasurementSession;
pub use workspace::Workspace;
