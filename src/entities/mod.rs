//! Record types stored in the catalog and observation log

pub mod column;
pub mod fixture;
pub mod observation;

pub use column::{LogColumn, CATALOG_HEADER};
pub use fixture::{AccessoryRecord, FixtureRecord, ParameterColumn, ParameterRow};
pub use observation::{
    status_aggregate, status_aggregate_str, ObservationEntry, ObservationGroup, ObservationKey,
    SessionMeta, Status,
};
