//! Typed columns of the catalog and observation log files

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Catalog file header, in file order
pub const CATALOG_HEADER: [&str; 7] = [
    "Fixture Number",
    "Fixture Name",
    "Accessory Name",
    "Accessory Number",
    "Parameter",
    "Specification",
    "Inspection Instrument",
];

/// A column of the observation log
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum LogColumn {
    Date,
    #[value(alias = "machine-no")]
    Machine,
    Operation,
    #[value(alias = "fixture-no")]
    Fixture,
    #[value(alias = "accessory-no")]
    Accessory,
    AccessoryName,
    Parameter,
    #[value(alias = "spec")]
    Specification,
    #[value(alias = "instrument")]
    InspectionInstrument,
    Observation,
    Remark,
    Status,
}

impl LogColumn {
    /// Every column, in file order
    pub const ALL: [LogColumn; 12] = [
        LogColumn::Date,
        LogColumn::Machine,
        LogColumn::Operation,
        LogColumn::Fixture,
        LogColumn::Accessory,
        LogColumn::AccessoryName,
        LogColumn::Parameter,
        LogColumn::Specification,
        LogColumn::InspectionInstrument,
        LogColumn::Observation,
        LogColumn::Remark,
        LogColumn::Status,
    ];

    /// Heading written to the log file
    pub fn header(&self) -> &'static str {
        match self {
            LogColumn::Date => "Date",
            LogColumn::Machine => "Machine No.",
            LogColumn::Operation => "Operation",
            LogColumn::Fixture => "Fixture No.",
            LogColumn::Accessory => "Accessory No.",
            LogColumn::AccessoryName => "Accessory Name",
            LogColumn::Parameter => "Parameter",
            LogColumn::Specification => "Specification",
            LogColumn::InspectionInstrument => "Inspection Instrument",
            LogColumn::Observation => "Observation",
            LogColumn::Remark => "Remark",
            LogColumn::Status => "Status",
        }
    }

    /// Position of the column in a canonical log row
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Match a file heading to a column
    pub fn from_header(header: &str) -> Option<Self> {
        let header = header.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.header().eq_ignore_ascii_case(header))
    }
}

impl std::fmt::Display for LogColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.header())
    }
}

impl FromStr for LogColumn {
    type Err = String;

    /// Accepts either the file heading ("Fixture No.") or the CLI name ("fixture")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(col) = Self::from_header(s) {
            return Ok(col);
        }
        <Self as clap::ValueEnum>::from_str(s, true)
            .map_err(|_| format!("unknown log column '{}'", s))
    }
}

/// Log file header, in file order
pub fn log_header() -> [&'static str; 12] {
    LogColumn::ALL.map(|c| c.header())
}
