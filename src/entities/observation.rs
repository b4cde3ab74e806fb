//! Measurement observations recorded against parameter rows

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Pass/fail indicator for an inspected parameter or accessory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "OK", alias = "ok")]
    Ok,
    #[serde(rename = "NG", alias = "ng")]
    Ng,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Ng => "NG",
        }
    }

    /// The other state, as flipped by the group toggle
    pub fn toggled(self) -> Self {
        match self {
            Status::Ok => Status::Ng,
            Status::Ng => Status::Ok,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "OK" => Ok(Status::Ok),
            "NG" => Ok(Status::Ng),
            _ => Err(format!("invalid status '{}': expected OK or NG", s)),
        }
    }
}

/// Overall status of a set of rows: OK only when every row is exactly OK.
///
/// A blank status counts as NG. Stops at the first row that is not OK.
pub fn status_aggregate<'a, I>(statuses: I) -> Status
where
    I: IntoIterator<Item = Option<&'a Status>>,
{
    if statuses
        .into_iter()
        .all(|status| matches!(status, Some(Status::Ok)))
    {
        Status::Ok
    } else {
        Status::Ng
    }
}

/// Same fold over raw log cells
pub fn status_aggregate_str<'a, I>(statuses: I) -> Status
where
    I: IntoIterator<Item = &'a str>,
{
    if statuses.into_iter().all(|s| s == Status::Ok.as_str()) {
        Status::Ok
    } else {
        Status::Ng
    }
}

/// One measured parameter in a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationEntry {
    pub parameter: String,
    pub specification: String,
    pub inspection_instrument: String,
    #[serde(default)]
    pub observation: String,
    #[serde(default)]
    pub remark: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

/// Session cache key: one fixture accessory
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObservationKey {
    pub fixture_number: String,
    pub accessory_number: String,
}

impl ObservationKey {
    pub fn new(fixture_number: impl Into<String>, accessory_number: impl Into<String>) -> Self {
        Self {
            fixture_number: fixture_number.into(),
            accessory_number: accessory_number.into(),
        }
    }
}

impl std::fmt::Display for ObservationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.fixture_number, self.accessory_number)
    }
}

/// Observations for one accessory plus the group status stamped on submit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationGroup {
    pub accessory_name: String,
    pub entries: Vec<ObservationEntry>,
    pub status: Status,
}

impl ObservationGroup {
    pub fn new(accessory_name: impl Into<String>, entries: Vec<ObservationEntry>) -> Self {
        let status = status_aggregate(entries.iter().map(|e| e.status.as_ref()));
        Self {
            accessory_name: accessory_name.into(),
            entries,
            status,
        }
    }

    /// Recompute the group status from the rows
    pub fn refresh_status(&mut self) {
        self.status = status_aggregate(self.entries.iter().map(|e| e.status.as_ref()));
    }
}

/// Values repeated on every row of one submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMeta {
    pub date: NaiveDate,
    pub machine: String,
    pub operation: String,
}
