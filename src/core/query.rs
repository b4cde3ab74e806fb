//! Observation log queries: loading, filtering and distinct values

use csv::ReaderBuilder;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::core::error::{StoreError, StoreResult};
use crate::entities::column::LogColumn;

/// One row of the observation log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRow {
    /// 1-based line in the log file (the header is line 1)
    pub line: usize,
    values: [String; 12],
}

impl LogRow {
    pub fn new(line: usize, values: [String; 12]) -> Self {
        Self { line, values }
    }

    pub fn get(&self, column: LogColumn) -> &str {
        &self.values[column.index()]
    }

    pub fn values(&self) -> &[String; 12] {
        &self.values
    }
}

impl Serialize for LogRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(LogColumn::ALL.len()))?;
        for column in LogColumn::ALL {
            map.serialize_entry(column.header(), self.get(column))?;
        }
        map.end()
    }
}

/// Header and rows of the observation log
#[derive(Debug, Clone, Default)]
pub struct LogTable {
    /// Columns present in the file header, in file order
    pub columns: Vec<LogColumn>,
    pub rows: Vec<LogRow>,
}

/// Read the whole observation log.
///
/// Header names are matched to [`LogColumn`]s so the columns may appear in
/// any order; unknown headings are ignored. Rows longer than the header are
/// cut to the header's length and short rows are padded with blanks.
pub fn load_log(path: &Path) -> StoreResult<LogTable> {
    let file = fs::File::open(path).map_err(|e| StoreError::from_io(e, path))?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let headers = rdr
        .headers()
        .map_err(|e| StoreError::from_csv(e, path))?
        .clone();
    let positions: Vec<Option<LogColumn>> = headers.iter().map(LogColumn::from_header).collect();
    let columns: Vec<LogColumn> = positions.iter().flatten().copied().collect();

    let mut rows = Vec::new();
    for (row_idx, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| StoreError::from_csv(e, path))?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        let mut values: [String; 12] = Default::default();
        for (field, column) in record.iter().zip(&positions) {
            if let Some(column) = column {
                values[column.index()] = field.to_string();
            }
        }
        rows.push(LogRow::new(row_idx + 2, values));
    }

    tracing::debug!(path = %path.display(), rows = rows.len(), "loaded observation log");
    Ok(LogTable { columns, rows })
}

/// Row predicates; an empty set means "no constraint"
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub fixture: Option<String>,
    pub machines: BTreeSet<String>,
    pub accessories: BTreeSet<String>,
    pub dates: BTreeSet<String>,
    /// Extra per-column value sets, as picked from a column header menu
    pub columns: Vec<(LogColumn, BTreeSet<String>)>,
}

impl LogFilter {
    pub fn fixture(mut self, fixture: impl Into<String>) -> Self {
        self.fixture = Some(fixture.into());
        self
    }

    pub fn machines<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.machines.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn accessories<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accessories.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn dates<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dates.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn column<I, S>(mut self, column: LogColumn, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        match self.columns.iter_mut().find(|(c, _)| *c == column) {
            Some((_, existing)) => existing.extend(values),
            None => self.columns.push((column, values)),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fixture.as_deref().map_or(true, str::is_empty)
            && self.machines.is_empty()
            && self.accessories.is_empty()
            && self.dates.is_empty()
            && self.columns.iter().all(|(_, v)| v.is_empty())
    }

    pub fn matches(&self, row: &LogRow) -> bool {
        let in_set = |set: &BTreeSet<String>, column: LogColumn| {
            set.is_empty() || set.contains(row.get(column))
        };

        let fixture_match = match self.fixture.as_deref() {
            Some(f) if !f.is_empty() => row.get(LogColumn::Fixture) == f,
            _ => true,
        };

        fixture_match
            && in_set(&self.machines, LogColumn::Machine)
            && in_set(&self.accessories, LogColumn::Accessory)
            && in_set(&self.dates, LogColumn::Date)
            && self.columns.iter().all(|(column, set)| in_set(set, *column))
    }
}

/// Rows matching every predicate, in their original order
pub fn filter<'a>(rows: &'a [LogRow], predicates: &LogFilter) -> Vec<&'a LogRow> {
    rows.iter().filter(|row| predicates.matches(row)).collect()
}

/// Sorted distinct values of one column
pub fn distinct_values<'a, I>(rows: I, column: LogColumn) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a LogRow>,
{
    rows.into_iter()
        .map(|row| row.get(column).to_string())
        .collect()
}
