//! Pivot aggregation over observation log rows

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::core::error::{StoreError, StoreResult};
use crate::core::query::LogRow;
use crate::entities::column::LogColumn;

/// Reduction applied to the value column of each pivot cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AggFn {
    #[default]
    Count,
    Sum,
    Mean,
    Min,
    Max,
}

impl AggFn {
    fn is_numeric(&self) -> bool {
        !matches!(self, AggFn::Count)
    }
}

impl std::fmt::Display for AggFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggFn::Count => write!(f, "count"),
            AggFn::Sum => write!(f, "sum"),
            AggFn::Mean => write!(f, "mean"),
            AggFn::Min => write!(f, "min"),
            AggFn::Max => write!(f, "max"),
        }
    }
}

/// Row, column and value fields of a pivot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PivotSpec {
    pub row: LogColumn,
    pub column: LogColumn,
    pub value: LogColumn,
    pub func: AggFn,
}

/// Running reduction for one cell
#[derive(Debug, Clone, Copy)]
struct Accumulator {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    fn finish(&self, func: AggFn) -> f64 {
        match func {
            AggFn::Count => self.count as f64,
            AggFn::Sum => self.sum,
            AggFn::Mean => self.sum / self.count as f64,
            AggFn::Min => self.min,
            AggFn::Max => self.max,
        }
    }
}

/// Result grid: `cells[r][c]` belongs to `row_keys[r]` and `column_keys[c]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub spec: PivotSpec,
    pub row_keys: Vec<String>,
    pub column_keys: Vec<String>,
    pub cells: Vec<Vec<f64>>,
}

impl PivotTable {
    pub fn get(&self, row_key: &str, column_key: &str) -> Option<f64> {
        let r = self.row_keys.iter().position(|k| k == row_key)?;
        let c = self.column_keys.iter().position(|k| k == column_key)?;
        Some(self.cells[r][c])
    }

    pub fn is_empty(&self) -> bool {
        self.row_keys.is_empty()
    }
}

/// Group rows by (row field, column field) and reduce the value field.
///
/// Keys are sorted on both axes and combinations with no rows are filled
/// with 0. Every function except `count` needs the value field to parse as
/// a number; the first row that does not is reported by its file line.
pub fn aggregate<'a, I>(rows: I, spec: PivotSpec) -> StoreResult<PivotTable>
where
    I: IntoIterator<Item = &'a LogRow>,
{
    let mut groups: BTreeMap<(String, String), Accumulator> = BTreeMap::new();
    let mut row_keys = BTreeSet::new();
    let mut column_keys = BTreeSet::new();

    for row in rows {
        let value = if spec.func.is_numeric() {
            let raw = row.get(spec.value);
            raw.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| StoreError::AggregationType {
                    line: row.line,
                    column: spec.value.header().to_string(),
                    value: raw.to_string(),
                })?
        } else {
            0.0
        };

        let row_key = row.get(spec.row).to_string();
        let column_key = row.get(spec.column).to_string();
        row_keys.insert(row_key.clone());
        column_keys.insert(column_key.clone());
        groups
            .entry((row_key, column_key))
            .or_insert_with(Accumulator::new)
            .push(value);
    }

    let row_keys: Vec<String> = row_keys.into_iter().collect();
    let column_keys: Vec<String> = column_keys.into_iter().collect();
    let cells = row_keys
        .iter()
        .map(|r| {
            column_keys
                .iter()
                .map(|c| {
                    groups
                        .get(&(r.clone(), c.clone()))
                        .map_or(0.0, |acc| acc.finish(spec.func))
                })
                .collect()
        })
        .collect();

    tracing::debug!(
        rows = row_keys.len(),
        columns = column_keys.len(),
        func = %spec.func,
        "built pivot table"
    );
    Ok(PivotTable {
        spec,
        row_keys,
        column_keys,
        cells,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query::tests::{row, sample_rows};

    fn spec(row: LogColumn, column: LogColumn, value: LogColumn, func: AggFn) -> PivotSpec {
        PivotSpec {
            row,
            column,
            value,
            func,
        }
    }

    #[test]
    fn test_count_by_fixture_and_status() {
        let rows = vec![
            row(2, ["2024-03-04", "M1", "OP10", "F1", "A1", "Clamp", "Torque", "10", "W", "10.1", "", "OK"]),
            row(3, ["2024-03-04", "M1", "OP10", "F1", "A2", "Pin", "Dia", "6", "M", "6.0", "", "OK"]),
            row(4, ["2024-03-04", "M1", "OP10", "F1", "A3", "Stop", "Height", "5", "H", "5.2", "", "NG"]),
        ];
        let table = aggregate(
            &rows,
            spec(LogColumn::Fixture, LogColumn::Status, LogColumn::Accessory, AggFn::Count),
        )
        .unwrap();

        assert_eq!(table.row_keys, vec!["F1"]);
        assert_eq!(table.column_keys, vec!["NG", "OK"]);
        assert_eq!(table.get("F1", "OK"), Some(2.0));
        assert_eq!(table.get("F1", "NG"), Some(1.0));
    }

    #[test]
    fn test_missing_combinations_filled_with_zero() {
        let rows = sample_rows();
        let table = aggregate(
            &rows,
            spec(LogColumn::Fixture, LogColumn::Status, LogColumn::Observation, AggFn::Sum),
        )
        .unwrap();

        assert_eq!(table.row_keys, vec!["F1", "F2"]);
        assert_eq!(table.get("F2", "OK"), Some(0.0));
        assert_eq!(table.get("F2", "NG"), Some(8.2));
        let f1_ok = table.get("F1", "OK").unwrap();
        assert!((f1_ok - 16.11).abs() < 1e-9);
    }

    #[test]
    fn test_mean_min_max() {
        let rows = sample_rows();
        let torque: Vec<&LogRow> = rows
            .iter()
            .filter(|r| r.get(LogColumn::Parameter) == "Torque")
            .collect();

        let by = |func| {
            aggregate(
                torque.iter().copied(),
                spec(LogColumn::Accessory, LogColumn::Parameter, LogColumn::Observation, func),
            )
            .unwrap()
            .get("A1", "Torque")
            .unwrap()
        };
        assert!((by(AggFn::Mean) - 9.9).abs() < 1e-9);
        assert_eq!(by(AggFn::Min), 9.7);
        assert_eq!(by(AggFn::Max), 10.1);
        assert_eq!(by(AggFn::Count), 2.0);
    }

    #[test]
    fn test_non_numeric_value_names_row() {
        let rows = sample_rows();
        let err = aggregate(
            &rows,
            spec(LogColumn::Fixture, LogColumn::Status, LogColumn::Accessory, AggFn::Sum),
        )
        .unwrap_err();
        match err {
            StoreError::AggregationType { line, column, value } => {
                assert_eq!(line, 2);
                assert_eq!(column, "Accessory No.");
                assert_eq!(value, "A1");
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_observation_is_rejected() {
        for bad in ["nan", "inf", "-Infinity"] {
            let rows = vec![
                row(2, ["2024-03-04", "M1", "OP10", "F1", "A1", "Clamp", "Torque", "10", "Wrench", "10.1", "", "OK"]),
                row(3, ["2024-03-04", "M1", "OP10", "F1", "A1", "Clamp", "Torque", "10", "Wrench", bad, "", "OK"]),
            ];
            let err = aggregate(
                &rows,
                spec(LogColumn::Accessory, LogColumn::Parameter, LogColumn::Observation, AggFn::Mean),
            )
            .unwrap_err();
            match err {
                StoreError::AggregationType { line, value, .. } => {
                    assert_eq!(line, 3);
                    assert_eq!(value, bad);
                }
                other => panic!("unexpected variant: {:?}", other),
            }
        }
    }

    #[test]
    fn test_count_accepts_any_value() {
        let rows = sample_rows();
        let table = aggregate(
            &rows,
            spec(LogColumn::Date, LogColumn::Machine, LogColumn::Remark, AggFn::Count),
        )
        .unwrap();
        assert_eq!(table.get("2024-03-05", "M1"), Some(2.0));
        assert_eq!(table.get("2024-03-05", "M2"), Some(0.0));
    }

    #[test]
    fn test_no_rows_gives_empty_table() {
        let rows: Vec<LogRow> = Vec::new();
        let table = aggregate(
            &rows,
            spec(LogColumn::Fixture, LogColumn::Status, LogColumn::Observation, AggFn::Mean),
        )
        .unwrap();
        assert!(table.is_empty());
        assert!(table.cells.is_empty());
    }
}
