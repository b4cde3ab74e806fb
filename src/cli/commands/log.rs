//! `fxl log` command - browse, filter and pivot the observation log

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::cli::helpers::{open_workspace, resolve_format};
use crate::cli::output::{emit, empty, footer, Table};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{aggregate, distinct_values, filter, load_log, AggFn, LogFilter, LogRow, PivotSpec, PivotTable};
use crate::entities::{status_aggregate_str, LogColumn, Status};

#[derive(Subcommand, Debug)]
pub enum LogCommands {
    /// List observation rows
    List(ListArgs),

    /// Distinct values of one column, sorted
    Values(ValuesArgs),

    /// Group rows by two columns and aggregate a third
    Pivot(PivotArgs),
}

/// Row filters shared by every log subcommand
#[derive(clap::Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only rows for this fixture number
    #[arg(long)]
    pub fixture: Option<String>,

    /// Only rows for these machines (repeatable)
    #[arg(long = "machine")]
    pub machines: Vec<String>,

    /// Only rows for these accessory numbers (repeatable)
    #[arg(long = "accessory")]
    pub accessories: Vec<String>,

    /// Only rows recorded on these dates, YYYY-MM-DD (repeatable)
    #[arg(long = "date")]
    pub dates: Vec<String>,

    /// Only rows where COLUMN equals VALUE (repeatable; values for the same column are OR-ed)
    #[arg(long = "where", value_name = "COLUMN=VALUE", value_parser = parse_where)]
    pub conditions: Vec<(LogColumn, String)>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> LogFilter {
        let mut predicates = LogFilter::default()
            .machines(self.machines.iter().cloned())
            .accessories(self.accessories.iter().cloned())
            .dates(self.dates.iter().cloned());
        if let Some(fixture) = &self.fixture {
            predicates = predicates.fixture(fixture);
        }

        let mut by_column: BTreeMap<LogColumn, Vec<String>> = BTreeMap::new();
        for (column, value) in &self.conditions {
            by_column.entry(*column).or_default().push(value.clone());
        }
        for (column, values) in by_column {
            predicates = predicates.column(column, values);
        }
        predicates
    }
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Show only the last N matching rows
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

#[derive(clap::Args, Debug)]
pub struct ValuesArgs {
    /// Column to list (CLI name or file heading, e.g. machine or "Machine No.")
    #[arg(value_parser = parse_column)]
    pub column: LogColumn,

    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(clap::Args, Debug)]
pub struct PivotArgs {
    /// Column whose values become the table rows
    #[arg(long, value_parser = parse_column)]
    pub rows: LogColumn,

    /// Column whose values become the table columns
    #[arg(long, value_parser = parse_column)]
    pub cols: LogColumn,

    /// Column to aggregate
    #[arg(long, value_parser = parse_column, default_value = "status")]
    pub values: LogColumn,

    /// Aggregation function
    #[arg(long, value_enum, default_value_t = AggFn::Count)]
    pub agg: AggFn,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Also write the pivot table to this CSV file
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(cmd: LogCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        LogCommands::List(args) => run_list(args, global),
        LogCommands::Values(args) => run_values(args, global),
        LogCommands::Pivot(args) => run_pivot(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (config, workspace) = open_workspace(global)?;
    let format = resolve_format(global, &config, OutputFormat::Tsv);
    let log = load_log(workspace.log_path())?;

    let mut rows = filter(&log.rows, &args.filter.to_filter());
    if let Some(limit) = args.limit {
        let skip = rows.len().saturating_sub(limit);
        rows.drain(..skip);
    }

    if rows.is_empty() {
        empty(
            format,
            "No observations found.",
            Some(&format!(
                "Record some with: {}",
                style("fxl measure <FIXTURE> --machine <M> --operation <OP>").yellow()
            )),
        );
        return Ok(());
    }

    let mut table = Table::new(LogColumn::ALL.map(|c| c.header()));
    for row in &rows {
        table.push(row.values().iter().cloned());
    }
    emit(format, &table, &rows)?;
    footer(format, global.quiet, rows.len(), "observation");
    if !global.quiet && matches!(format, OutputFormat::Auto | OutputFormat::Tsv) {
        let overall = match overall_status(&rows) {
            Status::Ok => style(Status::Ok.as_str()).green(),
            Status::Ng => style(Status::Ng.as_str()).red(),
        };
        println!("Overall status: {}", overall);
    }
    Ok(())
}

/// OK only when every listed row is OK
fn overall_status(rows: &[&LogRow]) -> Status {
    status_aggregate_str(rows.iter().map(|row| row.get(LogColumn::Status)))
}

fn run_values(args: ValuesArgs, global: &GlobalOpts) -> Result<()> {
    let (config, workspace) = open_workspace(global)?;
    let format = resolve_format(global, &config, OutputFormat::Tsv);
    let log = load_log(workspace.log_path())?;

    let rows = filter(&log.rows, &args.filter.to_filter());
    let values = distinct_values(rows.iter().copied(), args.column);

    if values.is_empty() {
        empty(format, "No values found.", None);
        return Ok(());
    }

    let mut table = Table::new([args.column.header()]);
    for value in &values {
        table.push([value.as_str()]);
    }
    emit(format, &table, &values)?;
    footer(format, global.quiet, values.len(), "value");
    Ok(())
}

fn run_pivot(args: PivotArgs, global: &GlobalOpts) -> Result<()> {
    let (config, workspace) = open_workspace(global)?;
    let format = resolve_format(global, &config, OutputFormat::Md);
    let log = load_log(workspace.log_path())?;

    let rows: Vec<&LogRow> = filter(&log.rows, &args.filter.to_filter());
    let spec = PivotSpec {
        row: args.rows,
        column: args.cols,
        value: args.values,
        func: args.agg,
    };
    let pivot = aggregate(rows.iter().copied(), spec)?;

    if pivot.is_empty() {
        empty(format, "No observations match the filters.", None);
        return Ok(());
    }

    let table = pivot_table(&pivot);
    if let Some(path) = &args.output {
        fs::write(path, table.to_csv()?).into_diagnostic()?;
        if !global.quiet {
            eprintln!(
                "{} Wrote pivot table to {}",
                style("✓").green(),
                style(path.display()).cyan()
            );
        }
    }
    emit(format, &table, &pivot)
}

/// Lay a pivot out as a table: row keys down the side, column keys across
fn pivot_table(pivot: &PivotTable) -> Table {
    let corner = format!(
        "{} \\ {}",
        pivot.spec.row.header(),
        pivot.spec.column.header()
    );
    let mut table = Table::new(
        std::iter::once(corner).chain(pivot.column_keys.iter().map(|k| display_key(k))),
    );
    for (key, cells) in pivot.row_keys.iter().zip(&pivot.cells) {
        table.push(
            std::iter::once(display_key(key)).chain(cells.iter().map(|v| format_number(*v))),
        );
    }
    table
}

fn display_key(key: &str) -> String {
    if key.is_empty() {
        "(blank)".to_string()
    } else {
        key.to_string()
    }
}

/// Whole numbers without a fraction, others to at most four decimals
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        let s = format!("{:.4}", value);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

fn parse_column(s: &str) -> Result<LogColumn, String> {
    s.parse()
}

/// Parse `COLUMN=VALUE`; the value may be empty to match blank cells
fn parse_where(s: &str) -> Result<(LogColumn, String), String> {
    let (column, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=VALUE, got '{}'", s))?;
    Ok((column.trim().parse()?, value.to_string()))
}
