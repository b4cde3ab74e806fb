//! Rendering of tabular command output
//!
//! Commands build a [`Table`] of display strings and hand it, together with
//! the underlying serializable data, to [`emit`]. Tabular formats render the
//! table; JSON and YAML serialize the data.

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use crate::cli::OutputFormat;

/// Display-ready rows with a header
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Aligned columns, bold header, dashed rule
    pub fn to_tsv(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.chars().count());
                }
            }
        }

        let pad = |s: &str, width: usize| {
            let fill = width.saturating_sub(s.chars().count());
            format!("{}{}", s, " ".repeat(fill))
        };

        let mut out = String::new();
        let header_line = self
            .headers
            .iter()
            .zip(&widths)
            .map(|(h, w)| style(pad(h, *w)).bold().to_string())
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(header_line.trim_end());
        out.push('\n');

        let total_width: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
        out.push_str(&"-".repeat(total_width));
        out.push('\n');

        for row in &self.rows {
            let line = row
                .iter()
                .zip(&widths)
                .map(|(cell, w)| pad(cell, *w))
                .collect::<Vec<_>>()
                .join("  ");
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }

    /// RFC 4180 CSV with a header row
    pub fn to_csv(&self) -> Result<String> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(&self.headers).into_diagnostic()?;
        for row in &self.rows {
            wtr.write_record(row).into_diagnostic()?;
        }
        let bytes = wtr.into_inner().into_diagnostic()?;
        String::from_utf8(bytes).into_diagnostic()
    }

    pub fn to_markdown(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(self.headers.clone());
        for row in &self.rows {
            builder.push_record(row.clone());
        }
        builder.build().with(Style::markdown()).to_string()
    }
}

/// Render `table` or `data` in the requested format and print it
pub fn emit<T: Serialize + ?Sized>(format: OutputFormat, table: &Table, data: &T) -> Result<()> {
    print!("{}", render(format, table, data)?);
    Ok(())
}

/// Print the "N item(s) found." summary under a human-readable table
pub fn footer(format: OutputFormat, quiet: bool, count: usize, noun: &str) {
    if quiet || !matches!(format, OutputFormat::Auto | OutputFormat::Tsv) {
        return;
    }
    println!();
    println!("{} {}(s) found.", style(count).cyan(), noun);
}

/// Print the empty-result message, or an empty document for data formats
pub fn empty(format: OutputFormat, message: &str, hint: Option<&str>) {
    match format {
        OutputFormat::Json | OutputFormat::Yaml => println!("[]"),
        OutputFormat::Csv => {}
        _ => {
            println!("{}", message);
            if let Some(hint) = hint {
                println!();
                println!("{}", hint);
            }
        }
    }
}

/// Render `table` or `data` in the requested format
pub fn render<T: Serialize + ?Sized>(format: OutputFormat, table: &Table, data: &T) -> Result<String> {
    Ok(match format {
        OutputFormat::Auto | OutputFormat::Tsv => table.to_tsv(),
        OutputFormat::Csv => table.to_csv()?,
        OutputFormat::Md => format!("{}\n", table.to_markdown()),
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(data).into_diagnostic()?),
        OutputFormat::Yaml => serde_yml::to_string(data).into_diagnostic()?,
    })
}
