//! `fxl measure` command - record an inspection session
//!
//! Observations are entered either interactively, accessory by accessory, or
//! from a YAML sheet:
//!
//! ```yaml
//! machine: M1
//! operation: OP10
//! date: 2024-05-01
//! accessories:
//!   - accessory: A1
//!     status: NG
//!     observations:
//!       - parameter: Torque
//!         observation: "10.1"
//!         remark: retightened
//!         status: OK
//! ```
//!
//! Flags given on the command line take precedence over the sheet header.

use chrono::NaiveDate;
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use miette::{IntoDiagnostic, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::helpers::{open_workspace, truncate_str};
use crate::cli::GlobalOpts;
use crate::core::{MeasurementSession, ObservationLog, StoreError};
use crate::entities::{ObservationGroup, ObservationKey, SessionMeta, Status};

#[derive(clap::Args, Debug)]
pub struct MeasureArgs {
    /// Fixture number
    pub fixture: String,

    /// Machine number
    #[arg(long, short = 'm')]
    pub machine: Option<String>,

    /// Operation
    #[arg(long, short = 'o')]
    pub operation: Option<String>,

    /// Inspection date (YYYY-MM-DD, default: today)
    #[arg(long, short = 'd')]
    pub date: Option<NaiveDate>,

    /// Read observations from a YAML sheet instead of prompting
    #[arg(long, short = 'i')]
    pub input: Option<PathBuf>,
}

/// Observations for a whole session, as read from `--input`
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Sheet {
    #[serde(default)]
    machine: Option<String>,
    #[serde(default)]
    operation: Option<String>,
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    accessories: Vec<SheetAccessory>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SheetAccessory {
    accessory: String,
    /// Group status; overrides the one derived from the rows
    #[serde(default)]
    status: Option<Status>,
    #[serde(default)]
    observations: Vec<SheetObservation>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SheetObservation {
    parameter: String,
    #[serde(default)]
    observation: String,
    #[serde(default)]
    remark: String,
    #[serde(default)]
    status: Option<Status>,
}

pub fn run(args: MeasureArgs, global: &GlobalOpts) -> Result<()> {
    let (_, workspace) = open_workspace(global)?;
    let catalog = workspace.catalog().load()?;
    let log = workspace.observation_log();

    let sheet = match &args.input {
        Some(path) => Some(read_sheet(path)?),
        None => None,
    };
    let interactive = sheet.is_none();
    let sheet = sheet.unwrap_or_default();

    let meta = session_meta(&args, &sheet, interactive)?;
    let mut session = MeasurementSession::start(&catalog, &args.fixture, meta)?;

    let submitted = if interactive {
        run_interactive(&mut session, &log)?
    } else {
        apply_sheet(&mut session, &sheet)?;
        Some(session.submit(&log)?)
    };

    match submitted {
        Some(rows) if !global.quiet => println!(
            "{} Appended {} observation rows for fixture {} to {}",
            style("✓").green(),
            rows,
            style(&args.fixture).cyan(),
            style(log.path().display()).dim()
        ),
        Some(_) => {}
        None if !global.quiet => println!("{}", style("Nothing submitted.").dim()),
        None => {}
    }
    Ok(())
}

fn read_sheet(path: &Path) -> Result<Sheet> {
    let contents = fs::read_to_string(path)
        .map_err(|e| StoreError::from_io(e, path))?;
    serde_yml::from_str(&contents)
        .map_err(|e| miette::miette!("Invalid observation sheet {}: {}", path.display(), e))
}

/// Machine, operation and date from flags, then the sheet, then prompts
fn session_meta(args: &MeasureArgs, sheet: &Sheet, interactive: bool) -> Result<SessionMeta> {
    let theme = ColorfulTheme::default();
    let prompt_for = |label: &str, value: Option<String>| -> Result<String> {
        match value {
            Some(v) => Ok(v),
            None if interactive => Input::with_theme(&theme)
                .with_prompt(label)
                .interact_text()
                .into_diagnostic(),
            None => Err(StoreError::incomplete(format!("{} is required", label)).into()),
        }
    };

    let machine = prompt_for("Machine No.", args.machine.clone().or_else(|| sheet.machine.clone()))?;
    let operation = prompt_for("Operation", args.operation.clone().or_else(|| sheet.operation.clone()))?;
    let date = args
        .date
        .or(sheet.date)
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    Ok(SessionMeta {
        date,
        machine,
        operation,
    })
}

/// Fill and cache every accessory listed in the sheet
fn apply_sheet(session: &mut MeasurementSession, sheet: &Sheet) -> Result<()> {
    for acc in &sheet.accessories {
        let group = session.open(&acc.accessory)?;
        let parameters: Vec<String> = group.entries.iter().map(|e| e.parameter.clone()).collect();

        for obs in &acc.observations {
            let index = parameters
                .iter()
                .position(|p| p == &obs.parameter)
                .ok_or_else(|| {
                    miette::miette!(
                        help = format!("known parameters: {}", parameters.join(", ")),
                        "Accessory '{}' has no parameter '{}'",
                        acc.accessory,
                        obs.parameter
                    )
                })?;
            session.set_observation(index, &obs.observation)?;
            session.set_remark(index, &obs.remark)?;
            if let Some(status) = obs.status {
                session.set_row_status(index, status)?;
            }
        }

        if let Some(wanted) = acc.status {
            let current = session.working().map(|g| g.status);
            if current != Some(wanted) {
                session.toggle_status()?;
            }
        }
        session.cache()?;
    }
    Ok(())
}

/// Menu-driven session; returns the number of rows appended, if submitted
fn run_interactive(session: &mut MeasurementSession, log: &ObservationLog) -> Result<Option<usize>> {
    let theme = ColorfulTheme::default();
    let accessories: Vec<(String, String)> = session
        .accessories()
        .map(|(n, name)| (n.to_string(), name.to_string()))
        .collect();

    loop {
        let mut items: Vec<String> = accessories
            .iter()
            .map(|(number, name)| {
                let key = ObservationKey::new(session.fixture_number(), number);
                let marker = match session.restore(&key) {
                    Some(group) => format!("[{}]", group.status),
                    None => "[ ]".to_string(),
                };
                format!("{} {} - {}", marker, number, name)
            })
            .collect();
        items.push(format!("Submit ({} saved)", session.cached_len()));
        items.push("Quit".to_string());

        let choice = Select::with_theme(&theme)
            .with_prompt(format!("Fixture {}", session.fixture_number()))
            .items(&items[..])
            .default(0)
            .interact()
            .into_diagnostic()?;

        if choice < accessories.len() {
            edit_accessory(session, &accessories[choice].0, &theme)?;
        } else if choice == accessories.len() {
            match session.submit(log) {
                Ok(rows) => return Ok(Some(rows)),
                Err(e @ StoreError::IncompleteData { .. }) => {
                    eprintln!("{} {}", style("!").yellow(), e);
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            if session.cached_len() > 0 {
                let leave = Confirm::with_theme(&theme)
                    .with_prompt("Discard saved observations and quit?")
                    .default(false)
                    .interact()
                    .into_diagnostic()?;
                if !leave {
                    continue;
                }
            }
            return Ok(None);
        }
    }
}

fn edit_accessory(session: &mut MeasurementSession, accessory: &str, theme: &ColorfulTheme) -> Result<()> {
    session.open(accessory)?;

    loop {
        let Some(group) = session.working() else {
            return Ok(());
        };
        print_group(accessory, group);

        let mut items: Vec<String> = group
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| {
                format!(
                    "{}. {} [{}]",
                    i + 1,
                    truncate_str(&e.parameter, 30),
                    if e.observation.is_empty() { "-" } else { e.observation.as_str() }
                )
            })
            .collect();
        let rows = items.len();
        items.push(format!("Toggle status ({})", group.status));
        items.push("Save".to_string());
        items.push("Back".to_string());

        let choice = Select::with_theme(theme)
            .with_prompt(format!("Accessory {}", accessory))
            .items(&items[..])
            .default(0)
            .interact()
            .into_diagnostic()?;

        if choice < rows {
            edit_row(session, choice, theme)?;
        } else if choice == rows {
            session.toggle_status()?;
        } else if choice == rows + 1 {
            session.cache()?;
            return Ok(());
        } else {
            if session.is_dirty() {
                let keep = Confirm::with_theme(theme)
                    .with_prompt(format!("Save changes to accessory {}?", accessory))
                    .default(true)
                    .interact()
                    .into_diagnostic()?;
                if keep {
                    session.cache()?;
                } else {
                    session.discard();
                }
            }
            return Ok(());
        }
    }
}

fn edit_row(session: &mut MeasurementSession, index: usize, theme: &ColorfulTheme) -> Result<()> {
    let Some(entry) = session.working().and_then(|g| g.entries.get(index)).cloned() else {
        return Ok(());
    };

    println!(
        "  {} {}  {}",
        style(&entry.parameter).bold(),
        style(&entry.specification).dim(),
        style(&entry.inspection_instrument).dim()
    );
    let observation: String = Input::with_theme(theme)
        .with_prompt("Observation")
        .with_initial_text(entry.observation.clone())
        .allow_empty(true)
        .interact_text()
        .into_diagnostic()?;
    let remark: String = Input::with_theme(theme)
        .with_prompt("Remark")
        .with_initial_text(entry.remark.clone())
        .allow_empty(true)
        .interact_text()
        .into_diagnostic()?;

    let statuses = ["OK", "NG", "(unchanged)"];
    let status = Select::with_theme(theme)
        .with_prompt("Status")
        .items(&statuses[..])
        .default(match entry.status {
            Some(Status::Ok) => 0,
            Some(Status::Ng) => 1,
            None => 2,
        })
        .interact()
        .into_diagnostic()?;

    session.set_observation(index, observation)?;
    session.set_remark(index, remark)?;
    match status {
        0 => session.set_row_status(index, Status::Ok)?,
        1 => session.set_row_status(index, Status::Ng)?,
        _ => {}
    }
    Ok(())
}

fn print_group(accessory: &str, group: &ObservationGroup) {
    println!();
    let status = match group.status {
        Status::Ok => style(group.status.as_str()).green(),
        Status::Ng => style(group.status.as_str()).red(),
    };
    println!(
        "{} {}  {}",
        style(accessory).cyan().bold(),
        style(&group.accessory_name).bold(),
        status
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CatalogKey, CatalogStore};
    use crate::entities::FixtureRecord;
    use tempfile::tempdir;

    fn session(dir: &Path) -> MeasurementSession {
        let store = CatalogStore::new(dir.join("catalog.csv"), CatalogKey::Accessory);
        let mut fixture = FixtureRecord::new("F1", "Weld Jig").unwrap();
        let acc = fixture.add_accessory("A1", "Clamp").unwrap();
        acc.push_parameter("Torque", "10 Nm", "Wrench");
        acc.push_parameter("Gap", "0.2", "Feeler");
        store.merge_save(&fixture).unwrap();

        let meta = SessionMeta {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            machine: "M1".to_string(),
            operation: "OP10".to_string(),
        };
        MeasurementSession::start(&store.load().unwrap(), "F1", meta).unwrap()
    }

    fn sheet(yaml: &str) -> Sheet {
        serde_yml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_apply_sheet_caches_rows() {
        let tmp = tempdir().unwrap();
        let mut session = session(tmp.path());
        let sheet = sheet(
            "accessories:\n  - accessory: A1\n    observations:\n      - parameter: Gap\n        observation: \"0.21\"\n        status: OK\n      - parameter: Torque\n        observation: \"10.1\"\n        status: OK\n",
        );

        apply_sheet(&mut session, &sheet).unwrap();

        let (_, group) = session.cached().next().unwrap();
        assert_eq!(group.entries[0].observation, "10.1");
        assert_eq!(group.entries[1].observation, "0.21");
        assert_eq!(group.status, Status::Ok);
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_apply_sheet_group_status_override() {
        let tmp = tempdir().unwrap();
        let mut session = session(tmp.path());
        let sheet = sheet(
            "accessories:\n  - accessory: A1\n    status: NG\n    observations:\n      - parameter: Torque\n        status: OK\n      - parameter: Gap\n        status: OK\n",
        );

        apply_sheet(&mut session, &sheet).unwrap();

        let (_, group) = session.cached().next().unwrap();
        assert_eq!(group.status, Status::Ng);
        assert!(group.entries.iter().all(|e| e.status == Some(Status::Ng)));
    }

    #[test]
    fn test_apply_sheet_unknown_parameter() {
        let tmp = tempdir().unwrap();
        let mut session = session(tmp.path());
        let sheet = sheet(
            "accessories:\n  - accessory: A1\n    observations:\n      - parameter: Width\n",
        );
        assert!(apply_sheet(&mut session, &sheet).is_err());
    }

    #[test]
    fn test_session_meta_prefers_flags() {
        let args = MeasureArgs {
            fixture: "F1".to_string(),
            machine: Some("M9".to_string()),
            operation: None,
            date: None,
            input: None,
        };
        let sheet = sheet("machine: M1\noperation: OP10\ndate: 2024-05-01\n");
        let meta = session_meta(&args, &sheet, false).unwrap();
        assert_eq!(meta.machine, "M9");
        assert_eq!(meta.operation, "OP10");
        assert_eq!(meta.date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
    }

    #[test]
    fn test_session_meta_missing_machine() {
        let args = MeasureArgs {
            fixture: "F1".to_string(),
            machine: None,
            operation: Some("OP10".to_string()),
            date: None,
            input: None,
        };
        assert!(session_meta(&args, &Sheet::default(), false).is_err());
    }
}
