//! `fxl fixture` command - fixture catalog management

use clap::Subcommand;
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{open_workspace, parse_accessory_spec, parse_param_spec, resolve_format, ParamSpec};
use crate::cli::output::{emit, empty, footer, Table};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{CatalogStore, StoreError};
use crate::entities::{FixtureRecord, ParameterColumn};

#[derive(Subcommand, Debug)]
pub enum FixtureCommands {
    /// List fixtures with their accessory and parameter counts
    List,

    /// Show the parameter grid of a fixture
    Show(ShowArgs),

    /// Register a fixture, replacing any stored version
    New(NewArgs),

    /// Change a stored fixture's name
    Rename(RenameArgs),

    /// Accessory management
    #[command(subcommand)]
    Accessory(AccessoryCommands),

    /// Inspection parameter management
    #[command(subcommand)]
    Param(ParamCommands),
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Fixture number
    pub fixture: String,

    /// Only show this accessory
    #[arg(long, short = 'a')]
    pub accessory: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Fixture number
    pub fixture: String,

    /// Fixture name
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// Accessory as NUMBER=NAME (repeatable)
    #[arg(long = "accessory", short = 'a', value_parser = parse_accessory_spec)]
    pub accessories: Vec<(String, String)>,

    /// Parameter as "ACCESSORY|PARAMETER|SPECIFICATION|INSTRUMENT" (repeatable)
    #[arg(long = "param", short = 'p', value_parser = parse_param_spec)]
    pub params: Vec<ParamSpec>,

    /// Prompt for the name, accessories and parameters
    #[arg(long, short = 'i')]
    pub interactive: bool,
}

#[derive(clap::Args, Debug)]
pub struct RenameArgs {
    /// Fixture number
    pub fixture: String,

    /// New fixture name
    pub name: String,
}

#[derive(Subcommand, Debug)]
pub enum AccessoryCommands {
    /// Add an accessory to a stored fixture
    Add(AccessoryAddArgs),

    /// Change an accessory's name
    Rename(AccessoryRenameArgs),
}

#[derive(clap::Args, Debug)]
pub struct AccessoryAddArgs {
    /// Fixture number
    pub fixture: String,

    /// Accessory as NUMBER=NAME
    #[arg(value_parser = parse_accessory_spec)]
    pub accessory: (String, String),

    /// Parameter as "PARAMETER|SPECIFICATION|INSTRUMENT" (repeatable)
    #[arg(long = "param", short = 'p', value_parser = parse_row_spec)]
    pub params: Vec<(String, String, String)>,
}

#[derive(clap::Args, Debug)]
pub struct AccessoryRenameArgs {
    /// Fixture number
    pub fixture: String,

    /// Accessory number
    pub accessory: String,

    /// New accessory name
    pub name: String,
}

#[derive(Subcommand, Debug)]
pub enum ParamCommands {
    /// Append a parameter row to an accessory
    Add(ParamAddArgs),

    /// Overwrite one cell of an accessory's parameter grid
    Set(ParamSetArgs),
}

#[derive(clap::Args, Debug)]
pub struct ParamAddArgs {
    /// Fixture number
    pub fixture: String,

    /// Accessory number
    pub accessory: String,

    /// Parameter name
    #[arg(long)]
    pub parameter: String,

    /// Specification
    #[arg(long, visible_alias = "spec")]
    pub specification: String,

    /// Inspection instrument
    #[arg(long, visible_alias = "instrument")]
    pub inspection_instrument: String,
}

#[derive(clap::Args, Debug)]
pub struct ParamSetArgs {
    /// Fixture number
    pub fixture: String,

    /// Accessory number
    pub accessory: String,

    /// Row serial number (1-based)
    pub serial: usize,

    /// Column to edit
    #[arg(value_enum)]
    pub column: ParameterColumn,

    /// New value
    pub value: String,
}

pub fn run(cmd: FixtureCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        FixtureCommands::List => run_list(global),
        FixtureCommands::Show(args) => run_show(args, global),
        FixtureCommands::New(args) => run_new(args, global),
        FixtureCommands::Rename(args) => run_rename(args, global),
        FixtureCommands::Accessory(AccessoryCommands::Add(args)) => run_accessory_add(args, global),
        FixtureCommands::Accessory(AccessoryCommands::Rename(args)) => {
            run_accessory_rename(args, global)
        }
        FixtureCommands::Param(ParamCommands::Add(args)) => run_param_add(args, global),
        FixtureCommands::Param(ParamCommands::Set(args)) => run_param_set(args, global),
    }
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let (config, workspace) = open_workspace(global)?;
    let format = resolve_format(global, &config, OutputFormat::Tsv);
    let catalog = workspace.catalog().load_or_default()?;
    let fixtures = catalog.fixtures();

    if fixtures.is_empty() {
        empty(
            format,
            "No fixtures found.",
            Some(&format!(
                "Create one with: {}",
                style("fxl fixture new <FIXTURE> --name <NAME>").yellow()
            )),
        );
        return Ok(());
    }

    let mut table = Table::new(["Fixture", "Name", "Accessories", "Parameters"]);
    for f in &fixtures {
        table.push([
            f.number.clone(),
            f.name.clone(),
            f.accessories.to_string(),
            f.parameters.to_string(),
        ]);
    }
    emit(format, &table, &fixtures)?;
    footer(format, global.quiet, fixtures.len(), "fixture");
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (config, workspace) = open_workspace(global)?;
    let format = resolve_format(global, &config, OutputFormat::Tsv);
    let catalog = workspace.catalog().load()?;
    let mut fixture = catalog.require_fixture(&args.fixture)?;

    if let Some(acc) = &args.accessory {
        let selected = fixture.accessory_mut(acc)?.clone();
        fixture.accessories = vec![selected];
    }

    if !global.quiet && matches!(format, OutputFormat::Auto | OutputFormat::Tsv) {
        println!(
            "{} {}",
            style(&fixture.number).cyan().bold(),
            style(&fixture.name).bold()
        );
        println!();
    }

    let mut table = Table::new([
        "Accessory",
        "Accessory Name",
        "S.No",
        ParameterColumn::Parameter.header(),
        ParameterColumn::Specification.header(),
        ParameterColumn::InspectionInstrument.header(),
    ]);
    for accessory in &fixture.accessories {
        for row in accessory.rows() {
            table.push([
                accessory.number.clone(),
                accessory.name.clone(),
                row.serial.to_string(),
                row.parameter.clone(),
                row.specification.clone(),
                row.inspection_instrument.clone(),
            ]);
        }
    }
    emit(format, &table, &fixture)?;
    footer(format, global.quiet, table.len(), "parameter");
    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let (_, workspace) = open_workspace(global)?;
    let store = workspace.catalog();

    let fixture = if args.interactive {
        build_interactively(&args)?
    } else {
        build_from_args(&args)?
    };

    let catalog = store.load_or_default()?;
    for accessory in &fixture.accessories {
        catalog.check_accessory_free(&fixture.number, &accessory.number)?;
    }
    if catalog.fixture(&fixture.number).is_some() {
        tracing::info!(fixture = %fixture.number, "replacing stored fixture");
    }

    save(&store, &fixture, global)
}

fn build_from_args(args: &NewArgs) -> Result<FixtureRecord> {
    let name = args.name.clone().ok_or_else(|| {
        miette::miette!(
            help = "pass --name or use --interactive",
            "Fixture name is required"
        )
    })?;
    let mut fixture = FixtureRecord::new(&args.fixture, name)?;
    for (number, name) in &args.accessories {
        fixture.add_accessory(number, name)?;
    }
    for p in &args.params {
        fixture
            .accessory_mut(&p.accessory)?
            .push_parameter(&p.parameter, &p.specification, &p.instrument);
    }
    Ok(fixture)
}

fn build_interactively(args: &NewArgs) -> Result<FixtureRecord> {
    let theme = ColorfulTheme::default();

    let name: String = match &args.name {
        Some(name) => name.clone(),
        None => Input::with_theme(&theme)
            .with_prompt("Fixture name")
            .interact_text()
            .into_diagnostic()?,
    };
    let mut fixture = build_from_args(&NewArgs {
        fixture: args.fixture.clone(),
        name: Some(name),
        accessories: args.accessories.clone(),
        params: args.params.clone(),
        interactive: false,
    })?;

    loop {
        let number: String = Input::with_theme(&theme)
            .with_prompt("Accessory number (blank to finish)")
            .allow_empty(true)
            .interact_text()
            .into_diagnostic()?;
        if number.trim().is_empty() {
            break;
        }
        let acc_name: String = Input::with_theme(&theme)
            .with_prompt("Accessory name")
            .interact_text()
            .into_diagnostic()?;

        let accessory = match fixture.add_accessory(number.trim(), acc_name.trim()) {
            Ok(accessory) => accessory,
            Err(e @ StoreError::DuplicateAccessory { .. }) => {
                eprintln!("{} {}", style("!").yellow(), e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        loop {
            let parameter: String = Input::with_theme(&theme)
                .with_prompt("  Parameter (blank to finish)")
                .allow_empty(true)
                .interact_text()
                .into_diagnostic()?;
            if parameter.trim().is_empty() {
                break;
            }
            let specification: String = Input::with_theme(&theme)
                .with_prompt("  Specification")
                .interact_text()
                .into_diagnostic()?;
            let instrument: String = Input::with_theme(&theme)
                .with_prompt("  Inspection instrument")
                .interact_text()
                .into_diagnostic()?;
            accessory.push_parameter(parameter.trim(), specification.trim(), instrument.trim());
        }
    }

    println!();
    println!(
        "{} accessories, {} parameters",
        style(fixture.accessories.len()).cyan(),
        style(fixture.parameter_count()).cyan()
    );
    let proceed = Confirm::with_theme(&theme)
        .with_prompt(format!("Save fixture {}?", fixture.number))
        .default(true)
        .interact()
        .into_diagnostic()?;
    if !proceed {
        return Err(miette::miette!("Cancelled"));
    }
    Ok(fixture)
}

fn run_accessory_add(args: AccessoryAddArgs, global: &GlobalOpts) -> Result<()> {
    let (_, workspace) = open_workspace(global)?;
    let store = workspace.catalog();
    let catalog = store.load()?;
    let mut fixture = catalog.require_fixture(&args.fixture)?;

    let (number, name) = args.accessory;
    catalog.check_accessory_free(&fixture.number, &number)?;
    let accessory = fixture.add_accessory(number, name)?;
    for (parameter, specification, instrument) in &args.params {
        accessory.push_parameter(parameter, specification, instrument);
    }

    save(&store, &fixture, global)
}

fn run_rename(args: RenameArgs, global: &GlobalOpts) -> Result<()> {
    let (_, workspace) = open_workspace(global)?;
    let store = workspace.catalog();
    let mut fixture = store.load()?.require_fixture(&args.fixture)?;

    // Validate through the constructor so a blank name is refused
    fixture.name = FixtureRecord::new(&fixture.number, args.name)?.name;
    fixture.sync_accessories();

    save(&store, &fixture, global)
}

fn run_accessory_rename(args: AccessoryRenameArgs, global: &GlobalOpts) -> Result<()> {
    let (_, workspace) = open_workspace(global)?;
    let store = workspace.catalog();
    let mut fixture = store.load()?.require_fixture(&args.fixture)?;

    fixture.accessory_mut(&args.accessory)?.rename(args.name.trim());

    save(&store, &fixture, global)
}

fn run_param_add(args: ParamAddArgs, global: &GlobalOpts) -> Result<()> {
    let (_, workspace) = open_workspace(global)?;
    let store = workspace.catalog();
    let mut fixture = store.load()?.require_fixture(&args.fixture)?;

    let serial = fixture.accessory_mut(&args.accessory)?.push_parameter(
        &args.parameter,
        &args.specification,
        &args.inspection_instrument,
    );
    tracing::debug!(accessory = %args.accessory, serial, "added parameter row");

    save(&store, &fixture, global)
}

fn run_param_set(args: ParamSetArgs, global: &GlobalOpts) -> Result<()> {
    let (_, workspace) = open_workspace(global)?;
    let store = workspace.catalog();
    let mut fixture = store.load()?.require_fixture(&args.fixture)?;

    fixture
        .accessory_mut(&args.accessory)?
        .edit_cell(args.serial, args.column, &args.value)?;

    save(&store, &fixture, global)
}

/// Merge-save a fixture and report the outcome
fn save(store: &CatalogStore, fixture: &FixtureRecord, global: &GlobalOpts) -> Result<()> {
    if let Some(acc) = fixture.accessories.iter().find(|a| a.rows().is_empty()) {
        return Err(StoreError::incomplete(format!(
            "accessory '{}' has no parameters; add at least one",
            acc.number
        ))
        .into());
    }
    if fixture.accessories.is_empty() {
        return Err(StoreError::incomplete(format!(
            "fixture '{}' has no accessories",
            fixture.number
        ))
        .into());
    }

    let written = store.merge_save(fixture)?;

    if !global.quiet {
        println!(
            "{} Saved fixture {} ({} parameter rows) to {}",
            style("✓").green(),
            style(&fixture.number).cyan(),
            written,
            style(store.path().display()).dim()
        );
    }
    Ok(())
}

/// Parse a parameter given as `PARAMETER|SPECIFICATION|INSTRUMENT`
fn parse_row_spec(s: &str) -> Result<(String, String, String), String> {
    let parts: Vec<&str> = s.split('|').map(str::trim).collect();
    match parts.as_slice() {
        [p, spec, instrument] => Ok((p.to_string(), spec.to_string(), instrument.to_string())),
        _ => Err(format!(
            "expected PARAMETER|SPECIFICATION|INSTRUMENT, got '{}'",
            s
        )),
    }
}
