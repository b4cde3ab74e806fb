//! `fxl init` command - prepare the data directory

use console::style;
use miette::Result;

use crate::cli::helpers::open_workspace;
use crate::cli::GlobalOpts;

#[derive(clap::Args, Debug)]
pub struct InitArgs {}

pub fn run(_args: InitArgs, global: &GlobalOpts) -> Result<()> {
    let (_, workspace) = open_workspace(global)?;
    let created = workspace.init()?;

    if global.quiet {
        return Ok(());
    }

    if created {
        println!(
            "{} Created catalog {}",
            style("✓").green(),
            style(workspace.catalog_path().display()).cyan()
        );
    } else {
        println!(
            "{} Catalog already exists at {}",
            style("•").dim(),
            style(workspace.catalog_path().display()).cyan()
        );
    }
    println!(
        "  Observation log: {}",
        style(workspace.log_path().display()).dim()
    );
    println!();
    println!("Next steps:");
    println!(
        "  {} Register a fixture",
        style("fxl fixture new <FIXTURE> --name <NAME> --accessory A1=<NAME>").yellow()
    );
    println!(
        "  {} Record an inspection",
        style("fxl measure <FIXTURE> --machine <M> --operation <OP>").yellow()
    );
    Ok(())
}
