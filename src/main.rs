use clap::Parser;
use fxl::cli::{Cli, Commands};
use miette::Result;
use tracing_subscriber::prelude::*;

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;

    let default_level = if global.verbose { "fxl=debug" } else { "fxl=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("FXL_LOG")
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Init(args) => fxl::cli::commands::init::run(args, &global),
        Commands::Fixture(cmd) => fxl::cli::commands::fixture::run(cmd, &global),
        Commands::Measure(args) => fxl::cli::commands::measure::run(args, &global),
        Commands::Log(cmd) => fxl::cli::commands::log::run(cmd, &global),
        Commands::Config(cmd) => fxl::cli::commands::config::run(cmd, &global),
        Commands::Completions(args) => fxl::cli::commands::completions::run(args),
    }
}
