mod cli;
mod commands;
mod config;
mod logging;
mod output;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands, ConfigCommands};
use output::print_error;

fn main() {
    if let Err(e) = run() {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);
    let explicit = cli.config.as_deref();

    match &cli.command {
        Commands::Dedup(args) => {
            let (cfg, source) = config::resolve(explicit)?;
            tracing::debug!(%source, "config resolved");
            commands::dedup::dedup(args, cfg)?;
        }
        Commands::Config(args) => match &args.command {
            ConfigCommands::Show => commands::config::show(explicit)?,
            ConfigCommands::Path => commands::config::path()?,
        },
    }

    Ok(())
}
