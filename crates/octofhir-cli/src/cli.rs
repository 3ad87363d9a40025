use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "octofhir")]
#[command(about = "OctoFHIR CLI: deduplicate multi-source FHIR patient bundles")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Deduplication config file (overrides ~/.octofhir/dedup.toml)
    #[arg(short, long, global = true, env = "OCTOFHIR_DEDUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deduplicate a bundle
    Dedup(DedupArgs),
    /// Inspect the deduplication configuration
    Config(ConfigArgs),
}

#[derive(Clone, Copy, ValueEnum, Default, PartialEq, Eq, Debug)]
pub enum ReportFormat {
    /// Summary table on stderr
    #[default]
    Table,
    /// Report as JSON on stderr
    Json,
}

#[derive(clap::Args)]
pub struct DedupArgs {
    /// Path to a Bundle JSON file (reads from stdin if omitted)
    pub file: Option<PathBuf>,
    /// Write the deduplicated bundle here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Print a run report
    #[arg(long, num_args = 0..=1, default_missing_value = "table")]
    pub report: Option<ReportFormat>,
    /// Write compact JSON instead of pretty-printed
    #[arg(long)]
    pub compact: bool,
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the resolved config and where it came from
    Show,
    /// Print the default config file path
    Path,
}
