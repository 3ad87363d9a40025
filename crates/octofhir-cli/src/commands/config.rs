use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::config;

pub fn show(explicit: Option<&Path>) -> Result<()> {
    let (cfg, source) = config::resolve(explicit)?;
    println!("{}: {}", "Source".cyan(), source);
    println!(
        "{}",
        toml::to_string_pretty(&cfg).context("Failed to render config")?
    );
    Ok(())
}

pub fn path() -> Result<()> {
    let path = config::default_config_path().context("Cannot determine home directory")?;
    println!("{}", path.display());
    Ok(())
}
