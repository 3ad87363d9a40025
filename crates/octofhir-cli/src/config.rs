use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use octofhir_dedup::DedupConfig;

/// Where a resolved config came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Flag(PathBuf),
    Home(PathBuf),
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Flag(path) => write!(f, "{} (--config)", path.display()),
            ConfigSource::Home(path) => write!(f, "{}", path.display()),
            ConfigSource::Defaults => write!(f, "built-in defaults"),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".octofhir").join("dedup.toml"))
}

pub fn load_file(path: &Path) -> Result<DedupConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    DedupConfig::from_toml_str(&content)
        .with_context(|| format!("Invalid config: {}", path.display()))
}

/// Resolve the config: an explicit file, else the home config if it exists, else defaults.
pub fn resolve(explicit: Option<&Path>) -> Result<(DedupConfig, ConfigSource)> {
    resolve_with_home(explicit, default_config_path().as_deref())
}

fn resolve_with_home(
    explicit: Option<&Path>,
    home: Option<&Path>,
) -> Result<(DedupConfig, ConfigSource)> {
    // 1. --config flag / OCTOFHIR_DEDUP_CONFIG env
    if let Some(path) = explicit {
        return Ok((load_file(path)?, ConfigSource::Flag(path.to_path_buf())));
    }
    // 2. ~/.octofhir/dedup.toml
    if let Some(path) = home.filter(|p| p.exists()) {
        return Ok((load_file(path)?, ConfigSource::Home(path.to_path_buf())));
    }
    // 3. Defaults
    Ok((DedupConfig::default(), ConfigSource::Defaults))
}
