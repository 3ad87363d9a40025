use serde::{Deserialize, Serialize};

use crate::error::{DedupError, Result};

/// Default URL of the extension recording an absorbed resource.
pub const DEFAULT_PROVENANCE_URL: &str =
    "https://fhir.octofhir.io/StructureDefinition/original-resource";

/// What to do with a resource whose grouping date is missing or unparseable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingDatePolicy {
    /// Keep the resource as-is, outside of any duplicate group
    #[default]
    KeepSingleton,
    /// Drop the resource from the output bundle
    Exclude,
}

/// Configuration of a deduplication run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupConfig {
    #[serde(default)]
    pub missing_date_policy: MissingDatePolicy,

    /// Drop resources that carry no code from a recognized terminology.
    /// When disabled they are kept ungrouped instead.
    #[serde(default = "default_drop_unrecognized")]
    pub drop_unrecognized: bool,

    #[serde(default = "default_provenance_url")]
    pub provenance_url: String,
}

fn default_drop_unrecognized() -> bool {
    true
}

fn default_provenance_url() -> String {
    DEFAULT_PROVENANCE_URL.to_string()
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            missing_date_policy: MissingDatePolicy::default(),
            drop_unrecognized: default_drop_unrecognized(),
            provenance_url: default_provenance_url(),
        }
    }
}

impl DedupConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| DedupError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.provenance_url.trim().is_empty() {
            return Err(DedupError::config("provenance_url must not be empty"));
        }
        Ok(())
    }

    pub fn with_missing_date_policy(mut self, policy: MissingDatePolicy) -> Self {
        self.missing_date_policy = policy;
        self
    }

    pub fn with_drop_unrecognized(mut self, drop: bool) -> Self {
        self.drop_unrecognized = drop;
        self
    }
}
